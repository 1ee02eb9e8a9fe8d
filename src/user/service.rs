use sqlx::PgPool;
use tracing::info;

use crate::user::model::{derive_initials, PublicUser, User, UserError};

#[derive(Debug, Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, user_id: i64) -> Result<User, UserError> {
        sqlx::query_as::<_, User>("SELECT * FROM forge.users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Everyone except the viewer, online users first
    pub async fn list_others(&self, viewer_id: i64) -> Result<Vec<PublicUser>, UserError> {
        let users = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, username, name, initials, avatar_color, profile_picture, status
            FROM forge.users
            WHERE id <> $1
            ORDER BY CASE status WHEN 'online' THEN 0 WHEN 'away' THEN 1 ELSE 2 END, name ASC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<User, UserError> {
        let current = self.find_by_id(user_id).await?;

        let name = match name.map(|n| n.trim().to_string()) {
            Some(n) if n.is_empty() => {
                return Err(UserError::Validation("Name cannot be empty".to_string()))
            }
            Some(n) => n,
            None => current.name.clone(),
        };

        let email = match email.map(|e| e.trim().to_lowercase()) {
            Some(e) if !e.contains('@') => {
                return Err(UserError::Validation("Invalid email address".to_string()))
            }
            Some(e) => e,
            None => current.email.clone(),
        };

        if email != current.email {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM forge.users WHERE email = $1 AND id <> $2)",
            )
            .bind(&email)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

            if taken {
                return Err(UserError::Conflict("Email already in use".to_string()));
            }
        }

        let initials = derive_initials(&name, &current.username);

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE forge.users SET name = $1, email = $2, initials = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(&email)
        .bind(&initials)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        info!("Updated profile for user {}", user_id);
        Ok(user)
    }

    /// Store a new picture path and hand back the previous one for cleanup
    pub async fn set_profile_picture(
        &self,
        user_id: i64,
        relative_path: &str,
    ) -> Result<Option<String>, UserError> {
        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT profile_picture FROM forge.users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let previous = previous.ok_or(UserError::NotFound)?;

        sqlx::query("UPDATE forge.users SET profile_picture = $1 WHERE id = $2")
            .bind(relative_path)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::service::{login, register, LoginData, RegisterData};

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_changed_email_is_stored_lowercase(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        std::env::set_var("JWT_SECRET", "test_secret");

        let bob = register(
            &pool,
            RegisterData {
                username: "bob".to_string(),
                email: "bob@x.com".to_string(),
                name: "Bob Baker".to_string(),
                password: "secret1".to_string(),
            },
        )
        .await
        .unwrap();
        let other = crate::db::test_support::insert_user(&pool, "carol").await;

        let service = UserService::new(pool.clone());
        let updated = service
            .update_profile(bob.user_id, None, Some("  Bob@New.com ".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.email, "bob@new.com");

        let session = login(
            &pool,
            LoginData {
                email: "Bob@New.com".to_string(),
                password: "secret1".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(session.user_id, bob.user_id);

        let clash = service
            .update_profile(other, None, Some("BOB@new.COM".to_string()))
            .await;
        assert!(matches!(clash, Err(UserError::Conflict(_))));
    }
}
