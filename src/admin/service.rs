use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::admin::model::{AdminError, DashboardStats, DifficultyCount, ManagedUser, UserUpdate};
use crate::auth::middleware::AuthUser;
use crate::uploads::UploadFolder;

#[derive(Debug, Clone)]
pub struct AdminService {
    pool: PgPool,
}

impl AdminService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn stats(&self) -> Result<DashboardStats, AdminError> {
        let (total_users, total_recipes, total_posts, total_comments, total_messages, new_users_week): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM forge.users),
                (SELECT COUNT(*) FROM forge.recipes),
                (SELECT COUNT(*) FROM forge.posts),
                (SELECT COUNT(*) FROM forge.comments),
                (SELECT COUNT(*) FROM forge.chat_messages),
                (SELECT COUNT(*) FROM forge.users WHERE created_at >= NOW() - INTERVAL '7 days')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let recipes_by_difficulty = sqlx::query_as::<_, DifficultyCount>(
            r#"
            SELECT difficulty, COUNT(*) AS count
            FROM forge.recipes
            GROUP BY difficulty
            ORDER BY CASE difficulty WHEN 'Easy' THEN 0 WHEN 'Medium' THEN 1 ELSE 2 END
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_users,
            total_recipes,
            total_posts,
            total_comments,
            total_messages,
            new_users_week,
            recipes_by_difficulty,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<ManagedUser>, AdminError> {
        let users = sqlx::query_as::<_, ManagedUser>(
            r#"
            SELECT u.id, u.username, u.email, u.name, u.role, u.status, u.created_at,
                   (SELECT COUNT(*) FROM forge.recipes r WHERE r.created_by = u.id) AS recipe_count,
                   (SELECT COUNT(*) FROM forge.posts p WHERE p.user_id = u.id) AS post_count
            FROM forge.users u
            ORDER BY u.created_at DESC, u.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn update_user(&self, user_id: i64, update: UserUpdate) -> Result<(), AdminError> {
        let result = sqlx::query(
            r#"
            UPDATE forge.users
            SET role = COALESCE($1, role), status = COALESCE($2, status)
            WHERE id = $3
            "#,
        )
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.status.map(|s| s.as_str()))
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AdminError::NotFound);
        }
        info!("Admin updated user {}: {:?}", user_id, update);
        Ok(())
    }

    /// Remove a user and everything they own. Counters on other users' posts
    /// lose the deleted user's likes and comments in the same transaction.
    /// Returns the upload paths that belonged to the user for file cleanup.
    pub async fn delete_user(&self, admin: &AuthUser, user_id: i64) -> Result<Vec<String>, AdminError> {
        if admin.user_id == user_id {
            return Err(AdminError::SelfDelete);
        }

        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM forge.users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(AdminError::NotFound);
        }

        release_counters(&mut *tx, user_id).await?;

        let files: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT media_url FROM forge.posts WHERE user_id = $1 AND media_url IS NOT NULL
            UNION ALL
            SELECT profile_picture FROM forge.users WHERE id = $1 AND profile_picture IS NOT NULL
            UNION ALL
            SELECT image_url FROM forge.recipes WHERE created_by = $1 AND image_url LIKE $2
            "#,
        )
        .bind(user_id)
        .bind(format!("{}/%", UploadFolder::Recipes.dir_name()))
        .fetch_all(&mut *tx)
        .await?;

        // remaining rows go with the user through ON DELETE CASCADE
        sqlx::query("DELETE FROM forge.users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Admin {} deleted user {}", admin.user_id, user_id);
        Ok(files)
    }
}

async fn release_counters(conn: &mut PgConnection, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE forge.posts p
        SET likes_count = GREATEST(p.likes_count - l.n, 0)
        FROM (
            SELECT post_id, COUNT(*) AS n FROM forge.post_likes
            WHERE user_id = $1 GROUP BY post_id
        ) l
        WHERE p.id = l.post_id AND p.user_id <> $1
        "#,
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE forge.posts p
        SET comments_count = GREATEST(p.comments_count - c.n, 0)
        FROM (
            SELECT post_id, COUNT(*) AS n FROM forge.comments
            WHERE user_id = $1 GROUP BY post_id
        ) c
        WHERE p.id = c.post_id AND p.user_id <> $1
        "#,
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::Role;
    use crate::db::test_support::insert_user;

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_delete_user_releases_counters_on_other_posts(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        let admin_id = insert_user(&pool, "admin").await;
        let author = insert_user(&pool, "author").await;
        let leaver = insert_user(&pool, "leaver").await;

        let post_id: i64 = sqlx::query_scalar(
            "INSERT INTO forge.posts (user_id, content, likes_count, comments_count) VALUES ($1, 'soup', 1, 2) RETURNING id",
        )
        .bind(author)
        .fetch_one(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO forge.post_likes (post_id, user_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(leaver)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO forge.comments (post_id, user_id, content) VALUES ($1, $2, 'yum'), ($1, $3, 'nice')")
            .bind(post_id)
            .bind(leaver)
            .bind(author)
            .execute(&pool)
            .await
            .unwrap();

        let admin = AuthUser {
            user_id: admin_id,
            role: Role::Admin,
        };
        let service = AdminService::new(pool.clone());
        service.delete_user(&admin, leaver).await.unwrap();

        let (likes, comments): (i64, i64) =
            sqlx::query_as("SELECT likes_count, comments_count FROM forge.posts WHERE id = $1")
                .bind(post_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!((likes, comments), (0, 1));

        assert!(matches!(
            service.delete_user(&admin, admin_id).await,
            Err(AdminError::SelfDelete)
        ));
        assert!(matches!(
            service.delete_user(&admin, leaver).await,
            Err(AdminError::NotFound)
        ));
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_delete_user_collects_uploaded_files(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        let admin_id = insert_user(&pool, "admin").await;
        let cook = insert_user(&pool, "cook").await;

        sqlx::query("UPDATE forge.users SET profile_picture = 'profile_picture/profile_a.png' WHERE id = $1")
            .bind(cook)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO forge.recipes (title, instructions, image_url, cooking_time, servings, difficulty, created_by)
            VALUES ('Pie', 'Bake', 'recipes/recipe_b.jpg', '1h', '6', 'Easy', $1),
                   ('Salad', 'Toss', 'https://img.example/salad.png', '5 min', '2', 'Easy', $1)
            "#,
        )
        .bind(cook)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO forge.posts (user_id, content, media_url, media_type) VALUES ($1, 'look', 'posts/post_c.mp4', 'video')")
            .bind(cook)
            .execute(&pool)
            .await
            .unwrap();

        let admin = AuthUser {
            user_id: admin_id,
            role: Role::Admin,
        };
        let mut files = AdminService::new(pool.clone())
            .delete_user(&admin, cook)
            .await
            .unwrap();
        files.sort();

        assert_eq!(
            files,
            vec![
                "posts/post_c.mp4".to_string(),
                "profile_picture/profile_a.png".to_string(),
                "recipes/recipe_b.jpg".to_string(),
            ]
        );
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_stats_count_recent_users(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        insert_user(&pool, "one").await;
        insert_user(&pool, "two").await;

        let stats = AdminService::new(pool).stats().await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.new_users_week, 2);
        assert!(stats.recipes_by_difficulty.is_empty());
    }
}
