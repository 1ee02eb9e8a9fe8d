use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::StatusCode;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info};

use super::jwt::{generate_token, Role};
use crate::user::model::{derive_initials, random_avatar_color, UserStatus};

const MIN_PASSWORD_CHARS: usize = 6;

pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

pub struct LoginData {
    pub email: String,
    pub password: String,
}

pub struct AuthResult {
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Token generation failed")]
    TokenError,
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::DatabaseError(_) | Self::TokenError | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show the visitor; internal detail stays in the logs
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput(msg) | Self::AlreadyExists(msg) => msg.clone(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::TokenError => "Failed to generate auth token".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
        }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> AuthError {
    error!("{}: {}", context, e);
    AuthError::DatabaseError(e.to_string())
}

fn validate_registration(data: &RegisterData) -> Result<(), AuthError> {
    if data.username.trim().is_empty()
        || data.email.trim().is_empty()
        || data.name.trim().is_empty()
        || data.password.is_empty()
    {
        return Err(AuthError::InvalidInput(
            "Username, email, name and password are required".to_string(),
        ));
    }
    if !data.email.contains('@') {
        return Err(AuthError::InvalidInput("Invalid email address".to_string()));
    }
    if data.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            AuthError::InternalError(format!("Password hashing failed: {}", e))
        })
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Failed to parse password hash: {}", e);
            false
        }
    }
}

pub async fn register(pool: &PgPool, data: RegisterData) -> Result<AuthResult, AuthError> {
    validate_registration(&data)?;

    let username = data.username.trim().to_string();
    let email = data.email.trim().to_lowercase();
    let name = data.name.trim().to_string();

    let existing: Option<(String, String)> = sqlx::query_as(
        "SELECT username, email FROM forge.users WHERE email = $1 OR username = $2 LIMIT 1",
    )
    .bind(&email)
    .bind(&username)
    .fetch_optional(pool)
    .await
    .map_err(|e| db_error("Database error while checking existing user", e))?;

    if let Some((taken_username, _)) = existing {
        info!("Registration conflict for {} / {}", username, email);
        let message = if taken_username == username {
            "Username already taken"
        } else {
            "Email already in use"
        };
        return Err(AuthError::AlreadyExists(message.to_string()));
    }

    let password_hash = hash_password(&data.password)?;
    let initials = derive_initials(&name, &username);

    let user_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO forge.users (username, email, name, password_hash, initials, avatar_color, role, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'user', 'offline')
        RETURNING id
        "#,
    )
    .bind(&username)
    .bind(&email)
    .bind(&name)
    .bind(&password_hash)
    .bind(&initials)
    .bind(random_avatar_color())
    .fetch_one(pool)
    .await
    .map_err(|e| db_error("Failed to insert new user", e))?;

    info!("User created successfully with ID: {}", user_id);

    let token = generate_token(user_id, Role::User).map_err(|e| {
        error!("Token generation failed: {}", e);
        AuthError::TokenError
    })?;

    Ok(AuthResult {
        user_id,
        username,
        name,
        role: Role::User,
        token,
    })
}

/// Verify credentials and mark the user online
pub async fn login(pool: &PgPool, data: LoginData) -> Result<AuthResult, AuthError> {
    let email = data.email.trim().to_lowercase();
    info!("Attempting login for user with email: {}", email);

    let user: Option<(i64, String, String, String, String)> = sqlx::query_as(
        "SELECT id, username, name, password_hash, role FROM forge.users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await
    .map_err(|e| db_error("Database error while fetching user", e))?;

    let Some((user_id, username, name, password_hash, role)) = user else {
        info!("No user found with email: {}", email);
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(&data.password, &password_hash) {
        info!("Password verification failed for user {}", user_id);
        return Err(AuthError::InvalidCredentials);
    }

    let role = Role::from_str(&role).map_err(AuthError::InternalError)?;

    sqlx::query("UPDATE forge.users SET status = $1 WHERE id = $2")
        .bind(UserStatus::Online.as_str())
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| db_error("Failed to mark user online", e))?;

    let token = generate_token(user_id, role).map_err(|e| {
        error!("Token generation failed: {}", e);
        AuthError::TokenError
    })?;

    info!("Login successful for user ID: {}", user_id);

    Ok(AuthResult {
        user_id,
        username,
        name,
        role,
        token,
    })
}

pub async fn logout(pool: &PgPool, user_id: i64) -> Result<(), AuthError> {
    sqlx::query("UPDATE forge.users SET status = $1 WHERE id = $2")
        .bind(UserStatus::Offline.as_str())
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| db_error("Failed to mark user offline", e))?;

    info!("User {} logged out", user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(password: &str, email: &str) -> RegisterData {
        RegisterData {
            username: "julia".to_string(),
            email: email.to_string(),
            name: "Julia Child".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_registration_validation() {
        assert!(validate_registration(&data("secret1", "julia@forge.test")).is_ok());
        assert!(matches!(
            validate_registration(&data("123", "julia@forge.test")),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(validate_registration(&data("secret1", "not-an-email")).is_err());

        let mut missing = data("secret1", "julia@forge.test");
        missing.name = "  ".to_string();
        assert!(validate_registration(&missing).is_err());
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("butter&sugar").unwrap();
        assert!(verify_password("butter&sugar", &hash));
        assert!(!verify_password("margarine", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_internal_messages_are_not_leaked() {
        let err = AuthError::DatabaseError("relation forge.users does not exist".to_string());
        assert_eq!(err.message(), "Database error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Database error: relation forge.users does not exist"
        );
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_register_then_login_sets_online(pool: PgPool) {
        std::env::set_var("JWT_SECRET", "test_secret");
        crate::db::init_db(&pool).await.unwrap();

        let registered = register(&pool, data("secret1", "Julia@Forge.test"))
            .await
            .unwrap();
        assert!(matches!(
            register(&pool, data("secret1", "other@forge.test")).await,
            Err(AuthError::AlreadyExists(_))
        ));

        let logged_in = login(
            &pool,
            LoginData {
                email: "julia@forge.test".to_string(),
                password: "secret1".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(logged_in.user_id, registered.user_id);

        let (initials, status): (String, String) =
            sqlx::query_as("SELECT initials, status FROM forge.users WHERE id = $1")
                .bind(registered.user_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(initials, "JC");
        assert_eq!(status, "online");
    }
}
