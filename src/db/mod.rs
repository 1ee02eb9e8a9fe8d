use sqlx::{Executor, PgPool, Row};
use tracing::{error, info};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Initialize the database schema
pub async fn init_db(pool: &PgPool) -> Result<(), sqlx::Error> {
    info!("Initializing database schema...");

    // Multi-statement script, so it goes through the simple query protocol
    match pool.execute(SCHEMA_SQL).await {
        Ok(_) => {
            info!("Database schema initialized successfully");
            Ok(())
        }
        Err(e) => {
            error!("Failed to initialize database schema: {}", e);
            Err(e)
        }
    }
}

/// Check if the user table exists
pub async fn check_db_initialized(pool: &PgPool) -> bool {
    let result = sqlx::query(
        "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_schema = 'forge' AND table_name = 'users')",
    )
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => row.try_get::<bool, _>(0).unwrap_or(false),
        Err(_) => false,
    }
}

#[cfg(test)]
pub mod test_support {
    use sqlx::PgPool;

    /// Insert a bare user row and return its id
    pub async fn insert_user(pool: &PgPool, username: &str) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO forge.users (username, email, name, password_hash, initials, avatar_color)
            VALUES ($1, $2, $1, 'x', 'XX', '#4f46e5')
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(format!("{}@forge.test", username))
        .fetch_one(pool)
        .await
        .unwrap()
    }
}
