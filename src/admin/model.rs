use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::jwt::Role;
use crate::user::model::UserStatus;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct DifficultyCount {
    pub difficulty: String,
    pub count: i64,
}

/// Site-wide counters for the admin dashboard
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_recipes: i64,
    pub total_posts: i64,
    pub total_comments: i64,
    pub total_messages: i64,
    pub new_users_week: i64,
    pub recipes_by_difficulty: Vec<DifficultyCount>,
}

/// One row of the user management table
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ManagedUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub status: String,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
    pub recipe_count: i64,
    pub post_count: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub role: Option<String>,
    pub status: Option<String>,
}

/// Parsed role and status change; `None` leaves the column alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<UserUpdate, AdminError> {
        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                Role::from_str(raw)
                    .map_err(|_| AdminError::Validation("Invalid role".to_string()))?,
            ),
        };

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                UserStatus::parse(raw)
                    .ok_or_else(|| AdminError::Validation("Invalid status".to_string()))?,
            ),
        };

        if role.is_none() && status.is_none() {
            return Err(AdminError::Validation("Nothing to update".to_string()));
        }

        Ok(UserUpdate { role, status })
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("User not found")]
    NotFound,

    #[error("You cannot delete your own account")]
    SelfDelete,

    #[error("{0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Option<&str>, status: Option<&str>) -> UpdateUserRequest {
        UpdateUserRequest {
            role: role.map(str::to_string),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn test_update_parses_role_and_status() {
        let update = request(Some("Admin"), Some("away")).validate().unwrap();
        assert_eq!(update.role, Some(Role::Admin));
        assert_eq!(update.status, Some(UserStatus::Away));
    }

    #[test]
    fn test_update_rejects_unknown_values() {
        assert!(matches!(
            request(Some("root"), None).validate(),
            Err(AdminError::Validation(_))
        ));
        assert!(matches!(
            request(None, Some("busy")).validate(),
            Err(AdminError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_update_rejected() {
        assert!(request(None, Some(" ")).validate().is_err());
    }
}
