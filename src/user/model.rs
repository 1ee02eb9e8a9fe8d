use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;

/// Palette avatar colors are drawn from at registration
pub const AVATAR_COLORS: [&str; 8] = [
    "#4f46e5", "#0891b2", "#059669", "#d97706", "#dc2626", "#db2777", "#7c3aed", "#2563eb",
];

/// Database model for a user
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub initials: String,
    pub avatar_color: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Identity fields shown next to user generated content
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub initials: String,
    pub avatar_color: String,
    pub profile_picture: Option<String>,
    pub status: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            initials: user.initials.clone(),
            avatar_color: user.avatar_color.clone(),
            profile_picture: user.profile_picture.clone(),
            status: user.status.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Online,
    Away,
    Offline,
}

impl UserStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "online" => Some(Self::Online),
            "away" => Some(Self::Away),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),
}

/// Up to two upper-cased initials from the display name, falling back to the username
pub fn derive_initials(name: &str, username: &str) -> String {
    let from_name: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();

    if !from_name.is_empty() {
        return from_name;
    }

    username
        .chars()
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn random_avatar_color() -> &'static str {
    AVATAR_COLORS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(AVATAR_COLORS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initials_from_two_words() {
        assert_eq!(derive_initials("Julia Child", "jchild"), "JC");
    }

    #[test]
    fn test_initials_only_first_two_words() {
        assert_eq!(derive_initials("gordon james ramsay", "gr"), "GJ");
    }

    #[test]
    fn test_initials_single_word() {
        assert_eq!(derive_initials("Nigella", "nigella"), "N");
    }

    #[test]
    fn test_initials_fall_back_to_username() {
        assert_eq!(derive_initials("   ", "chef"), "CH");
    }

    #[test]
    fn test_avatar_color_from_palette() {
        for _ in 0..20 {
            assert!(AVATAR_COLORS.contains(&random_avatar_color()));
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(UserStatus::parse("Away"), Some(UserStatus::Away));
        assert_eq!(UserStatus::parse("busy"), None);
        assert_eq!(UserStatus::Online.as_str(), "online");
    }

    #[test]
    fn test_admin_role_check() {
        let mut user = User {
            id: 1,
            username: "ana".to_string(),
            email: "ana@forge.test".to_string(),
            name: "Ana".to_string(),
            password_hash: String::new(),
            profile_picture: None,
            initials: "AN".to_string(),
            avatar_color: AVATAR_COLORS[0].to_string(),
            role: "user".to_string(),
            status: "online".to_string(),
            created_at: Utc::now(),
        };
        assert!(!user.is_admin());
        user.role = "admin".to_string();
        assert!(user.is_admin());
    }
}
