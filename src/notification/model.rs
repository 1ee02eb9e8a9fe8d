use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Recipe,
    Comment,
    Like,
    Follower,
    Message,
}

impl NotificationType {
    pub const ALL: [NotificationType; 5] = [
        NotificationType::Recipe,
        NotificationType::Comment,
        NotificationType::Like,
        NotificationType::Follower,
        NotificationType::Message,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Recipe => "recipe",
            NotificationType::Comment => "comment",
            NotificationType::Like => "like",
            NotificationType::Follower => "follower",
            NotificationType::Message => "message",
        }
    }
}

/// Database model for a notification
#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification waiting to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationView {
    pub id: i64,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_id: Option<i64>,
    pub is_read: bool,
    pub time: String,
}

impl From<Notification> for NotificationView {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type,
            title: n.title,
            message: n.message,
            related_id: n.related_id,
            is_read: n.is_read,
            time: n.created_at.format("%b %d, %Y %I:%M %p").to_string(),
        }
    }
}

/// Recipient ids arrive as numbers or numeric strings depending on the client
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipientId {
    Number(i64),
    Text(String),
}

impl RecipientId {
    pub fn as_id(&self) -> Option<i64> {
        match self {
            RecipientId::Number(id) => Some(*id),
            RecipientId::Text(raw) => raw.trim().parse().ok(),
        }
    }
}

/// Admin broadcast request body
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub notification_type: String,
    #[serde(default)]
    pub recipients: Vec<RecipientId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Notification not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),
}
