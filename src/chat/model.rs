use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Database model for a direct message. The id doubles as the polling cursor.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn display_time(&self) -> String {
        self.created_at.format("%I:%M %p").to_string()
    }
}

/// Message shape the polling client renders
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageView {
    pub id: i64,
    pub sender_id: i64,
    pub message: String,
    pub time: String,
    pub is_read: bool,
}

impl From<&ChatMessage> for MessageView {
    fn from(m: &ChatMessage) -> Self {
        Self {
            id: m.id,
            sender_id: m.sender_id,
            message: m.message.clone(),
            time: m.display_time(),
            is_read: m.is_read,
        }
    }
}

/// One row of the viewer's inbox
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ConversationSummary {
    pub counterpart_id: i64,
    pub counterpart_name: String,
    pub initials: String,
    pub avatar_color: String,
    pub profile_picture: Option<String>,
    pub status: String,
    pub last_message: String,
    #[schema(value_type = DateTimeWrapper)]
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Receiver not found")]
    ReceiverNotFound,
}
