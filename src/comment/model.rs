use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;

pub const MAX_COMMENT_CHARS: usize = 1000;

/// Database model for a comment
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
}

/// Comment joined with its author's identity fields
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub author_initials: String,
    pub author_avatar_color: String,
    pub author_profile_picture: Option<String>,
}

/// Request to add a comment
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    #[schema(example = "Made this last night, delicious!")]
    pub content: String,
}

impl CreateCommentRequest {
    pub fn validated_content(&self) -> Result<&str, CommentError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(CommentError::Validation(
                "Comment cannot be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_COMMENT_CHARS {
            return Err(CommentError::Validation(format!(
                "Comment is too long (max {} characters)",
                MAX_COMMENT_CHARS
            )));
        }
        Ok(content)
    }
}

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Post not found")]
    PostNotFound,

    #[error("{0}")]
    Validation(String),
}
