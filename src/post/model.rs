use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

use crate::uploads::UploadError;

pub const FEED_PAGE_SIZE: i64 = 10;
pub const MAX_POST_CHARS: usize = 5000;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    /// none, image or video
    pub media_type: String,
    pub media_url: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
}

/// Feed row: the post, its author and whether the viewer liked it
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct FeedPost {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub media_type: String,
    pub media_url: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub author_username: String,
    pub author_initials: String,
    pub author_avatar_color: String,
    pub author_profile_picture: Option<String>,
    pub liked_by_viewer: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FeedParams {
    pub page: Option<i64>,
}

impl FeedParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LikeOutcome {
    /// Viewer's like state after the toggle
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Post not found")]
    NotFound,

    #[error("You do not have permission to delete this post")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Text may be empty only when media is attached
pub fn validate_content(content: &str, has_media: bool) -> Result<String, PostError> {
    let content = content.trim();
    if content.is_empty() && !has_media {
        return Err(PostError::Validation(
            "Post must have text or media".to_string(),
        ));
    }
    if content.chars().count() > MAX_POST_CHARS {
        return Err(PostError::Validation(format!(
            "Post is too long (max {} characters)",
            MAX_POST_CHARS
        )));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_post_needs_media() {
        assert!(validate_content("  ", false).is_err());
        assert_eq!(validate_content("  ", true).unwrap(), "");
        assert_eq!(validate_content(" Fresh bread ", false).unwrap(), "Fresh bread");
    }

    #[test]
    fn test_feed_page_defaults() {
        assert_eq!(FeedParams { page: None }.page(), 1);
        assert_eq!(FeedParams { page: Some(0) }.page(), 1);
        assert_eq!(FeedParams { page: Some(3) }.page(), 3);
    }
}
