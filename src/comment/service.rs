use sqlx::PgPool;
use tracing::info;

use crate::comment::model::{Comment, CommentError, CommentView};
use crate::notification::model::{NewNotification, NotificationType};
use crate::notification::service::{self as notifications, should_notify};
use crate::realtime::EventBus;

#[derive(Debug, Clone)]
pub struct CommentService {
    pool: PgPool,
    bus: Option<EventBus>,
}

impl CommentService {
    pub fn new(pool: PgPool, bus: Option<EventBus>) -> Self {
        Self { pool, bus }
    }

    /// Comment row, counter bump and owner notification commit together
    pub async fn add(
        &self,
        user_id: i64,
        post_id: i64,
        content: &str,
    ) -> Result<Comment, CommentError> {
        let mut tx = self.pool.begin().await?;

        let owner_id: i64 =
            sqlx::query_scalar("SELECT user_id FROM forge.posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(CommentError::PostNotFound)?;

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO forge.comments (post_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE forge.posts SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        let notification = if should_notify(user_id, owner_id) {
            let commenter: String =
                sqlx::query_scalar("SELECT name FROM forge.users WHERE id = $1")
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;
            Some(
                notifications::insert(
                    &mut *tx,
                    &NewNotification {
                        user_id: owner_id,
                        notification_type: NotificationType::Comment,
                        title: "New comment".to_string(),
                        message: format!("{} commented on your post", commenter),
                        related_id: Some(post_id),
                    },
                )
                .await?,
            )
        } else {
            None
        };

        tx.commit().await?;

        if let Some(notification) = &notification {
            notifications::publish(self.bus.as_ref(), notification).await;
        }

        info!("User {} commented on post {}", user_id, post_id);
        Ok(comment)
    }

    /// Oldest first
    pub async fn list(&self, post_id: i64) -> Result<Vec<CommentView>, CommentError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM forge.posts WHERE id = $1)")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(CommentError::PostNotFound);
        }

        let comments = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.content, c.created_at,
                   u.name AS author_name,
                   u.initials AS author_initials,
                   u.avatar_color AS author_avatar_color,
                   u.profile_picture AS author_profile_picture
            FROM forge.comments c
            JOIN forge.users u ON u.id = c.user_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }
}
