use axum::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::chat::model::{ChatError, ChatMessage, ConversationSummary};
use crate::notification::model::{NewNotification, NotificationType};
use crate::notification::service as notifications;

/// Persistence seam for direct messages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn user_exists(&self, user_id: i64) -> Result<bool, ChatError>;

    /// Insert an unread message and return the stored row
    async fn insert_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        text: &str,
    ) -> Result<ChatMessage, ChatError>;

    /// Messages between the pair with `id > after_id`, ascending.
    /// `after_id == 0` means first load: the most recent `limit` messages.
    async fn messages_after(
        &self,
        viewer_id: i64,
        counterpart_id: i64,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, ChatError>;

    /// Flip counterpart -> viewer messages to read, returning how many changed
    async fn mark_read(&self, viewer_id: i64, counterpart_id: i64) -> Result<u64, ChatError>;

    async fn unread_count(
        &self,
        viewer_id: i64,
        counterpart_id: Option<i64>,
    ) -> Result<i64, ChatError>;

    async fn conversations(&self, viewer_id: i64) -> Result<Vec<ConversationSummary>, ChatError>;
}

#[derive(Debug, Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn user_exists(&self, user_id: i64) -> Result<bool, ChatError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM forge.users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        text: &str,
    ) -> Result<ChatMessage, ChatError> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO forge.chat_messages (sender_id, receiver_id, message, is_read)
            VALUES ($1, $2, $3, false)
            RETURNING *
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(text)
        .fetch_one(&mut *tx)
        .await?;

        let sender_name: String = sqlx::query_scalar("SELECT name FROM forge.users WHERE id = $1")
            .bind(sender_id)
            .fetch_one(&mut *tx)
            .await?;

        notifications::insert(
            &mut *tx,
            &NewNotification {
                user_id: receiver_id,
                notification_type: NotificationType::Message,
                title: "New message".to_string(),
                message: format!("{} sent you a message", sender_name),
                related_id: Some(sender_id),
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            "Stored chat message {} from {} to {}",
            message.id, sender_id, receiver_id
        );
        Ok(message)
    }

    async fn messages_after(
        &self,
        viewer_id: i64,
        counterpart_id: i64,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let messages = if after_id <= 0 {
            sqlx::query_as::<_, ChatMessage>(
                r#"
                SELECT * FROM (
                    SELECT * FROM forge.chat_messages
                    WHERE (sender_id = $1 AND receiver_id = $2)
                       OR (sender_id = $2 AND receiver_id = $1)
                    ORDER BY id DESC
                    LIMIT $3
                ) recent
                ORDER BY id ASC
                "#,
            )
            .bind(viewer_id)
            .bind(counterpart_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, ChatMessage>(
                r#"
                SELECT * FROM forge.chat_messages
                WHERE ((sender_id = $1 AND receiver_id = $2)
                    OR (sender_id = $2 AND receiver_id = $1))
                  AND id > $3
                ORDER BY id ASC
                LIMIT $4
                "#,
            )
            .bind(viewer_id)
            .bind(counterpart_id)
            .bind(after_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(messages)
    }

    async fn mark_read(&self, viewer_id: i64, counterpart_id: i64) -> Result<u64, ChatError> {
        let result = sqlx::query(
            r#"
            UPDATE forge.chat_messages SET is_read = true
            WHERE sender_id = $1 AND receiver_id = $2 AND is_read = false
            "#,
        )
        .bind(counterpart_id)
        .bind(viewer_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn unread_count(
        &self,
        viewer_id: i64,
        counterpart_id: Option<i64>,
    ) -> Result<i64, ChatError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM forge.chat_messages
            WHERE receiver_id = $1 AND is_read = false
              AND ($2::BIGINT IS NULL OR sender_id = $2)
            "#,
        )
        .bind(viewer_id)
        .bind(counterpart_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn conversations(&self, viewer_id: i64) -> Result<Vec<ConversationSummary>, ChatError> {
        let rows = sqlx::query_as::<_, ConversationSummary>(
            r#"
            WITH pairs AS (
                SELECT CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END AS counterpart_id,
                       id, message, created_at
                FROM forge.chat_messages
                WHERE sender_id = $1 OR receiver_id = $1
            ), latest AS (
                SELECT DISTINCT ON (counterpart_id)
                       counterpart_id, message AS last_message, created_at AS last_message_at
                FROM pairs
                ORDER BY counterpart_id, id DESC
            )
            SELECT l.counterpart_id,
                   u.name AS counterpart_name,
                   u.initials,
                   u.avatar_color,
                   u.profile_picture,
                   u.status,
                   l.last_message,
                   l.last_message_at,
                   (SELECT COUNT(*) FROM forge.chat_messages m
                     WHERE m.sender_id = l.counterpart_id
                       AND m.receiver_id = $1
                       AND m.is_read = false) AS unread_count
            FROM latest l
            JOIN forge.users u ON u.id = l.counterpart_id
            ORDER BY l.last_message_at DESC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// In-memory store with the same ordering and read-tracking rules
#[cfg(test)]
pub mod memory {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct MemoryChatStore {
        users: HashSet<i64>,
        messages: Mutex<Vec<ChatMessage>>,
    }

    impl MemoryChatStore {
        pub fn with_users(ids: &[i64]) -> Self {
            Self {
                users: ids.iter().copied().collect(),
                messages: Mutex::new(Vec::new()),
            }
        }

        fn between(m: &ChatMessage, a: i64, b: i64) -> bool {
            (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
        }
    }

    #[async_trait]
    impl ChatStore for MemoryChatStore {
        async fn user_exists(&self, user_id: i64) -> Result<bool, ChatError> {
            Ok(self.users.contains(&user_id))
        }

        async fn insert_message(
            &self,
            sender_id: i64,
            receiver_id: i64,
            text: &str,
        ) -> Result<ChatMessage, ChatError> {
            let mut messages = self.messages.lock().unwrap();
            let message = ChatMessage {
                id: messages.len() as i64 + 1,
                sender_id,
                receiver_id,
                message: text.to_string(),
                is_read: false,
                created_at: Utc::now(),
            };
            messages.push(message.clone());
            Ok(message)
        }

        async fn messages_after(
            &self,
            viewer_id: i64,
            counterpart_id: i64,
            after_id: i64,
            limit: i64,
        ) -> Result<Vec<ChatMessage>, ChatError> {
            let messages = self.messages.lock().unwrap();
            let pair: Vec<ChatMessage> = messages
                .iter()
                .filter(|m| Self::between(m, viewer_id, counterpart_id))
                .cloned()
                .collect();

            let limit = limit.max(0) as usize;
            if after_id <= 0 {
                let skip = pair.len().saturating_sub(limit);
                Ok(pair.into_iter().skip(skip).collect())
            } else {
                Ok(pair
                    .into_iter()
                    .filter(|m| m.id > after_id)
                    .take(limit)
                    .collect())
            }
        }

        async fn mark_read(&self, viewer_id: i64, counterpart_id: i64) -> Result<u64, ChatError> {
            let mut messages = self.messages.lock().unwrap();
            let mut changed = 0;
            for m in messages.iter_mut() {
                if m.sender_id == counterpart_id && m.receiver_id == viewer_id && !m.is_read {
                    m.is_read = true;
                    changed += 1;
                }
            }
            Ok(changed)
        }

        async fn unread_count(
            &self,
            viewer_id: i64,
            counterpart_id: Option<i64>,
        ) -> Result<i64, ChatError> {
            let messages = self.messages.lock().unwrap();
            Ok(messages
                .iter()
                .filter(|m| m.receiver_id == viewer_id && !m.is_read)
                .filter(|m| counterpart_id.map_or(true, |c| m.sender_id == c))
                .count() as i64)
        }

        async fn conversations(
            &self,
            _viewer_id: i64,
        ) -> Result<Vec<ConversationSummary>, ChatError> {
            Ok(Vec::new())
        }
    }
}
