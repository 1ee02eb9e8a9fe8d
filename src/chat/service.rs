use std::sync::Arc;
use tracing::{info, warn};

use crate::chat::model::{ChatError, ChatMessage, ConversationSummary};
use crate::chat::store::ChatStore;
use crate::realtime::{publish_best_effort, EventBus, RealtimeEvent};

/// Upper bound on messages returned by a single fetch
pub const CHAT_HISTORY_LIMIT: i64 = 100;
pub const MAX_MESSAGE_CHARS: usize = 2000;
/// Client poll period, rendered into the chat page script
pub const POLL_INTERVAL_MS: u64 = 2000;

pub struct ChatService {
    store: Arc<dyn ChatStore>,
    bus: Option<EventBus>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, bus: Option<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Store one unread message. The caller only learns success; the message
    /// itself shows up on the sender's next poll.
    pub async fn send(&self, sender_id: i64, receiver_id: i64, text: &str) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Validation("Message cannot be empty".to_string()));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatError::Validation(format!(
                "Message is too long (max {} characters)",
                MAX_MESSAGE_CHARS
            )));
        }
        if receiver_id <= 0 {
            return Err(ChatError::Validation("Invalid receiver".to_string()));
        }
        if receiver_id == sender_id {
            return Err(ChatError::Validation(
                "You cannot send a message to yourself".to_string(),
            ));
        }
        if !self.store.user_exists(receiver_id).await? {
            warn!("Chat send from {} to missing user {}", sender_id, receiver_id);
            return Err(ChatError::ReceiverNotFound);
        }

        let message = self.store.insert_message(sender_id, receiver_id, text).await?;
        self.publish(&message).await;
        Ok(())
    }

    /// Messages between the pair newer than `since_id`, ascending by id
    pub async fn fetch(
        &self,
        viewer_id: i64,
        counterpart_id: i64,
        since_id: i64,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        if counterpart_id <= 0 {
            return Err(ChatError::Validation("Invalid receiver".to_string()));
        }
        self.store
            .messages_after(viewer_id, counterpart_id, since_id.max(0), CHAT_HISTORY_LIMIT)
            .await
    }

    pub async fn mark_read(&self, viewer_id: i64, counterpart_id: i64) -> Result<u64, ChatError> {
        if counterpart_id <= 0 {
            return Err(ChatError::Validation("Invalid receiver".to_string()));
        }
        let changed = self.store.mark_read(viewer_id, counterpart_id).await?;
        if changed > 0 {
            info!(
                "User {} read {} messages from {}",
                viewer_id, changed, counterpart_id
            );
        }
        Ok(changed)
    }

    pub async fn unread_count(
        &self,
        viewer_id: i64,
        counterpart_id: Option<i64>,
    ) -> Result<i64, ChatError> {
        self.store.unread_count(viewer_id, counterpart_id).await
    }

    pub async fn conversations(&self, viewer_id: i64) -> Result<Vec<ConversationSummary>, ChatError> {
        self.store.conversations(viewer_id).await
    }

    async fn publish(&self, message: &ChatMessage) {
        let event = RealtimeEvent::ChatMessage {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            message: message.message.clone(),
            time: message.display_time(),
        };
        publish_best_effort(self.bus.as_ref(), message.receiver_id, event.clone()).await;
        publish_best_effort(self.bus.as_ref(), message.sender_id, event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::store::memory::MemoryChatStore;
    use crate::chat::store::MockChatStore;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn memory_service(users: &[i64]) -> ChatService {
        ChatService::new(Arc::new(MemoryChatStore::with_users(users)), None)
    }

    #[tokio::test]
    async fn test_send_rejects_blank_message() {
        let mut store = MockChatStore::new();
        store.expect_insert_message().never();
        let service = ChatService::new(Arc::new(store), None);

        let result = service.send(1, 2, "   ").await;
        assert!(matches!(result, Err(ChatError::Validation(msg)) if msg == "Message cannot be empty"));
    }

    #[tokio::test]
    async fn test_send_rejects_self_message() {
        let mut store = MockChatStore::new();
        store.expect_user_exists().never();
        let service = ChatService::new(Arc::new(store), None);

        assert!(matches!(
            service.send(3, 3, "hello me").await,
            Err(ChatError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_send_rejects_unknown_receiver() {
        let mut store = MockChatStore::new();
        store
            .expect_user_exists()
            .with(eq(42))
            .times(1)
            .returning(|_| Ok(false));
        store.expect_insert_message().never();
        let service = ChatService::new(Arc::new(store), None);

        assert!(matches!(
            service.send(1, 42, "anyone there?").await,
            Err(ChatError::ReceiverNotFound)
        ));
    }

    #[tokio::test]
    async fn test_send_trims_before_insert() {
        let mut store = MockChatStore::new();
        store.expect_user_exists().returning(|_| Ok(true));
        store
            .expect_insert_message()
            .withf(|sender, receiver, text| *sender == 1 && *receiver == 2 && text == "hi")
            .times(1)
            .returning(|sender_id, receiver_id, text| {
                Ok(ChatMessage {
                    id: 1,
                    sender_id,
                    receiver_id,
                    message: text.to_string(),
                    is_read: false,
                    created_at: Utc::now(),
                })
            });
        let service = ChatService::new(Arc::new(store), None);

        service.send(1, 2, "  hi \n").await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_clamps_negative_cursor() {
        let mut store = MockChatStore::new();
        store
            .expect_messages_after()
            .with(eq(1), eq(2), eq(0), eq(CHAT_HISTORY_LIMIT))
            .times(1)
            .returning(|_, _, _, _| Ok(Vec::new()));
        let service = ChatService::new(Arc::new(store), None);

        assert!(service.fetch(1, 2, -10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hi_scenario_then_mark_read() {
        let service = memory_service(&[1, 2]);
        service.send(1, 2, "hi").await.unwrap();

        let messages = service.fetch(2, 1, 0).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_id, 1);
        assert_eq!(messages[0].message, "hi");
        assert!(!messages[0].is_read);
        assert_eq!(service.unread_count(2, Some(1)).await.unwrap(), 1);

        service.mark_read(2, 1).await.unwrap();
        assert_eq!(service.unread_count(2, None).await.unwrap(), 0);
        assert_eq!(service.fetch(2, 1, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cursor_never_repeats_or_skips() {
        let service = memory_service(&[1, 2, 3]);
        service.send(1, 2, "one").await.unwrap();
        service.send(2, 1, "two").await.unwrap();
        service.send(3, 2, "other conversation").await.unwrap();

        let first = service.fetch(1, 2, 0).await.unwrap();
        let mut cursor = first.iter().map(|m| m.id).max().unwrap();
        let mut seen: Vec<i64> = first.iter().map(|m| m.id).collect();

        service.send(1, 2, "three").await.unwrap();
        service.send(2, 1, "four").await.unwrap();

        let second = service.fetch(1, 2, cursor).await.unwrap();
        assert!(second.iter().all(|m| m.id > cursor));
        seen.extend(second.iter().map(|m| m.id));
        cursor = seen.iter().copied().max().unwrap();

        assert!(service.fetch(1, 2, cursor).await.unwrap().is_empty());

        let all = service.fetch(2, 1, 0).await.unwrap();
        let all_ids: Vec<i64> = all.iter().map(|m| m.id).collect();
        assert_eq!(seen, all_ids);
    }

    #[tokio::test]
    async fn test_first_load_is_capped_to_most_recent() {
        let service = memory_service(&[1, 2]);
        for i in 0..(CHAT_HISTORY_LIMIT + 5) {
            service.send(1, 2, &format!("msg {}", i)).await.unwrap();
        }

        let first = service.fetch(2, 1, 0).await.unwrap();
        assert_eq!(first.len() as i64, CHAT_HISTORY_LIMIT);
        assert_eq!(first.last().unwrap().message, format!("msg {}", CHAT_HISTORY_LIMIT + 4));
        assert!(first.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent_and_directional() {
        let service = memory_service(&[1, 2]);
        service.send(1, 2, "ping").await.unwrap();
        service.send(2, 1, "pong").await.unwrap();

        assert_eq!(service.mark_read(2, 1).await.unwrap(), 1);
        assert_eq!(service.mark_read(2, 1).await.unwrap(), 0);
        assert_eq!(service.unread_count(2, None).await.unwrap(), 0);

        // the reply user 2 sent stays unread for user 1
        assert_eq!(service.unread_count(1, Some(2)).await.unwrap(), 1);
    }
}
