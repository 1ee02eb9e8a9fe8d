use redis::{AsyncCommands, Client, RedisError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Redis channel a user's events are published on
pub fn user_channel(user_id: i64) -> String {
    format!("forge:user:{}", user_id)
}

/// Event pushed to connected clients. Ids match the polling endpoints,
/// so push and poll clients share one cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    ChatMessage {
        id: i64,
        sender_id: i64,
        receiver_id: i64,
        message: String,
        time: String,
    },
    Notification {
        id: i64,
        notification_type: String,
        title: String,
        message: String,
        related_id: Option<i64>,
    },
}

/// Optional pub/sub fan-out for the websocket push channel
#[derive(Debug, Clone)]
pub struct EventBus {
    client: Client,
}

impl EventBus {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn publish(&self, user_id: i64, event: &RealtimeEvent) -> Result<(), RedisError> {
        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize realtime event: {}", e);
                return Ok(());
            }
        };

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let receivers: i64 = conn.publish(user_channel(user_id), &payload).await?;
        debug!(
            "Published event to user {} ({} subscribers)",
            user_id, receivers
        );
        Ok(())
    }
}

/// Fire-and-forget publish after a commit; delivery is best effort
pub async fn publish_best_effort(bus: Option<&EventBus>, user_id: i64, event: RealtimeEvent) {
    if let Some(bus) = bus {
        if let Err(e) = bus.publish(user_id, &event).await {
            error!("Failed to publish realtime event to user {}: {}", user_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_channel_format() {
        assert_eq!(user_channel(42), "forge:user:42");
    }

    #[test]
    fn test_chat_event_serialization() {
        let event = RealtimeEvent::ChatMessage {
            id: 10,
            sender_id: 1,
            receiver_id: 2,
            message: "hi".to_string(),
            time: "09:15 AM".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chat_message""#));
        assert!(json.contains(r#""id":10"#));

        let back: RealtimeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_notification_event_tag() {
        let event = RealtimeEvent::Notification {
            id: 3,
            notification_type: "like".to_string(),
            title: "New like".to_string(),
            message: "Ana liked your post".to_string(),
            related_id: Some(7),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"notification""#));
        assert!(json.contains(r#""notification_type":"like""#));
    }

    #[tokio::test]
    async fn test_publish_without_bus_is_noop() {
        publish_best_effort(
            None,
            1,
            RealtimeEvent::Notification {
                id: 1,
                notification_type: "message".to_string(),
                title: "t".to_string(),
                message: "m".to_string(),
                related_id: None,
            },
        )
        .await;
    }
}
