use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};

use crate::notification::model::{
    BroadcastOutcome, BroadcastRequest, NewNotification, Notification, NotificationError,
    NotificationType,
};
use crate::realtime::{publish_best_effort, EventBus, RealtimeEvent};

const NOTIFICATIONS_PAGE_LIMIT: i64 = 50;

/// Self-actions never produce a notification
pub fn should_notify(actor_id: i64, target_id: i64) -> bool {
    actor_id != target_id
}

/// Insert on the caller's connection so it can share the caller's transaction
pub async fn insert(
    conn: &mut PgConnection,
    notification: &NewNotification,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO forge.notifications (user_id, type, title, message, related_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(notification.user_id)
    .bind(notification.notification_type.as_str())
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.related_id)
    .fetch_one(conn)
    .await
}

pub fn realtime_event(notification: &Notification) -> RealtimeEvent {
    RealtimeEvent::Notification {
        id: notification.id,
        notification_type: notification.notification_type.clone(),
        title: notification.title.clone(),
        message: notification.message.clone(),
        related_id: notification.related_id,
    }
}

/// Push a committed notification to its recipient
pub async fn publish(bus: Option<&EventBus>, notification: &Notification) {
    publish_best_effort(bus, notification.user_id, realtime_event(notification)).await;
}

/// Validated broadcast: recipients deduplicated, sender and invalid ids dropped
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastPlan {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub recipients: Vec<i64>,
}

pub fn plan_broadcast(
    sender_id: i64,
    request: &BroadcastRequest,
) -> Result<BroadcastPlan, NotificationError> {
    let title = request.title.trim();
    let message = request.message.trim();

    if title.is_empty() || message.is_empty() {
        return Err(NotificationError::Validation(
            "Title and message are required".to_string(),
        ));
    }

    let notification_type = NotificationType::parse(&request.notification_type)
        .ok_or_else(|| NotificationError::Validation("Invalid notification type".to_string()))?;

    let mut recipients: Vec<i64> = Vec::new();
    for id in request.recipients.iter().filter_map(|r| r.as_id()) {
        if id > 0 && id != sender_id && !recipients.contains(&id) {
            recipients.push(id);
        }
    }

    if recipients.is_empty() {
        return Err(NotificationError::Validation(
            "No valid recipients selected".to_string(),
        ));
    }

    Ok(BroadcastPlan {
        notification_type,
        title: title.to_string(),
        message: message.to_string(),
        recipients,
    })
}

#[derive(Debug, Clone)]
pub struct NotificationService {
    pool: PgPool,
    bus: Option<EventBus>,
}

impl NotificationService {
    pub fn new(pool: PgPool, bus: Option<EventBus>) -> Self {
        Self { pool, bus }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Notification>, NotificationError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM forge.notifications
            WHERE user_id = $1
            ORDER BY id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(NOTIFICATIONS_PAGE_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// Notifications newer than the client's cursor, oldest first
    pub async fn since(
        &self,
        user_id: i64,
        last_id: i64,
    ) -> Result<Vec<Notification>, NotificationError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM forge.notifications
            WHERE user_id = $1 AND id > $2
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(last_id.max(0))
        .bind(NOTIFICATIONS_PAGE_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<i64, NotificationError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM forge.notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn mark_read(&self, user_id: i64, notification_id: i64) -> Result<(), NotificationError> {
        let result = sqlx::query(
            "UPDATE forge.notifications SET is_read = true WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64, NotificationError> {
        let result = sqlx::query(
            "UPDATE forge.notifications SET is_read = true WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// One row per recipient; a failed insert is skipped and counted, never rolled back
    pub async fn broadcast(&self, plan: &BroadcastPlan) -> Result<BroadcastOutcome, NotificationError> {
        let mut conn = self.pool.acquire().await?;
        let mut outcome = BroadcastOutcome { sent: 0, failed: 0 };

        for recipient in &plan.recipients {
            let new = NewNotification {
                user_id: *recipient,
                notification_type: plan.notification_type,
                title: plan.title.clone(),
                message: plan.message.clone(),
                related_id: None,
            };

            match insert(&mut *conn, &new).await {
                Ok(notification) => {
                    outcome.sent += 1;
                    publish(self.bus.as_ref(), &notification).await;
                }
                Err(e) => {
                    warn!("Skipping broadcast recipient {}: {}", recipient, e);
                    outcome.failed += 1;
                }
            }
        }

        info!(
            "Broadcast '{}' delivered to {} users ({} failed)",
            plan.title, outcome.sent, outcome.failed
        );
        Ok(outcome)
    }
}
