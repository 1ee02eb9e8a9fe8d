use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::middleware::AuthUser;
use crate::notification::model::{BroadcastRequest, NotificationError, NotificationView};
use crate::notification::service::plan_broadcast;
use crate::response::ActionResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CheckNotificationsParams {
    /// Highest notification id the client has already seen
    last_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckNotificationsResponse {
    pub success: bool,
    pub notifications: Vec<NotificationView>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BroadcastResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

fn to_failure(err: NotificationError) -> ActionResponse {
    match err {
        NotificationError::DatabaseError(e) => {
            error!("Notification database error: {}", e);
            ActionResponse::failed_message("Database error")
        }
        NotificationError::NotFound => ActionResponse::failed_message("Notification not found"),
        NotificationError::Validation(msg) => ActionResponse::failed_message(msg),
    }
}

/// Poll for notifications newer than the client's cursor
#[utoipa::path(
    get,
    path = "/check_notifications.php",
    params(CheckNotificationsParams),
    responses(
        (status = 200, description = "New notifications and unread count", body = CheckNotificationsResponse)
    ),
    tag = "notifications"
)]
pub async fn check_notifications(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<CheckNotificationsParams>,
) -> Response {
    let last_id = params
        .last_id
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(0);

    let service = state.notifications();
    let result = async {
        let fresh = service.since(user.user_id, last_id).await?;
        let unread = service.unread_count(user.user_id).await?;
        Ok::<_, NotificationError>((fresh, unread))
    }
    .await;

    match result {
        Ok((fresh, unread_count)) => Json(CheckNotificationsResponse {
            success: true,
            notifications: fresh.into_iter().map(NotificationView::from).collect(),
            unread_count,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

/// Mark one of the caller's notifications as read
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(("id" = i64, Path, description = "Notification ID")),
    responses((status = 200, description = "Outcome", body = ActionResponse)),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn mark_notification_read(
    user: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
) -> ActionResponse {
    match state
        .notifications()
        .mark_read(user.user_id, notification_id)
        .await
    {
        Ok(()) => ActionResponse::ok(),
        Err(e) => to_failure(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/notifications/read_all",
    responses((status = 200, description = "Outcome", body = ActionResponse)),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn mark_all_notifications_read(
    user: AuthUser,
    State(state): State<AppState>,
) -> ActionResponse {
    match state.notifications().mark_all_read(user.user_id).await {
        Ok(count) => ActionResponse::ok_with_message(format!("{} notifications marked as read", count)),
        Err(e) => to_failure(e),
    }
}

/// Admin broadcast to an explicit recipient list
#[utoipa::path(
    post,
    path = "/send_notification.php",
    responses(
        (status = 200, description = "Broadcast outcome", body = BroadcastResponse),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn send_notification(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<BroadcastRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            info!("Rejected broadcast body: {}", rejection);
            return Json(BroadcastResponse {
                success: false,
                message: "Invalid request body".to_string(),
                count: None,
            })
            .into_response();
        }
    };

    let plan = match plan_broadcast(user.user_id, &request) {
        Ok(plan) => plan,
        Err(e) => {
            return Json(BroadcastResponse {
                success: false,
                message: e.to_string(),
                count: None,
            })
            .into_response()
        }
    };

    match state.notifications().broadcast(&plan).await {
        Ok(outcome) if outcome.sent > 0 => Json(BroadcastResponse {
            success: true,
            message: format!("Notification sent to {} user(s)", outcome.sent),
            count: Some(outcome.sent),
        })
        .into_response(),
        Ok(_) => Json(BroadcastResponse {
            success: false,
            message: "Notification could not be delivered to any recipient".to_string(),
            count: Some(0),
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}
