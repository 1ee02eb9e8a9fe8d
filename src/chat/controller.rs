use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::auth::middleware::AuthUser;
use crate::chat::model::{ChatError, ConversationSummary, MessageView};
use crate::response::ActionResponse;
use crate::state::AppState;

/// Form body of the chat endpoint. Every field arrives as text and is parsed
/// leniently, so a missing or garbled id becomes a validation failure.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChatForm {
    pub action: Option<String>,
    pub receiver_id: Option<String>,
    pub message: Option<String>,
    pub last_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessagesResponse {
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadResponse {
    pub success: bool,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationsResponse {
    pub success: bool,
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UnreadParams {
    /// Restrict the count to one counterpart
    pub user_id: Option<i64>,
}

fn parse_id(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(0)
}

fn to_failure(err: ChatError) -> ActionResponse {
    match err {
        ChatError::DatabaseError(e) => {
            error!("Chat database error: {}", e);
            ActionResponse::failed_error("Database error")
        }
        other => ActionResponse::failed_error(other.to_string()),
    }
}

/// Single form endpoint multiplexing send, fetch and mark-read
#[utoipa::path(
    post,
    path = "/api/chat.php",
    request_body(content = ChatForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "send_message and mark_read answer {success, error?}", body = ActionResponse),
        (status = 200, description = "get_messages answers {messages}", body = MessagesResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chat"
)]
pub async fn chat_action(
    user: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> Response {
    let receiver_id = parse_id(form.receiver_id.as_deref());

    match form.action.as_deref().map(str::trim) {
        Some("send_message") => {
            let text = form.message.as_deref().unwrap_or_default();
            match state.chat.send(user.user_id, receiver_id, text).await {
                Ok(()) => ActionResponse::ok().into_response(),
                Err(e) => to_failure(e).into_response(),
            }
        }
        Some("get_messages") => {
            let last_id = parse_id(form.last_id.as_deref());
            match state.chat.fetch(user.user_id, receiver_id, last_id).await {
                Ok(messages) => Json(MessagesResponse {
                    messages: messages.iter().map(MessageView::from).collect(),
                })
                .into_response(),
                Err(e) => to_failure(e).into_response(),
            }
        }
        Some("mark_read") => match state.chat.mark_read(user.user_id, receiver_id).await {
            Ok(_) => ActionResponse::ok().into_response(),
            Err(e) => to_failure(e).into_response(),
        },
        _ => ActionResponse::failed_error("Invalid action").into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/chat/unread",
    params(UnreadParams),
    responses((status = 200, description = "Unread message count", body = UnreadResponse)),
    security(("bearer_auth" = [])),
    tag = "chat"
)]
pub async fn unread_count(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<UnreadParams>,
) -> Response {
    match state.chat.unread_count(user.user_id, params.user_id).await {
        Ok(unread_count) => Json(UnreadResponse {
            success: true,
            unread_count,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/chat/conversations",
    responses((status = 200, description = "Conversations with last message and unread count", body = ConversationsResponse)),
    security(("bearer_auth" = [])),
    tag = "chat"
)]
pub async fn conversations(user: AuthUser, State(state): State<AppState>) -> Response {
    match state.chat.conversations(user.user_id).await {
        Ok(conversations) => Json(ConversationsResponse {
            success: true,
            conversations,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::jwt::{generate_token, Role};
    use crate::chat::store::memory::MemoryChatStore;
    use crate::routes;
    use crate::state::test_support::lazy_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        routes::chat::routes(lazy_state(Arc::new(MemoryChatStore::with_users(&[1, 2]))))
    }

    async fn post_form(app: &Router, user_id: i64, body: &str) -> Value {
        std::env::set_var("JWT_SECRET", "test_secret");
        let token = generate_token(user_id, Role::User).unwrap();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat.php")
                    .header("Authorization", format!("Bearer {}", token))
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_send_then_poll_then_mark_read() {
        let app = app();

        let sent = post_form(&app, 1, "action=send_message&receiver_id=2&message=hi").await;
        assert_eq!(sent, serde_json::json!({ "success": true }));

        let fetched = post_form(&app, 2, "action=get_messages&receiver_id=1&last_id=0").await;
        let messages = fetched["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["sender_id"], 1);
        assert_eq!(messages[0]["message"], "hi");
        assert!(messages[0]["time"].is_string());

        let cursor = messages[0]["id"].as_i64().unwrap();
        let again = post_form(
            &app,
            2,
            &format!("action=get_messages&receiver_id=1&last_id={}", cursor),
        )
        .await;
        assert!(again["messages"].as_array().unwrap().is_empty());

        let read = post_form(&app, 2, "action=mark_read&receiver_id=1").await;
        assert_eq!(read["success"], true);
    }

    #[tokio::test]
    async fn test_empty_message_reports_error() {
        let body = post_form(&app(), 1, "action=send_message&receiver_id=2&message=%20%20").await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Message cannot be empty");
    }

    #[tokio::test]
    async fn test_unknown_receiver_and_action() {
        let app = app();
        let body = post_form(&app, 1, "action=send_message&receiver_id=99&message=yo").await;
        assert_eq!(body["error"], "Receiver not found");

        let body = post_form(&app, 1, "action=delete_everything").await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid action");
    }

    #[tokio::test]
    async fn test_anonymous_request_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat.php")
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(Body::from("action=mark_read&receiver_id=1"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
