use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::middleware::auth_middleware;
use crate::chat::controller;
use crate::state::AppState;

/// Chat endpoints polled by the conversation page
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat.php", post(controller::chat_action))
        .route("/api/chat", post(controller::chat_action))
        .route("/api/chat/unread", get(controller::unread_count))
        .route("/api/chat/conversations", get(controller::conversations))
        .route_layer(middleware::from_fn(auth_middleware))
        .with_state(state)
}
