use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::middleware::{admin_middleware, auth_middleware};
use crate::notification::controller;
use crate::state::AppState;
use crate::websocket::events::ws_handler;

/// Polling, read-tracking and admin broadcast routes, plus the push socket
pub fn routes(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/check_notifications.php", get(controller::check_notifications))
        .route(
            "/api/notifications/:id/read",
            post(controller::mark_notification_read),
        )
        .route(
            "/api/notifications/read_all",
            post(controller::mark_all_notifications_read),
        )
        .route_layer(middleware::from_fn(auth_middleware))
        .with_state(state.clone());

    // admin_middleware runs after auth_middleware has inserted the AuthUser
    let admin_routes = Router::new()
        .route("/send_notification.php", post(controller::send_notification))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn(auth_middleware))
        .with_state(state.clone());

    // the socket authenticates through its own query token
    let socket_routes = Router::new()
        .route("/api/events/ws", get(ws_handler))
        .with_state(state);

    user_routes.merge(admin_routes).merge(socket_routes)
}
