use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::admin::controller;
use crate::auth::middleware::{admin_middleware, auth_middleware};
use crate::state::AppState;

/// Dashboard data and user management, admins only
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/admin/stats", get(controller::get_stats))
        .route("/api/admin/users", get(controller::list_users))
        .route("/api/admin/users/:id", post(controller::update_user))
        .route("/api/admin/users/:id/delete", post(controller::delete_user))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn(auth_middleware))
        .with_state(state)
}
