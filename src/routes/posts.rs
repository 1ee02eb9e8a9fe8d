use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::middleware::{auth_middleware, optional_auth_middleware};
use crate::comment::controller as comments;
use crate::post::controller;
use crate::state::AppState;
use crate::uploads::VIDEO_MAX_BYTES;

/// Room for the largest video plus the text fields around it
const POST_BODY_LIMIT: usize = VIDEO_MAX_BYTES + 1024 * 1024;

pub fn routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/posts", get(controller::get_feed))
        .route("/api/posts/:id/comments", get(comments::list_comments))
        .route_layer(middleware::from_fn(optional_auth_middleware))
        .with_state(state.clone());

    let private_routes = Router::new()
        .route(
            "/api/posts",
            post(controller::create_post).layer(DefaultBodyLimit::max(POST_BODY_LIMIT)),
        )
        .route("/api/posts/:id/like", post(controller::toggle_like))
        .route("/api/posts/:id/delete", post(controller::delete_post))
        .route("/api/posts/:id/comments", post(comments::add_comment))
        .route_layer(middleware::from_fn(auth_middleware))
        .with_state(state);

    public_routes.merge(private_routes)
}
