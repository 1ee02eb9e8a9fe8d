use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::middleware::auth_middleware;
use crate::state::AppState;
use crate::uploads::IMAGE_MAX_BYTES;
use crate::user::controller;

// room for the multipart envelope around a maximum size picture
const PICTURE_BODY_LIMIT: usize = IMAGE_MAX_BYTES + 64 * 1024;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/users", get(controller::list_users))
        .route(
            "/api/profile",
            get(controller::get_profile).post(controller::update_profile),
        )
        .route(
            "/api/profile/picture",
            post(controller::upload_picture).layer(DefaultBodyLimit::max(PICTURE_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn(auth_middleware))
        .with_state(state)
}
