use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::middleware::{optional_auth_middleware, page_auth_middleware};
use crate::pages::controller;
use crate::state::AppState;

/// Server-rendered pages. Browsing is open; everything personal needs a session.
pub fn routes(state: AppState) -> Router {
    let public_pages = Router::new()
        .route("/", get(controller::home))
        .route("/recipes", get(controller::recipes_page))
        .route("/recipes/:id", get(controller::recipe_page))
        .route("/feed", get(controller::feed_page))
        .route("/login", get(controller::login_page))
        .route("/register", get(controller::register_page))
        .route_layer(middleware::from_fn(optional_auth_middleware))
        .with_state(state.clone());

    let private_pages = Router::new()
        .route("/recipes/:id/delete", post(controller::delete_recipe_form))
        .route("/chat", get(controller::chat_page))
        .route("/chat/:user_id", get(controller::conversation_page))
        .route("/notifications", get(controller::notifications_page))
        .route("/admin", get(controller::admin_page))
        .route("/profile", get(controller::profile_page))
        .route_layer(middleware::from_fn(page_auth_middleware))
        .with_state(state);

    public_pages.merge(private_pages)
}
