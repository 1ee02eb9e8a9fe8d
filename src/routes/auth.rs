use axum::{middleware, routing::post, Router};

use crate::auth::controller;
use crate::auth::middleware::optional_auth_middleware;
use crate::state::AppState;

/// JSON token endpoints plus the form posts behind the login and sign-up pages
pub fn routes(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/auth/login", post(controller::login))
        .route("/api/auth/register", post(controller::register))
        .with_state(state.clone());

    let form_routes = Router::new()
        .route("/login", post(controller::login_form))
        .route("/register", post(controller::register_form))
        .with_state(state.clone());

    let logout_routes = Router::new()
        .route("/logout", post(controller::logout))
        .route_layer(middleware::from_fn(optional_auth_middleware))
        .with_state(state);

    api_routes.merge(form_routes).merge(logout_routes)
}
