use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::middleware::auth_middleware;
use crate::recipe::controller;
use crate::state::AppState;
use crate::uploads::IMAGE_MAX_BYTES;

// multipart envelope around a maximum size photo
const IMAGE_BODY_LIMIT: usize = IMAGE_MAX_BYTES + 64 * 1024;

pub fn routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/recipes", get(controller::list_recipes))
        .route("/get_recipe.php", get(controller::get_recipe))
        .with_state(state.clone());

    let private_routes = Router::new()
        .route("/api/recipes", post(controller::create_recipe))
        .route("/api/recipes/:id", post(controller::update_recipe))
        .route("/api/recipes/:id/delete", post(controller::delete_recipe))
        .route(
            "/api/recipe_images",
            post(controller::upload_recipe_image).layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn(auth_middleware))
        .with_state(state);

    public_routes.merge(private_routes)
}
