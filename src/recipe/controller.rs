use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::middleware::AuthUser;
use crate::recipe::model::{Ingredient, RecipeCard, RecipeDetail, RecipeError, RecipeRequest};
use crate::recipe::query::{Pagination, RecipeFilter, RecipeListParams};
use crate::response::ActionResponse;
use crate::state::AppState;
use crate::uploads::{public_url, read_multipart, MediaKind, UploadFolder};

/// Recipe fields in the shape the edit form fills itself from
#[derive(Debug, Serialize, ToSchema)]
pub struct RecipePayload {
    pub id: i64,
    pub title: String,
    pub instructions: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub time: String,
    pub servings: String,
    pub difficulty: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GetRecipeResponse {
    pub success: bool,
    pub recipe: RecipePayload,
    pub ingredients: Vec<Ingredient>,
}

impl From<RecipeDetail> for GetRecipeResponse {
    fn from(detail: RecipeDetail) -> Self {
        let recipe = detail.recipe;
        Self {
            success: true,
            recipe: RecipePayload {
                id: recipe.id,
                title: recipe.title,
                instructions: recipe.instructions,
                image_url: recipe.image_url,
                video_url: recipe.video_url,
                time: recipe.cooking_time,
                servings: recipe.servings,
                difficulty: recipe.difficulty,
            },
            ingredients: detail.ingredients,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeListResponse {
    pub success: bool,
    pub recipes: Vec<RecipeCard>,
    pub pagination: Pagination,
    pub filters_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavedRecipeResponse {
    pub success: bool,
    pub message: String,
    pub recipe_id: i64,
}

/// A stored upload ready to be referenced as a recipe's `image_url`
#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeImageResponse {
    pub success: bool,
    /// Value to submit as `image_url`
    pub image_url: String,
    pub preview_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct GetRecipeParams {
    /// Recipe ID
    pub id: Option<String>,
}

pub(crate) fn to_failure(err: RecipeError) -> ActionResponse {
    match err {
        RecipeError::DatabaseError(e) => {
            error!("Recipe database error: {}", e);
            ActionResponse::failed_message("Database error")
        }
        other => ActionResponse::failed_message(other.to_string()),
    }
}

/// Fetch one recipe with its ingredients
#[utoipa::path(
    get,
    path = "/get_recipe.php",
    params(GetRecipeParams),
    responses(
        (status = 200, description = "Recipe found", body = GetRecipeResponse),
        (status = 200, description = "Missing or unknown id", body = ActionResponse)
    ),
    tag = "recipes"
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    Query(params): Query<GetRecipeParams>,
) -> Response {
    let recipe_id = params
        .id
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|id| *id > 0);

    let Some(recipe_id) = recipe_id else {
        return ActionResponse::failed_message("Invalid recipe ID").into_response();
    };

    match state.recipes().get(recipe_id).await {
        Ok(detail) => Json(GetRecipeResponse::from(detail)).into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

/// Filtered, sorted, paginated listing
#[utoipa::path(
    get,
    path = "/api/recipes",
    params(RecipeListParams),
    responses((status = 200, description = "One page of recipes", body = RecipeListResponse)),
    tag = "recipes"
)]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<RecipeListParams>,
) -> Response {
    let filter = RecipeFilter::from_params(&params);

    match state.recipes().list(&filter, params.requested_page()).await {
        Ok(page) => Json(RecipeListResponse {
            success: true,
            recipes: page.recipes,
            pagination: page.pagination,
            filters_active: page.filters_active,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

fn parse_body(payload: Result<Json<RecipeRequest>, JsonRejection>) -> Result<RecipeRequest, ActionResponse> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        info!("Rejected recipe body: {}", rejection);
        ActionResponse::failed_message("Invalid request body")
    })
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    request_body = RecipeRequest,
    responses(
        (status = 200, description = "Recipe created", body = SavedRecipeResponse),
        (status = 200, description = "Validation failure", body = ActionResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn create_recipe(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> Response {
    let request = match parse_body(payload) {
        Ok(request) => request,
        Err(failure) => return failure.into_response(),
    };

    let result = match request.validate() {
        Ok(valid) => state.recipes().create(&user, &valid).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(recipe) => Json(SavedRecipeResponse {
            success: true,
            message: "Recipe added successfully".to_string(),
            recipe_id: recipe.id,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}",
    params(("id" = i64, Path, description = "Recipe ID")),
    request_body = RecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = SavedRecipeResponse),
        (status = 200, description = "Validation, permission or lookup failure", body = ActionResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn update_recipe(
    user: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i64>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> Response {
    let request = match parse_body(payload) {
        Ok(request) => request,
        Err(failure) => return failure.into_response(),
    };

    let result = match request.validate() {
        Ok(valid) => state.recipes().update(&user, recipe_id, &valid).await,
        Err(e) => Err(e),
    };

    match result {
        Ok((recipe, orphaned)) => {
            if let Some(path) = orphaned {
                state.uploads.remove(&path).await;
            }
            Json(SavedRecipeResponse {
                success: true,
                message: "Recipe updated successfully".to_string(),
                recipe_id: recipe.id,
            })
            .into_response()
        }
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/delete",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses((status = 200, description = "Outcome", body = ActionResponse)),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn delete_recipe(
    user: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i64>,
) -> ActionResponse {
    match state.recipes().delete(&user, recipe_id).await {
        Ok(orphaned) => {
            if let Some(path) = orphaned {
                state.uploads.remove(&path).await;
            }
            ActionResponse::ok_with_message("Recipe deleted successfully")
        }
        Err(e) => to_failure(e),
    }
}

/// Store a recipe photo ahead of the create/update call that references it
#[utoipa::path(
    post,
    path = "/api/recipe_images",
    request_body(content = String, content_type = "multipart/form-data", description = "Image in the `image` field"),
    responses(
        (status = 200, description = "Stored image", body = RecipeImageResponse),
        (status = 200, description = "Missing, oversized or unsupported file", body = ActionResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn upload_recipe_image(
    user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    let file = match read_multipart(multipart, "image").await {
        Ok(form) => form.file,
        Err(e) => return ActionResponse::failed_message(e.to_string()).into_response(),
    };

    let Some(file) = file else {
        return ActionResponse::failed_message("No image uploaded").into_response();
    };

    match state
        .uploads
        .save(
            UploadFolder::Recipes,
            "recipe",
            &file.file_name,
            &file.bytes,
            &[MediaKind::Image],
        )
        .await
    {
        Ok(stored) => {
            info!("User {} uploaded recipe image {}", user.user_id, stored.relative_path);
            Json(RecipeImageResponse {
                success: true,
                preview_url: public_url(&stored.relative_path),
                image_url: stored.relative_path,
            })
            .into_response()
        }
        Err(e) => ActionResponse::failed_message(e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_token, Role};
    use crate::chat::store::memory::MemoryChatStore;
    use crate::routes;
    use crate::state::test_support::lazy_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use chrono::Utc;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[test]
    fn test_get_recipe_shape() {
        let detail = RecipeDetail {
            recipe: crate::recipe::model::Recipe {
                id: 3,
                title: "Chocolate Cake".to_string(),
                instructions: "Bake".to_string(),
                image_url: None,
                video_url: Some("https://video.example/cake".to_string()),
                cooking_time: "45 min".to_string(),
                servings: "8".to_string(),
                difficulty: "Hard".to_string(),
                created_by: 1,
                created_at: Utc::now(),
            },
            creator_name: "Ana".to_string(),
            ingredients: vec![Ingredient {
                ingredient_name: "Cocoa".to_string(),
                quantity: "50g".to_string(),
            }],
        };

        let json = serde_json::to_value(GetRecipeResponse::from(detail)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["recipe"]["time"], "45 min");
        assert_eq!(json["recipe"]["difficulty"], "Hard");
        assert!(json["recipe"].get("created_by").is_none());
        assert_eq!(json["ingredients"][0]["ingredient_name"], "Cocoa");
    }

    fn multipart_body(file_name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--BOUNDARY\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            file_name
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n--BOUNDARY--\r\n");
        body
    }

    async fn upload(file_name: &str, bytes: &[u8]) -> serde_json::Value {
        std::env::set_var("JWT_SECRET", "test_secret");
        let token = generate_token(5, Role::User).unwrap();
        let app = routes::recipes::routes(lazy_state(Arc::new(MemoryChatStore::default())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/recipe_images")
                    .header("Authorization", format!("Bearer {}", token))
                    .header("Content-Type", "multipart/form-data; boundary=BOUNDARY")
                    .body(Body::from(multipart_body(file_name, bytes)))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_recipe_image_stored_under_recipe_folder() {
        let json = upload("Cake.PNG", b"png-bytes").await;
        assert_eq!(json["success"], true);

        let path = json["image_url"].as_str().unwrap();
        assert!(path.starts_with("recipes/recipe_"));
        assert!(path.ends_with(".png"));
        assert_eq!(json["preview_url"], format!("/uploads/{}", path));

        let store = lazy_state(Arc::new(MemoryChatStore::default())).uploads;
        assert!(store.exists(path));
        store.remove(path).await;
    }

    #[tokio::test]
    async fn test_recipe_image_rejects_video() {
        let json = upload("clip.mp4", b"not-an-image").await;
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().starts_with("Invalid file type"));
    }

    #[tokio::test]
    async fn test_invalid_id_answers_without_database() {
        let app = Router::new()
            .route("/get_recipe.php", get(get_recipe))
            .with_state(lazy_state(Arc::new(MemoryChatStore::default())));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/get_recipe.php?id=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(
            &bytes[..],
            br#"{"success":false,"message":"Invalid recipe ID"}"#
        );
    }
}
