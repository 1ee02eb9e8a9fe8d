use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::post::model::{validate_content, FeedParams, FeedPost, PostError};
use crate::response::ActionResponse;
use crate::state::AppState;
use crate::uploads::{read_multipart, MediaKind, UploadFolder};

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedResponse {
    pub success: bool,
    pub posts: Vec<FeedPost>,
    pub page: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedPostResponse {
    pub success: bool,
    pub message: String,
    pub post_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeResponse {
    pub success: bool,
    pub liked: bool,
    pub likes_count: i64,
}

fn to_failure(err: PostError) -> ActionResponse {
    match err {
        PostError::DatabaseError(e) => {
            error!("Post database error: {}", e);
            ActionResponse::failed_error("Database error")
        }
        other => ActionResponse::failed_error(other.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/api/posts",
    params(FeedParams),
    responses((status = 200, description = "One page of the feed", body = FeedResponse)),
    tag = "posts"
)]
pub async fn get_feed(
    Extension(viewer): Extension<Option<AuthUser>>,
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Response {
    let page = params.page();
    match state.posts().feed(viewer.map(|v| v.user_id), page).await {
        Ok(posts) => Json(FeedResponse {
            success: true,
            posts,
            page,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

/// Multipart body: `content` text plus an optional `media` image or video
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Post created", body = CreatedPostResponse),
        (status = 200, description = "Validation or upload failure", body = ActionResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    let result = async {
        let form = read_multipart(multipart, "media").await?;
        let content = validate_content(form.text("content"), form.file.is_some())?;

        let stored = match &form.file {
            Some(file) => Some(
                state
                    .uploads
                    .save(
                        UploadFolder::Posts,
                        "post",
                        &file.file_name,
                        &file.bytes,
                        &[MediaKind::Image, MediaKind::Video],
                    )
                    .await?,
            ),
            None => None,
        };

        match state.posts().create(user.user_id, &content, stored.as_ref()).await {
            Ok(post) => Ok::<_, PostError>(post),
            Err(e) => {
                // the row never landed, so the file would be orphaned
                if let Some(file) = &stored {
                    state.uploads.remove(&file.relative_path).await;
                }
                Err(e)
            }
        }
    }
    .await;

    match result {
        Ok(post) => Json(CreatedPostResponse {
            success: true,
            message: "Post created successfully".to_string(),
            post_id: post.id,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/posts/{id}/like",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Like toggled", body = LikeResponse),
        (status = 200, description = "Post not found", body = ActionResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn toggle_like(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Response {
    match state.posts().toggle_like(user.user_id, post_id).await {
        Ok(outcome) => Json(LikeResponse {
            success: true,
            liked: outcome.liked,
            likes_count: outcome.likes_count,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/posts/{id}/delete",
    params(("id" = i64, Path, description = "Post ID")),
    responses((status = 200, description = "Outcome", body = ActionResponse)),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ActionResponse {
    match state.posts().delete(&user, post_id).await {
        Ok(media) => {
            if let Some(path) = media {
                state.uploads.remove(&path).await;
            }
            ActionResponse::ok_with_message("Post deleted successfully")
        }
        Err(e) => {
            warn!("Delete of post {} by {} failed: {}", post_id, user.user_id, e);
            to_failure(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploads::UploadError;

    #[test]
    fn test_upload_errors_surface_as_messages() {
        let failure = to_failure(PostError::Upload(UploadError::TooLarge(50)));
        let json = serde_json::to_value(failure).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "File is too large. Maximum size is 50MB");
    }

    #[test]
    fn test_validation_error_message() {
        let json = serde_json::to_value(to_failure(PostError::NotFound)).unwrap();
        assert_eq!(json["error"], "Post not found");
    }
}
