use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::comment::model::{CommentError, CommentView, CreateCommentRequest};
use crate::response::ActionResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentsResponse {
    pub success: bool,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentAddedResponse {
    pub success: bool,
    pub comment_id: i64,
}

fn to_failure(err: CommentError) -> ActionResponse {
    match err {
        CommentError::DatabaseError(e) => {
            error!("Comment database error: {}", e);
            ActionResponse::failed_error("Database error")
        }
        other => ActionResponse::failed_error(other.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    responses((status = 200, description = "Comments, oldest first", body = CommentsResponse)),
    tag = "comments"
)]
pub async fn list_comments(State(state): State<AppState>, Path(post_id): Path<i64>) -> Response {
    match state.comments().list(post_id).await {
        Ok(comments) => Json(CommentsResponse {
            success: true,
            comments,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment added", body = CommentAddedResponse),
        (status = 200, description = "Validation failure or unknown post", body = ActionResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            info!("Rejected comment body: {}", rejection);
            return ActionResponse::failed_error("Invalid request body").into_response();
        }
    };

    let content = match request.validated_content() {
        Ok(content) => content,
        Err(e) => return to_failure(e).into_response(),
    };

    match state.comments().add(user.user_id, post_id, content).await {
        Ok(comment) => Json(CommentAddedResponse {
            success: true,
            comment_id: comment.id,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_token, Role};
    use crate::chat::store::memory::MemoryChatStore;
    use crate::routes;
    use crate::state::test_support::lazy_state;
    use axum::{body::Body, http::Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_blank_comment_rejected_before_database() {
        std::env::set_var("JWT_SECRET", "test_secret");
        let token = generate_token(1, Role::User).unwrap();
        let app = routes::posts::routes(lazy_state(Arc::new(MemoryChatStore::default())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/posts/1/comments")
                    .header("Authorization", format!("Bearer {}", token))
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"content":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Comment cannot be empty");
    }
}
