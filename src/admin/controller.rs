use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::admin::model::{AdminError, DashboardStats, ManagedUser, UpdateUserRequest};
use crate::auth::middleware::AuthUser;
use crate::response::ActionResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: DashboardStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManagedUsersResponse {
    pub success: bool,
    pub users: Vec<ManagedUser>,
}

fn to_failure(err: AdminError) -> ActionResponse {
    match err {
        AdminError::DatabaseError(e) => {
            error!("Admin database error: {}", e);
            ActionResponse::failed_message("Database error")
        }
        other => ActionResponse::failed_message(other.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = StatsResponse),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_stats(State(state): State<AppState>) -> Response {
    match state.admin().stats().await {
        Ok(stats) => Json(StatsResponse {
            success: true,
            stats,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users, newest first", body = ManagedUsersResponse),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_users(State(state): State<AppState>) -> Response {
    match state.admin().list_users().await {
        Ok(users) => Json(ManagedUsersResponse {
            success: true,
            users,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses((status = 200, description = "Outcome", body = ActionResponse)),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ActionResponse {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            info!("Rejected user update body: {}", rejection);
            return ActionResponse::failed_message("Invalid request body");
        }
    };

    let update = match request.validate() {
        Ok(update) => update,
        Err(e) => return to_failure(e),
    };

    match state.admin().update_user(user_id, update).await {
        Ok(()) => ActionResponse::ok_with_message("User updated successfully"),
        Err(e) => to_failure(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/delete",
    params(("id" = i64, Path, description = "User ID")),
    responses((status = 200, description = "Outcome", body = ActionResponse)),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_user(
    admin: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ActionResponse {
    match state.admin().delete_user(&admin, user_id).await {
        Ok(files) => {
            for file in &files {
                state.uploads.remove(file).await;
            }
            ActionResponse::ok_with_message("User deleted successfully")
        }
        Err(e) => to_failure(e),
    }
}
