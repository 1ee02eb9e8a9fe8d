use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::response::ActionResponse;
use crate::state::AppState;
use crate::uploads::{public_url, read_multipart, MediaKind, UploadError, UploadFolder};
use crate::user::model::{PublicUser, UpdateProfileRequest, User, UserError};

const PICTURE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<PublicUser>,
}

/// The signed-in user's own record
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub initials: String,
    pub avatar_color: String,
    pub profile_picture_url: Option<String>,
    pub role: String,
    pub status: String,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            initials: user.initials,
            avatar_color: user.avatar_color,
            profile_picture_url: user.profile_picture.as_deref().map(public_url),
            role: user.role,
            status: user.status,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: ProfileView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PictureResponse {
    pub success: bool,
    pub profile_picture_url: String,
}

fn to_failure(err: UserError) -> ActionResponse {
    match err {
        UserError::DatabaseError(e) => {
            error!("User database error: {}", e);
            ActionResponse::failed_message("Database error")
        }
        other => ActionResponse::failed_message(other.to_string()),
    }
}

fn picture_extension_allowed(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| PICTURE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "Everyone except the caller", body = UsersResponse)),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(user: AuthUser, State(state): State<AppState>) -> Response {
    match state.users().list_others(user.user_id).await {
        Ok(users) => Json(UsersResponse {
            success: true,
            users,
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses((status = 200, description = "Caller's profile", body = ProfileResponse)),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_profile(user: AuthUser, State(state): State<AppState>) -> Response {
    match state.users().find_by_id(user.user_id).await {
        Ok(found) => Json(ProfileResponse {
            success: true,
            user: found.into(),
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated profile", body = ProfileResponse)),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            info!("Rejected profile body: {}", rejection);
            return ActionResponse::failed_message("Invalid request body").into_response();
        }
    };

    match state
        .users()
        .update_profile(user.user_id, request.name, request.email)
        .await
    {
        Ok(updated) => Json(ProfileResponse {
            success: true,
            user: updated.into(),
        })
        .into_response(),
        Err(e) => to_failure(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/profile/picture",
    request_body(content = String, content_type = "multipart/form-data", description = "Image in the `picture` field"),
    responses((status = 200, description = "Stored picture", body = PictureResponse)),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn upload_picture(
    user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    let file = match read_multipart(multipart, "picture").await {
        Ok(form) => form.file,
        Err(e) => return ActionResponse::failed_message(e.to_string()).into_response(),
    };

    let Some(file) = file else {
        return ActionResponse::failed_message("No picture uploaded").into_response();
    };

    if !picture_extension_allowed(&file.file_name) {
        let err = UploadError::UnsupportedType(PICTURE_EXTENSIONS.join(", "));
        return ActionResponse::failed_message(err.to_string()).into_response();
    }

    let stored = match state
        .uploads
        .save(
            UploadFolder::ProfilePicture,
            "profile",
            &file.file_name,
            &file.bytes,
            &[MediaKind::Image],
        )
        .await
    {
        Ok(stored) => stored,
        Err(e) => return ActionResponse::failed_message(e.to_string()).into_response(),
    };

    match state
        .users()
        .set_profile_picture(user.user_id, &stored.relative_path)
        .await
    {
        Ok(previous) => {
            if let Some(old) = previous {
                state.uploads.remove(&old).await;
            }
            Json(PictureResponse {
                success: true,
                profile_picture_url: public_url(&stored.relative_path),
            })
            .into_response()
        }
        Err(e) => {
            state.uploads.remove(&stored.relative_path).await;
            to_failure(e).into_response()
        }
    }
}
