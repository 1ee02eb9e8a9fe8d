use axum::{
    extract::{Json, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use super::middleware::{AuthUser, TOKEN_COOKIE};
use super::service::{self, AuthError, AuthResult, LoginData, RegisterData};
use crate::flash::{self, Flash};
use crate::state::AppState;

const TOKEN_MAX_AGE_SECS: i64 = 24 * 60 * 60;

// Request DTOs
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Fields posted by the HTML sign-up form
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// Response DTOs
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub role: String,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

fn to_response(result: AuthResult) -> AuthResponse {
    AuthResponse {
        user_id: result.user_id,
        username: result.username,
        name: result.name,
        role: result.role.as_str().to_string(),
        token: result.token,
    }
}

fn handle_error(error: AuthError) -> Response {
    let status = error.status_code();
    let message = error.message();

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Internal server error: {}", error);
    } else {
        info!("Auth error: {} ({})", message, status);
    }

    (status, Json(ErrorResponse { error: message })).into_response()
}

fn token_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, token, TOKEN_MAX_AGE_SECS
    )
}

fn clear_token_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", TOKEN_COOKIE)
}

/// Signed-in browser session: cookie set, straight to the recipes grid
fn signed_in(result: &AuthResult, message: String) -> Response {
    let mut response = flash::redirect_with("/recipes", Flash::success(message));
    if let Ok(value) = token_cookie(&result.token).parse() {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse)
    ),
    tag = "authentication"
)]
pub async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> Response {
    info!("Registration request received for email: {}", req.email);

    let data = RegisterData {
        username: req.username,
        email: req.email,
        name: req.name,
        password: req.password,
    };

    match service::register(&state.pool, data).await {
        Ok(result) => {
            let response = to_response(result);
            info!("User registered successfully: {}", response.user_id);
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(error) => handle_error(error),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "authentication"
)]
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    info!("Login request received for email: {}", req.email);

    let data = LoginData {
        email: req.email,
        password: req.password,
    };

    match service::login(&state.pool, data).await {
        Ok(result) => {
            let response = to_response(result);
            info!("User login successful: {}", response.user_id);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => handle_error(error),
    }
}

/// `POST /login` from the HTML form
pub async fn login_form(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let data = LoginData {
        email: form.email,
        password: form.password,
    };

    match service::login(&state.pool, data).await {
        Ok(result) => {
            let message = format!("Welcome back, {}!", result.name);
            signed_in(&result, message)
        }
        Err(e) => {
            if e.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
                error!("Login failed: {}", e);
            }
            flash::redirect_with("/login", Flash::error(e.message()))
        }
    }
}

/// `POST /register` from the HTML form
pub async fn register_form(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.confirm_password {
        return flash::redirect_with("/register", Flash::error("Passwords do not match"));
    }

    let data = RegisterData {
        username: form.username,
        email: form.email,
        name: form.name,
        password: form.password,
    };

    match service::register(&state.pool, data).await {
        Ok(result) => {
            let message = format!("Welcome to Flavor Forge, {}!", result.name);
            signed_in(&result, message)
        }
        Err(e) => {
            if e.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
                error!("Registration failed: {}", e);
            }
            flash::redirect_with("/register", Flash::error(e.message()))
        }
    }
}

/// `POST /logout`; an expired session still gets its cookie cleared
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<Option<AuthUser>>,
) -> Response {
    if let Some(user) = user {
        if let Err(e) = service::logout(&state.pool, user.user_id).await {
            error!("Failed to mark user {} offline: {}", user.user_id, e);
        }
    }

    ([(SET_COOKIE, clear_token_cookie())], Redirect::to("/login")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::store::memory::MemoryChatStore;
    use crate::routes;
    use crate::state::test_support::lazy_state;
    use axum::{body::Body, http::Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[test]
    fn test_token_cookie_attributes() {
        let cookie = token_cookie("abc");
        assert!(cookie.starts_with("forge_token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(clear_token_cookie().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_register_form_rejects_mismatched_passwords() {
        let app = routes::auth::routes(lazy_state(Arc::new(MemoryChatStore::default())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "username=ana&email=ana%40forge.test&name=Ana&password=secret1&confirm_password=secret2",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/register");
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("forge_flash=error=Passwords+do+not+match"));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie_without_session() {
        let app = routes::auth::routes(lazy_state(Arc::new(MemoryChatStore::default())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
        assert!(response.headers()[SET_COOKIE]
            .to_str()
            .unwrap()
            .starts_with("forge_token=;"));
    }
}
