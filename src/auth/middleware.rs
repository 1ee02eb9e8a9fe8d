use axum::{
    async_trait,
    extract::FromRequestParts,
    headers::{authorization::Bearer, Authorization, Cookie},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Redirect, Response},
    RequestPartsExt, TypedHeader,
};
use serde::Serialize;
use tracing::{debug, error, info};

use super::jwt::{validate_token, Role};

/// Cookie carrying the token for browser page requests
pub const TOKEN_COOKIE: &str = "forge_token";

/// Authenticated user information, injected per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and admins may modify a resource
    pub fn can_modify(&self, owner_id: i64) -> bool {
        self.user_id == owner_id || self.is_admin()
    }
}

#[derive(Debug, Serialize)]
struct AuthErrorResponse {
    success: bool,
    error: String,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthErrorResponse {
            success: false,
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Pull the raw token from the Authorization header, falling back to the cookie
async fn extract_token(parts: &mut Parts) -> Option<String> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        parts.extract::<TypedHeader<Authorization<Bearer>>>().await
    {
        return Some(bearer.token().to_string());
    }

    match parts.extract::<TypedHeader<Cookie>>().await {
        Ok(TypedHeader(cookie)) => cookie.get(TOKEN_COOKIE).map(str::to_string),
        Err(_) => None,
    }
}

async fn resolve_user(parts: &mut Parts) -> Result<AuthUser, &'static str> {
    let token = extract_token(parts)
        .await
        .ok_or("Missing credentials. Please provide a Bearer token or log in")?;

    let claims = validate_token(&token).map_err(|e| {
        error!("Token validation failed: {}", e);
        "Invalid token. Please login again"
    })?;

    let user_id = claims.user_id().ok_or("Invalid user identifier in token")?;

    Ok(AuthUser {
        user_id,
        role: claims.role,
    })
}

/// Authentication middleware for JSON routes
pub async fn auth_middleware<B>(req: Request<B>, next: Next<B>) -> Result<Response, Response> {
    let (mut parts, body) = req.into_parts();

    let auth_user = resolve_user(&mut parts).await.map_err(unauthorized)?;
    debug!(
        "User authenticated: {} with role {:?}",
        auth_user.user_id, auth_user.role
    );

    parts.extensions.insert(auth_user);

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

/// Authentication middleware for HTML pages, redirects anonymous visitors to the login form
pub async fn page_auth_middleware<B>(req: Request<B>, next: Next<B>) -> Response {
    let (mut parts, body) = req.into_parts();

    match resolve_user(&mut parts).await {
        Ok(auth_user) => {
            parts.extensions.insert(auth_user);
            let req = Request::from_parts(parts, body);
            next.run(req).await
        }
        Err(reason) => {
            info!("Redirecting anonymous page request: {}", reason);
            Redirect::to("/login").into_response()
        }
    }
}

/// Role-based authorization middleware
pub async fn require_role<B>(
    role: Role,
    req: Request<B>,
    next: Next<B>,
) -> Result<Response, Response> {
    let auth_user = match req.extensions().get::<AuthUser>() {
        Some(user) => *user,
        None => {
            error!("AuthUser not found in request extensions");
            return Err(unauthorized("Authentication required"));
        }
    };

    match auth_user.role {
        Role::Admin => {
            info!("Admin access granted to user: {}", auth_user.user_id);
        }
        r if r == role => {}
        _ => {
            error!(
                "Insufficient permissions for user: {} with role {:?}, required role: {:?}",
                auth_user.user_id, auth_user.role, role
            );
            return Err((
                StatusCode::FORBIDDEN,
                Json(AuthErrorResponse {
                    success: false,
                    error: format!("Insufficient permissions. Required role: {}", role.as_str()),
                }),
            )
                .into_response());
        }
    }

    Ok(next.run(req).await)
}

pub async fn admin_middleware<B>(req: Request<B>, next: Next<B>) -> Result<Response, Response> {
    require_role(Role::Admin, req, next).await
}

/// Extractor for authenticated user
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| unauthorized("Authentication required"))
    }
}

/// Optional authentication middleware for public routes that need auth info
pub async fn optional_auth_middleware<B>(req: Request<B>, next: Next<B>) -> Response {
    let (mut parts, body) = req.into_parts();

    let auth_user = resolve_user(&mut parts).await.ok();
    parts.extensions.insert(auth_user);

    let req = Request::from_parts(parts, body);
    next.run(req).await
}
