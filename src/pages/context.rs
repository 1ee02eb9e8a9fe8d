use axum::{
    headers::Cookie,
    http::header::SET_COOKIE,
    response::{Html, IntoResponse, Response},
};
use tracing::warn;

use crate::auth::middleware::AuthUser;
use crate::flash;
use crate::render::layout::{self, NavUser, PageContext};
use crate::state::AppState;

/// Navigation data for the viewer plus any pending flash. Lookup failures
/// degrade to an anonymous or zero-badge nav rather than failing the page.
pub async fn build(state: &AppState, user: Option<AuthUser>, cookies: Option<&Cookie>) -> PageContext {
    let flash = flash::peek(cookies);

    let Some(user) = user else {
        return PageContext { viewer: None, flash };
    };

    let record = match state.users().find_by_id(user.user_id).await {
        Ok(record) => record,
        Err(e) => {
            warn!("Page context without viewer {}: {}", user.user_id, e);
            return PageContext { viewer: None, flash };
        }
    };

    let unread_notifications = state
        .notifications()
        .unread_count(user.user_id)
        .await
        .unwrap_or_else(|e| {
            warn!("Unread notification count failed: {}", e);
            0
        });
    let unread_messages = state
        .chat
        .unread_count(user.user_id, None)
        .await
        .unwrap_or_else(|e| {
            warn!("Unread message count failed: {}", e);
            0
        });

    let is_admin = record.is_admin();
    PageContext {
        viewer: Some(NavUser {
            name: record.name,
            initials: record.initials,
            avatar_color: record.avatar_color,
            profile_picture: record.profile_picture,
            is_admin,
            unread_notifications,
            unread_messages,
        }),
        flash,
    }
}

/// Wrap a body in the layout; a shown flash is consumed
pub fn respond(state: &AppState, title: &str, ctx: &PageContext, body: &str) -> Response {
    let html = Html(layout::page(title, ctx, &state.uploads, body));
    if ctx.flash.is_some() {
        ([(SET_COOKIE, flash::clear_cookie())], html).into_response()
    } else {
        html.into_response()
    }
}
