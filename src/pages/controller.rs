use axum::{
    extract::{Path, Query, State},
    headers::Cookie,
    response::{IntoResponse, Redirect, Response},
    Extension, TypedHeader,
};
use tracing::error;

use super::context::{build, respond};
use crate::auth::middleware::AuthUser;
use crate::chat::model::MessageView;
use crate::flash::{self, Flash};
use crate::post::model::FeedParams;
use crate::recipe::model::RecipeError;
use crate::recipe::query::{RecipeFilter, RecipeListParams};
use crate::render;
use crate::state::AppState;
use crate::user::model::{PublicUser, UserError};

type Cookies = Option<TypedHeader<Cookie>>;

fn cookie_ref(cookies: &Cookies) -> Option<&Cookie> {
    cookies.as_ref().map(|TypedHeader(c)| c)
}

fn load_failed(what: &str, e: impl std::fmt::Display) -> String {
    error!("Failed to load {}: {}", what, e);
    format!(
        r#"<div class="card empty-state">Could not load {}. Please try again.</div>"#,
        what
    )
}

pub async fn home() -> Redirect {
    Redirect::to("/recipes")
}

pub async fn recipes_page(
    State(state): State<AppState>,
    Extension(user): Extension<Option<AuthUser>>,
    cookies: Cookies,
    Query(params): Query<RecipeListParams>,
) -> Response {
    let ctx = build(&state, user, cookie_ref(&cookies)).await;
    let filter = RecipeFilter::from_params(&params);

    let body = match state.recipes().list(&filter, params.requested_page()).await {
        Ok(page) => render::recipes::listing(&state.uploads, &filter, &page, user.is_some()),
        Err(e) => load_failed("recipes", e),
    };
    respond(&state, "Recipes", &ctx, &body)
}

pub async fn recipe_page(
    State(state): State<AppState>,
    Extension(user): Extension<Option<AuthUser>>,
    cookies: Cookies,
    Path(recipe_id): Path<i64>,
) -> Response {
    let detail = match state.recipes().get(recipe_id).await {
        Ok(detail) => detail,
        Err(RecipeError::NotFound) => {
            return flash::redirect_with("/recipes", Flash::error("Recipe not found"))
        }
        Err(e) => {
            error!("Failed to load recipe {}: {}", recipe_id, e);
            return flash::redirect_with("/recipes", Flash::error("Could not load recipe"));
        }
    };

    let ctx = build(&state, user, cookie_ref(&cookies)).await;
    let can_modify = user.map_or(false, |u| u.can_modify(detail.recipe.created_by));
    let body = render::recipes::detail(&state.uploads, &detail, can_modify);
    respond(&state, &detail.recipe.title, &ctx, &body)
}

/// Form post from the detail page
pub async fn delete_recipe_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i64>,
) -> Response {
    match state.recipes().delete(&user, recipe_id).await {
        Ok(orphaned) => {
            if let Some(path) = orphaned {
                state.uploads.remove(&path).await;
            }
            flash::redirect_with("/recipes", Flash::success("Recipe deleted successfully"))
        }
        Err(RecipeError::NotFound) => {
            flash::redirect_with("/recipes", Flash::error("Recipe not found"))
        }
        Err(RecipeError::Forbidden) => flash::redirect_with(
            &format!("/recipes/{}", recipe_id),
            Flash::error("You can only delete your own recipes"),
        ),
        Err(e) => {
            error!("Failed to delete recipe {}: {}", recipe_id, e);
            flash::redirect_with(
                &format!("/recipes/{}", recipe_id),
                Flash::error("Could not delete recipe"),
            )
        }
    }
}

pub async fn feed_page(
    State(state): State<AppState>,
    Extension(user): Extension<Option<AuthUser>>,
    cookies: Cookies,
    Query(params): Query<FeedParams>,
) -> Response {
    let ctx = build(&state, user, cookie_ref(&cookies)).await;
    let page = params.page();
    let viewer_id = user.map(|u| u.user_id);

    let body = match state.posts().feed(viewer_id, page).await {
        Ok(posts) => render::social::feed(
            &state.uploads,
            &posts,
            page,
            viewer_id,
            user.map_or(false, |u| u.is_admin()),
        ),
        Err(e) => load_failed("the feed", e),
    };
    respond(&state, "Feed", &ctx, &body)
}

pub async fn chat_page(user: AuthUser, State(state): State<AppState>, cookies: Cookies) -> Response {
    let ctx = build(&state, Some(user), cookie_ref(&cookies)).await;

    let conversations = state.chat.conversations(user.user_id).await;
    let people = state.users().list_others(user.user_id).await;

    let body = match (conversations, people) {
        (Ok(conversations), Ok(people)) => {
            render::chat::inbox(&state.uploads, &conversations, &people)
        }
        (Err(e), _) => load_failed("conversations", e),
        (_, Err(e)) => load_failed("users", e),
    };
    respond(&state, "Messages", &ctx, &body)
}

pub async fn conversation_page(
    user: AuthUser,
    State(state): State<AppState>,
    cookies: Cookies,
    Path(counterpart_id): Path<i64>,
) -> Response {
    if counterpart_id == user.user_id {
        return Redirect::to("/chat").into_response();
    }

    let counterpart = match state.users().find_by_id(counterpart_id).await {
        Ok(found) => found,
        Err(UserError::NotFound) => {
            return flash::redirect_with("/chat", Flash::error("User not found"))
        }
        Err(e) => {
            error!("Failed to load chat partner {}: {}", counterpart_id, e);
            return flash::redirect_with("/chat", Flash::error("Could not open conversation"));
        }
    };

    let history = match state.chat.fetch(user.user_id, counterpart_id, 0).await {
        Ok(messages) => messages.iter().map(MessageView::from).collect::<Vec<_>>(),
        Err(e) => {
            error!("Failed to load chat history: {}", e);
            Vec::new()
        }
    };

    // opening the thread reads it; the nav badge below reflects that
    if let Err(e) = state.chat.mark_read(user.user_id, counterpart_id).await {
        error!("Failed to mark chat read: {}", e);
    }

    let ctx = build(&state, Some(user), cookie_ref(&cookies)).await;
    let partner = PublicUser::from(&counterpart);
    let body = render::chat::conversation(&state.uploads, user.user_id, &partner, &history);
    respond(&state, &counterpart.name, &ctx, &body)
}

pub async fn notifications_page(
    user: AuthUser,
    State(state): State<AppState>,
    cookies: Cookies,
) -> Response {
    let ctx = build(&state, Some(user), cookie_ref(&cookies)).await;
    let body = match state.notifications().list(user.user_id).await {
        Ok(items) => render::social::notifications(&items),
        Err(e) => load_failed("notifications", e),
    };
    respond(&state, "Notifications", &ctx, &body)
}

pub async fn admin_page(user: AuthUser, State(state): State<AppState>, cookies: Cookies) -> Response {
    if !user.is_admin() {
        return flash::redirect_with("/recipes", Flash::error("Access denied"));
    }

    let ctx = build(&state, Some(user), cookie_ref(&cookies)).await;
    let admin = state.admin();
    let body = match (admin.stats().await, admin.list_users().await) {
        (Ok(stats), Ok(users)) => render::admin::dashboard(&stats, &users, user.user_id),
        (Err(e), _) | (_, Err(e)) => load_failed("the dashboard", e),
    };
    respond(&state, "Admin", &ctx, &body)
}

pub async fn profile_page(user: AuthUser, State(state): State<AppState>, cookies: Cookies) -> Response {
    let ctx = build(&state, Some(user), cookie_ref(&cookies)).await;
    let body = match state.users().find_by_id(user.user_id).await {
        Ok(record) => render::users::profile(&state.uploads, &record),
        Err(e) => load_failed("your profile", e),
    };
    respond(&state, "Profile", &ctx, &body)
}

pub async fn login_page(
    State(state): State<AppState>,
    Extension(user): Extension<Option<AuthUser>>,
    cookies: Cookies,
) -> Response {
    if user.is_some() {
        return Redirect::to("/recipes").into_response();
    }
    let ctx = build(&state, None, cookie_ref(&cookies)).await;
    respond(&state, "Log in", &ctx, &render::users::login_form())
}

pub async fn register_page(
    State(state): State<AppState>,
    Extension(user): Extension<Option<AuthUser>>,
    cookies: Cookies,
) -> Response {
    if user.is_some() {
        return Redirect::to("/recipes").into_response();
    }
    let ctx = build(&state, None, cookie_ref(&cookies)).await;
    respond(&state, "Sign up", &ctx, &render::users::register_form())
}

#[cfg(test)]
mod tests {
    use crate::auth::jwt::{generate_token, Role};
    use crate::chat::store::memory::MemoryChatStore;
    use crate::routes;
    use crate::state::test_support::lazy_state;
    use axum::{
        body::Body,
        http::{header::SET_COOKIE, Request, StatusCode},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        routes::pages::routes(lazy_state(Arc::new(MemoryChatStore::default())))
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_root_redirects_to_recipes() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/recipes");
    }

    #[tokio::test]
    async fn test_private_pages_redirect_anonymous_to_login() {
        for uri in ["/chat", "/chat/2", "/notifications", "/admin", "/profile"] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(response.headers()["location"], "/login", "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_login_page_shows_and_consumes_flash() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/login")
                    .header("Cookie", "forge_flash=error=Invalid+email+or+password")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cleared = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
        assert!(cleared.starts_with("forge_flash=;"));

        let html = body_string(response).await;
        assert!(html.contains(r#"<div class="flash error">Invalid email or password</div>"#));
        assert!(html.contains(r#"action="/login""#));
    }

    #[tokio::test]
    async fn test_non_admin_bounced_from_dashboard() {
        std::env::set_var("JWT_SECRET", "test_secret");
        let token = generate_token(3, Role::User).unwrap();

        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .header("Cookie", format!("forge_token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/recipes");
    }

    #[tokio::test]
    async fn test_signed_in_visitor_skips_login_form() {
        std::env::set_var("JWT_SECRET", "test_secret");
        let token = generate_token(3, Role::User).unwrap();

        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/register")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/recipes");
    }
}
