use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Security scheme configuration for OpenAPI
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        // Pages authenticate through the `forge_token` cookie; the API also takes a bearer header
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// API documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flavor Forge API",
        version = "0.1.0",
        description = "JSON endpoints behind the Flavor Forge recipe, feed and chat pages"
    ),
    paths(
        // Health
        crate::routes::health::health_check,
        crate::routes::health::protected_health_check,
        // Authentication
        crate::auth::controller::login,
        crate::auth::controller::register,
        // Recipes
        crate::recipe::controller::get_recipe,
        crate::recipe::controller::list_recipes,
        crate::recipe::controller::create_recipe,
        crate::recipe::controller::update_recipe,
        crate::recipe::controller::delete_recipe,
        crate::recipe::controller::upload_recipe_image,
        // Feed
        crate::post::controller::get_feed,
        crate::post::controller::create_post,
        crate::post::controller::toggle_like,
        crate::post::controller::delete_post,
        crate::comment::controller::list_comments,
        crate::comment::controller::add_comment,
        // Chat
        crate::chat::controller::chat_action,
        crate::chat::controller::unread_count,
        crate::chat::controller::conversations,
        // Notifications
        crate::notification::controller::check_notifications,
        crate::notification::controller::mark_notification_read,
        crate::notification::controller::mark_all_notifications_read,
        crate::notification::controller::send_notification,
        // Users
        crate::user::controller::list_users,
        crate::user::controller::get_profile,
        crate::user::controller::update_profile,
        crate::user::controller::upload_picture,
        // Admin
        crate::admin::controller::get_stats,
        crate::admin::controller::list_users,
        crate::admin::controller::update_user,
        crate::admin::controller::delete_user
    ),
    components(
        schemas(
            // Shared
            crate::response::ActionResponse,
            crate::routes::health::HealthResponse,
            crate::schema_ext::DateTimeWrapper,
            // Auth
            crate::auth::controller::RegisterRequest,
            crate::auth::controller::LoginRequest,
            crate::auth::controller::AuthResponse,
            crate::auth::controller::ErrorResponse,
            // Recipes
            crate::recipe::controller::GetRecipeResponse,
            crate::recipe::controller::RecipeListResponse,
            crate::recipe::controller::RecipePayload,
            crate::recipe::controller::SavedRecipeResponse,
            crate::recipe::controller::RecipeImageResponse,
            crate::recipe::model::Ingredient,
            crate::recipe::model::Recipe,
            crate::recipe::model::RecipeCard,
            crate::recipe::model::RecipeDetail,
            crate::recipe::model::RecipeRequest,
            crate::recipe::query::Difficulty,
            crate::recipe::query::Pagination,
            // Feed
            crate::post::controller::FeedResponse,
            crate::post::controller::CreatedPostResponse,
            crate::post::controller::LikeResponse,
            crate::post::model::Post,
            crate::post::model::FeedPost,
            crate::post::model::LikeOutcome,
            crate::comment::controller::CommentsResponse,
            crate::comment::controller::CommentAddedResponse,
            crate::comment::model::Comment,
            crate::comment::model::CommentView,
            crate::comment::model::CreateCommentRequest,
            // Chat
            crate::chat::controller::ChatForm,
            crate::chat::controller::MessagesResponse,
            crate::chat::controller::UnreadResponse,
            crate::chat::controller::ConversationsResponse,
            crate::chat::model::MessageView,
            crate::chat::model::ConversationSummary,
            // Notifications
            crate::notification::controller::CheckNotificationsResponse,
            crate::notification::controller::BroadcastResponse,
            crate::notification::model::NotificationType,
            crate::notification::model::NotificationView,
            // Users
            crate::user::controller::UsersResponse,
            crate::user::controller::ProfileView,
            crate::user::controller::ProfileResponse,
            crate::user::controller::PictureResponse,
            crate::user::model::PublicUser,
            crate::user::model::UpdateProfileRequest,
            // Admin
            crate::admin::controller::StatsResponse,
            crate::admin::controller::ManagedUsersResponse,
            crate::admin::model::DashboardStats,
            crate::admin::model::DifficultyCount,
            crate::admin::model::ManagedUser,
            crate::admin::model::UpdateUserRequest
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "authentication", description = "Registration and login"),
        (name = "recipes", description = "Recipe listing, detail and management"),
        (name = "posts", description = "Social feed posts and likes"),
        (name = "comments", description = "Post comments"),
        (name = "chat", description = "Direct messages"),
        (name = "notifications", description = "Notification polling and broadcast"),
        (name = "users", description = "Directory and profile"),
        (name = "admin", description = "Administration")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;
