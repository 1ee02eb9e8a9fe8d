mod admin;
mod api_doc;
mod auth;
mod chat;
mod comment;
mod config;
mod db;
mod flash;
mod notification;
mod pages;
mod post;
mod realtime;
mod recipe;
mod render;
mod response;
mod routes;
mod schema_ext;
mod state;
mod uploads;
mod user;
mod websocket;

use axum::Router;
use dotenv::dotenv;
use redis::Client;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::chat::service::ChatService;
use crate::chat::store::PgChatStore;
use crate::config::AppConfig;
use crate::realtime::EventBus;
use crate::state::AppState;
use crate::uploads::UploadStore;

const PORT_ATTEMPTS: u16 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    dotenv().ok();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    if !db::check_db_initialized(&pool).await {
        db::init_db(&pool).await?;
    }

    // Without Redis, pages fall back to polling
    let bus = match &config.redis_url {
        Some(url) => match Client::open(url.as_str()) {
            Ok(client) => {
                info!("Publishing realtime events through Redis at {}", url);
                Some(EventBus::new(client))
            }
            Err(e) => {
                error!("Failed to open Redis client: {}", e);
                None
            }
        },
        None => {
            info!("No Redis URL configured, realtime push disabled");
            None
        }
    };

    let uploads = UploadStore::new(config.upload_dir.clone());
    let served_uploads = ServeDir::new(uploads.root());
    let chat = Arc::new(ChatService::new(
        Arc::new(PgChatStore::new(pool.clone())),
        bus.clone(),
    ));
    let state = AppState::new(pool, bus, uploads, chat);

    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::routes(state.clone()))
        .merge(routes::auth::routes(state.clone()))
        .merge(routes::pages::routes(state.clone()))
        .merge(routes::recipes::routes(state.clone()))
        .merge(routes::posts::routes(state.clone()))
        .merge(routes::chat::routes(state.clone()))
        .merge(routes::notifications::routes(state.clone()))
        .merge(routes::users::routes(state.clone()))
        .merge(routes::admin::routes(state))
        .nest_service("/uploads", served_uploads)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let host: std::net::IpAddr = config.host.parse()?;
    let mut port = config.port;
    for attempt in 1..=PORT_ATTEMPTS {
        let addr = SocketAddr::new(host, port);
        match axum::Server::try_bind(&addr) {
            Ok(server) => {
                info!("Flavor Forge listening on http://{}", addr);
                info!("API documentation at http://{}/docs", addr);
                return server
                    .serve(app.into_make_service())
                    .await
                    .map_err(|e| e.into());
            }
            Err(e) => {
                warn!("Could not bind {}: {}", addr, e);
                if attempt == PORT_ATTEMPTS {
                    break;
                }
                port += 1;
            }
        }
    }

    Err("Failed to bind to any port".into())
}
