use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::{sync::mpsc, time};
use tracing::{debug, error, info};

use crate::auth::jwt::validate_token;
use crate::realtime::{user_channel, EventBus};
use crate::state::AppState;

const HEARTBEAT_SECONDS: u64 = 30;

/// Query parameters for WebSocket connections
#[derive(Debug, Deserialize)]
pub struct WebSocketParams {
    token: Option<String>,
}

/// Handle an invalid socket connection (authentication failure)
async fn handle_invalid_socket(mut socket: WebSocket, error_message: String) {
    let payload = serde_json::json!({ "error": error_message }).to_string();
    if let Err(e) = socket.send(Message::Text(payload)).await {
        error!("Error sending error message on WS: {}", e);
    }

    let _ = socket.close().await;
}

/// Forward the user's event channel to the socket until either side goes away
async fn handle_valid_connection(socket: WebSocket, user_id: i64, bus: Option<EventBus>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(100);

    let subscription_task = bus.map(|bus| {
        let tx_events = tx.clone();
        tokio::spawn(async move {
            subscribe_to_user_events(user_id, bus, tx_events).await;
        })
    });

    let forward_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                error!("Error forwarding message to WebSocket: {}", e);
                break;
            }
        }
    });

    let tx_heartbeat = tx.clone();
    let heartbeat_task = tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(HEARTBEAT_SECONDS));
        loop {
            interval.tick().await;
            if tx_heartbeat.send(Message::Ping(vec![])).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                info!("WebSocket closed by user {}", user_id);
                break;
            }
            Ok(Message::Pong(_)) => {
                debug!("Received pong from user {}", user_id);
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    if let Some(task) = subscription_task {
        task.abort();
    }
    forward_task.abort();
    heartbeat_task.abort();

    info!("WebSocket connection closed for user: {}", user_id);
}

/// Upgrade to the push channel. Without a configured bus the socket stays
/// open with heartbeats only and clients keep polling.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WebSocketParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let token = params.token.unwrap_or_default();

    let user_id = match validate_token(&token).map(|claims| claims.user_id()) {
        Ok(Some(user_id)) => user_id,
        Ok(None) => {
            return ws.on_upgrade(move |socket| async move {
                handle_invalid_socket(socket, "Invalid user ID in token".to_string()).await;
            });
        }
        Err(e) => {
            let error_message = format!("Invalid token: {}", e);
            return ws.on_upgrade(move |socket| async move {
                handle_invalid_socket(socket, error_message).await;
            });
        }
    };

    info!("User {} connected to events WebSocket", user_id);
    let bus = state.bus.clone();
    ws.on_upgrade(move |socket| async move {
        handle_valid_connection(socket, user_id, bus).await;
    })
}

async fn subscribe_to_user_events(user_id: i64, bus: EventBus, tx: mpsc::Sender<Message>) {
    let channel_name = user_channel(user_id);

    let mut pubsub = match bus.client().get_async_pubsub().await {
        Ok(pubsub) => pubsub,
        Err(e) => {
            error!("Failed to get Redis PubSub connection: {}", e);
            return;
        }
    };

    if let Err(e) = pubsub.subscribe(&channel_name).await {
        error!("Failed to subscribe to Redis channel {}: {}", channel_name, e);
        return;
    }
    info!("Subscribed to Redis channel: {}", channel_name);

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to get message payload: {}", e);
                continue;
            }
        };

        if tx.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }
}
