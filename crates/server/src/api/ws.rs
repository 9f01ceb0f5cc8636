//! WebSocket relay of job progress.
//!
//! Each connection gets its own subscriber queue from the job manager. Every
//! [`ProgressUpdate`](mediagrab_core::ProgressUpdate) is written as one JSON
//! text frame; the subscriber is detached when the client goes away.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_SENT};
use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut subscriber = state.manager().subscribe();
    let subscriber_id = subscriber.id();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!(subscriber = subscriber_id, "WebSocket client connected");

    // Forward progress updates to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(update) = subscriber.recv().await {
            match serde_json::to_string(&update) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                    WS_MESSAGES_SENT.inc();
                }
                Err(e) => {
                    error!("Failed to serialize progress update: {}", e);
                }
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("WebSocket client requested close");
                    break;
                }
                Ok(Message::Text(text)) => {
                    // Clients are not expected to talk, just log it
                    debug!("Received text message: {}", text);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.manager().unsubscribe(subscriber_id);
    WS_CONNECTIONS_ACTIVE.dec();
    info!(subscriber = subscriber_id, "WebSocket client disconnected");
}
