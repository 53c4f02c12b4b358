//! WebSocket connection handler

use crate::api::server::{AppState, StatusSnapshot};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// WebSocket message from server to client
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsServerMessage {
    #[serde(rename = "connected")]
    Connected { message: String },
    #[serde(rename = "status")]
    Status(Box<StatusSnapshot>),
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Push the current status, then every update, until the client leaves
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    info!("WebSocket client connected");

    // Subscribe before reading the current status so no round is missed
    let mut status_rx = state.subscribe();

    let connected = WsServerMessage::Connected {
        message: "Connected to dice predictor".to_string(),
    };
    let current = WsServerMessage::Status(Box::new(state.status().await));
    for msg in [connected, current] {
        if let Ok(json) = serde_json::to_string(&msg) {
            if sender.send(Message::Text(json)).await.is_err() {
                return;
            }
        }
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            match status_rx.recv().await {
                Ok(status) => {
                    let msg = WsServerMessage::Status(Box::new(status));
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(json)).await.is_err() {
                            debug!("WebSocket send failed, client disconnected");
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Next snapshot carries the full state anyway
                    debug!("WebSocket client lagged by {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Clients only listen; drain until close
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    info!("WebSocket client sent close");
                    break;
                }
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Whichever side ends first takes the other down with it
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("WebSocket client disconnected");
}
