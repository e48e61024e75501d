//! WebSocket transport.
//!
//! Each connection gets a [`Client`] handed to the Universe. Frames are decoded
//! into protocol messages and queued on the client's inbound channel; messages
//! queued on its outbound channel are written back as binary frames.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as Frame, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use delver_shared::{decode, encode, Message};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Notify};

use crate::session::{Client, ClientId};

const INBOUND_BUFFER: usize = 64;
const OUTBOUND_BUFFER: usize = 256;

/// Shared state for WebSocket handlers.
pub struct WsState {
    /// New clients for the Universe.
    pub new_clients: mpsc::Sender<Client>,
    /// Wakes the Universe when a lobby client has input.
    pub check: Arc<Notify>,
    next_id: AtomicU64,
}

impl WsState {
    pub fn new(new_clients: mpsc::Sender<Client>, check: Arc<Notify>) -> Self {
        Self {
            new_clients,
            check,
            next_id: AtomicU64::new(1),
        }
    }
}

/// WebSocket upgrade handler - entry point for new connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let client_id = ClientId(state.next_id.fetch_add(1, Ordering::Relaxed));

    let (inbound, inbound_rx) = mpsc::channel::<Message>(INBOUND_BUFFER);
    let (outbound, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);

    if state
        .new_clients
        .send(Client::new(client_id, inbound_rx, outbound))
        .await
        .is_err()
    {
        tracing::warn!(client = %client_id, "Universe is gone, refusing connection");
        return;
    }
    tracing::info!(client = %client_id, "WebSocket connection established");

    let send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let bytes = match encode(&message) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(client = %client_id, kind = message.kind(), error = %e, "Failed to encode message");
                    continue;
                }
            };
            if ws_sender.send(Frame::Binary(bytes.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        let bytes = match result {
            Ok(Frame::Binary(bytes)) => bytes.to_vec(),
            Ok(Frame::Text(text)) => text.as_str().as_bytes().to_vec(),
            Ok(Frame::Close(_)) => {
                tracing::info!(client = %client_id, "WebSocket closed by client");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::error!(client = %client_id, error = %e, "WebSocket error");
                break;
            }
        };

        match decode(&bytes) {
            Ok(message) => {
                tracing::trace!(client = %client_id, kind = message.kind(), "Received message");
                if inbound.send(message).await.is_err() {
                    break;
                }
                state.check.notify_one();
            }
            Err(e) => {
                tracing::warn!(client = %client_id, error = %e, "Undecodable frame, closing connection");
                break;
            }
        }
    }

    // Whoever owns the client sees the closed queue on its next drain.
    drop(inbound);
    state.check.notify_one();
    send_task.abort();

    tracing::info!(client = %client_id, "WebSocket connection terminated");
}
