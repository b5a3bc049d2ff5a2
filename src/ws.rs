//! Transport Adapter: the axum WebSocket upgrade entrypoint.
//!
//! Split-sink/split-stream: a dedicated writer task draining an `mpsc`
//! channel, a reader loop dispatching deserialized events, wired to this
//! engine's connection lifecycle (connection-confirmed, adaptive health
//! ping, router dispatch, eviction on close).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::events::{ClientEvent, ServerEvent, SERVER_VERSION};
use crate::model::ConnectionId;
use crate::router;
use crate::transport::WebSocketTransport;

/// Axum router state: the engine plus the concrete WebSocket transport,
/// kept alongside it (rather than behind `Arc<dyn Transport>`) so the
/// upgrade handler can call transport-specific bookkeeping the `Transport`
/// trait itself has no reason to expose.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub transport: Arc<WebSocketTransport>,
}

pub async fn handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(state.engine.config.max_payload_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "participants": state.engine.connections.total_count(),
        "rooms": state.engine.rooms.room_count(),
    }))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let AppState { engine, transport } = state;
    let conn_id = ConnectionId::new();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(128);

    let writer_handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "failed to serialize outbound event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Owns `ws_receiver`, so aborting this task (via `force_close`) drops the
    // read half along with the writer task dropping the write half — both
    // halves of the split socket go away, not just the outbound channel.
    let max_payload_bytes = engine.config.max_payload_bytes;
    let reader_engine = engine.clone();
    let reader_handle = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if text.len() > max_payload_bytes {
                        debug!(conn_id = %conn_id, len = text.len(), "dropping oversized frame");
                        continue;
                    }
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => router::dispatch(&reader_engine, conn_id, event).await,
                        Err(e) => debug!(conn_id = %conn_id, error = %e, "dropping malformed event"),
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(conn_id = %conn_id, error = %e, "websocket read error");
                    break;
                }
            }
        }
    });

    let health_handle = engine.health.spawn_ping_loop(conn_id, engine.transport.clone(), &engine.config);
    transport.register(
        conn_id,
        tx.clone(),
        vec![writer_handle.abort_handle(), health_handle, reader_handle.abort_handle()],
    );

    let now = chrono::Utc::now().timestamp_millis();
    let _ = tx
        .send(ServerEvent::ConnectionConfirmed {
            socket_id: conn_id,
            timestamp: now,
            server_time: now,
            server_version: SERVER_VERSION.into(),
            features: vec!["breakout-rooms".into(), "polls".into(), "whiteboard".into()],
        })
        .await;

    info!(conn_id = %conn_id, "connection established");

    let _ = reader_handle.await;

    transport.deregister(conn_id);
    engine.health.remove(conn_id);
    router::evict(&engine, conn_id, "disconnect", false).await;
    info!(conn_id = %conn_id, "connection closed");
}
