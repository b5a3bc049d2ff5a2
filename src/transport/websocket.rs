//! Production transport: one WebSocket per connection, upgraded via axum.
//!
//! Each accepted connection gets an `mpsc` channel bridging router emits to
//! a dedicated writer task, a split-sink/split-stream shape. `force_close`
//! aborts the writer and reader tasks for that connection.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::warn;

use super::{Transport, TransportError};
use crate::events::ServerEvent;
use crate::model::ConnectionId;

struct ConnectionHandle {
    sender: mpsc::Sender<ServerEvent>,
    abort_handles: Vec<AbortHandle>,
}

/// WebSocket-backed transport shared across all live connections.
pub struct WebSocketTransport {
    connections: DashMap<ConnectionId, ConnectionHandle>,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connections: DashMap::new(),
        })
    }

    /// Register a freshly-upgraded socket's outbound channel and the task
    /// handles that must be aborted on forced close.
    pub fn register(
        &self,
        conn_id: ConnectionId,
        sender: mpsc::Sender<ServerEvent>,
        abort_handles: Vec<AbortHandle>,
    ) {
        self.connections.insert(
            conn_id,
            ConnectionHandle {
                sender,
                abort_handles,
            },
        );
    }

    /// Drop bookkeeping for a connection that closed on its own (client hang
    /// up, read error). Distinct from `force_close`, which also aborts tasks.
    pub fn deregister(&self, conn_id: ConnectionId) {
        self.connections.remove(&conn_id);
    }

    /// Every live connection id, used by `emit_to_room`/`broadcast` callers
    /// that only hold a room's membership set of ids.
    #[must_use]
    pub fn live_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|e| *e.key()).collect()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn emit(&self, conn_id: ConnectionId, event: ServerEvent) -> Result<(), TransportError> {
        let sender = self
            .connections
            .get(&conn_id)
            .map(|h| h.sender.clone())
            .ok_or(TransportError::NotFound(conn_id))?;

        sender.send(event).await.map_err(|e| {
            warn!(conn_id = %conn_id, error = %e, "failed to queue event for connection");
            TransportError::Closed
        })
    }

    async fn force_close(&self, conn_id: ConnectionId) {
        if let Some((_, handle)) = self.connections.remove(&conn_id) {
            for abort in handle.abort_handles {
                abort.abort();
            }
        }
    }

    fn is_connected(&self, conn_id: ConnectionId) -> bool {
        self.connections.contains_key(&conn_id)
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }
}
