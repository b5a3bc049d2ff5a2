//! In-process transport backed by `mpsc` channels.
//!
//! Lets unit and integration tests drive the Event Router without a real
//! socket.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use super::{Transport, TransportError};
use crate::events::ServerEvent;
use crate::model::ConnectionId;

/// A single simulated connection's outbound queue.
pub struct ChannelTransport {
    senders: DashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
    closed: DashMap<ConnectionId, ()>,
}

impl ChannelTransport {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            senders: DashMap::new(),
            closed: DashMap::new(),
        })
    }

    /// Register a new simulated connection, returning the receiver end a
    /// test can poll for events emitted to it.
    pub fn connect(&self, conn_id: ConnectionId) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(128);
        self.senders.insert(conn_id, tx);
        self.closed.remove(&conn_id);
        rx
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self {
            senders: DashMap::new(),
            closed: DashMap::new(),
        }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn emit(&self, conn_id: ConnectionId, event: ServerEvent) -> Result<(), TransportError> {
        if self.closed.contains_key(&conn_id) {
            return Err(TransportError::Closed);
        }
        let sender = self
            .senders
            .get(&conn_id)
            .map(|e| e.value().clone())
            .ok_or(TransportError::NotFound(conn_id))?;
        sender.send(event).await.map_err(|_| TransportError::Closed)
    }

    async fn force_close(&self, conn_id: ConnectionId) {
        self.senders.remove(&conn_id);
        self.closed.insert(conn_id, ());
    }

    fn is_connected(&self, conn_id: ConnectionId) -> bool {
        self.senders.contains_key(&conn_id) && !self.closed.contains_key(&conn_id)
    }
}
