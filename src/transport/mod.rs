//! Transport Adapter
//!
//! Accepts long-lived bidirectional connections and frames named events. The
//! engine never talks to a socket directly — it goes through this trait, so
//! the Event Router can be driven by an in-process test double (see
//! [`ChannelTransport`]) with the exact same dispatch code that runs in
//! production against [`WebSocketTransport`].

pub mod channel;
pub mod websocket;

use async_trait::async_trait;

use crate::events::ServerEvent;
use crate::model::ConnectionId;

pub use channel::ChannelTransport;
pub use websocket::WebSocketTransport;

/// Errors surfaced by a transport when an emit cannot be delivered.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection not found: {0}")]
    NotFound(ConnectionId),
    #[error("connection closed")]
    Closed,
}

/// Emit-to-one / emit-to-room primitives over an opaque set of connections.
///
/// Implementors must preserve per-destination ordering: emits to a single
/// connection arrive in the order the router issued them. Ordering between
/// distinct connections is unspecified.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an event to a single connection.
    async fn emit(&self, conn_id: ConnectionId, event: ServerEvent) -> Result<(), TransportError>;

    /// Send an event from one connection to another, with no implied scoping.
    async fn emit_to_peer(
        &self,
        _from: ConnectionId,
        to: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), TransportError> {
        self.emit(to, event).await
    }

    /// Forcibly close a connection, e.g. after a host-remove or preemption.
    async fn force_close(&self, conn_id: ConnectionId);

    /// Whether a connection is still live, from the transport's point of view.
    fn is_connected(&self, conn_id: ConnectionId) -> bool;
}
