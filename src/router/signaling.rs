//! Peer signaling relay: `offer`, `answer`, `ice-candidate`.
//!
//! The router stamps `senderId` from the authenticated connection id; it
//! never trusts a client-supplied sender field. Unknown targets are
//! silently dropped.

use tracing::debug;

use crate::engine::Engine;
use crate::events::ServerEvent;
use crate::model::ConnectionId;

pub async fn relay_offer(engine: &Engine, sender: ConnectionId, target_id: ConnectionId, payload: serde_json::Value) {
    relay(engine, sender, target_id, ServerEvent::Offer { sender_id: sender, payload }).await;
}

pub async fn relay_answer(engine: &Engine, sender: ConnectionId, target_id: ConnectionId, payload: serde_json::Value) {
    relay(engine, sender, target_id, ServerEvent::Answer { sender_id: sender, payload }).await;
}

pub async fn relay_ice_candidate(engine: &Engine, sender: ConnectionId, target_id: ConnectionId, payload: serde_json::Value) {
    relay(engine, sender, target_id, ServerEvent::IceCandidate { sender_id: sender, payload }).await;
}

async fn relay(engine: &Engine, sender: ConnectionId, target: ConnectionId, event: ServerEvent) {
    if engine.transport.emit_to_peer(sender, target, event).await.is_err() {
        debug!(sender = %sender, target = %target, "peer signaling target not found, dropping");
    }
}
