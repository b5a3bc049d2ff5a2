//! Self state toggles, room-wide broadcasts, typing, rename, client-initiated
//! ping, and reconnect hinting — the non-host, non-signaling handlers.

use crate::engine::Engine;
use crate::events::ServerEvent;
use crate::model::ConnectionId;

pub async fn handle_user_muted(engine: &Engine, sender: ConnectionId, muted: bool) {
    let Some(p) = engine.connections.get(sender) else { return };
    engine.connections.update(sender, |p| p.muted = muted);
    engine
        .emit_to_room_except(&p.room_id, sender, ServerEvent::UserMuted { participant_id: sender, muted })
        .await;
}

pub async fn handle_user_video_toggled(engine: &Engine, sender: ConnectionId, video_off: bool) {
    let Some(p) = engine.connections.get(sender) else { return };
    engine.connections.update(sender, |p| p.video_off = video_off);
    engine
        .emit_to_room_except(&p.room_id, sender, ServerEvent::UserVideoToggled { participant_id: sender, video_off })
        .await;
}

pub async fn handle_raise_hand_toggled(engine: &Engine, sender: ConnectionId, raised: bool) {
    let Some(p) = engine.connections.get(sender) else { return };
    engine.connections.update(sender, |p| p.raised_hand = raised);
    engine
        .emit_to_room_except(&p.room_id, sender, ServerEvent::RaiseHandToggled { participant_id: sender, raised })
        .await;
}

pub async fn handle_reaction(engine: &Engine, sender: ConnectionId, emoji: String) {
    let Some(p) = engine.connections.get(sender) else { return };
    engine
        .emit_to_room(
            &p.room_id,
            ServerEvent::ReactionReceived { participant_id: sender, user_name: p.display_name.clone(), emoji },
        )
        .await;
}

pub async fn handle_chat_message(engine: &Engine, sender: ConnectionId, message: serde_json::Value) {
    let Some(p) = engine.connections.get(sender) else { return };
    engine
        .emit_to_room(
            &p.room_id,
            ServerEvent::ChatMessage { participant_id: sender, user_name: p.display_name.clone(), message },
        )
        .await;
}

pub async fn handle_typing(engine: &Engine, sender: ConnectionId, is_typing: bool) {
    let Some(p) = engine.connections.get(sender) else { return };
    engine
        .emit_to_room_except(&p.room_id, sender, ServerEvent::UserTyping { participant_id: sender, is_typing })
        .await;
}

/// Caller must be the target itself or a host in the target's room.
pub async fn handle_rename(engine: &Engine, caller: ConnectionId, participant_id: ConnectionId, new_name: String) {
    let Some(caller_p) = engine.connections.get(caller) else { return };
    let Some(target_p) = engine.connections.get(participant_id) else { return };
    if target_p.room_id != caller_p.room_id {
        return;
    }
    if caller != participant_id && !caller_p.host {
        return;
    }
    engine.connections.rename(participant_id, new_name.clone());
    engine
        .emit_to_room(&target_p.room_id, ServerEvent::ParticipantRenamed { participant_id, new_name })
        .await;
}

/// The client-initiated ping handler: record the keepalive and echo
/// a `pong` carrying the latest health snapshot.
pub async fn handle_ping(engine: &Engine, sender: ConnectionId) {
    engine.health.record_pong(sender, &engine.config);
    let latency_ms = engine
        .health
        .snapshot(sender)
        .and_then(|h| h.latest_latency)
        .map(|d| d.as_millis() as u64);
    let _ = engine
        .transport
        .emit(
            sender,
            ServerEvent::Pong { timestamp: chrono::Utc::now().timestamp_millis(), server_load: 0.0, memory_usage: 0.0, latency_ms },
        )
        .await;
}

/// `reconnect-request`: hint data only, never a promise of resurrected state
/// under the caller's (necessarily fresh) connection id.
pub async fn handle_reconnect_request(engine: &Engine, sender: ConnectionId) {
    let user_data = engine
        .connections
        .get(sender)
        .map(|p| {
            serde_json::json!({
                "connectionId": sender.to_string(),
                "roomId": p.room_id,
                "displayName": p.display_name,
            })
        })
        .unwrap_or(serde_json::Value::Null);
    let connection_health = engine
        .health
        .snapshot(sender)
        .map(|h| {
            serde_json::json!({
                "healthy": h.healthy,
                "pingCount": h.ping_count,
                "reconnectCount": h.reconnect_count,
            })
        })
        .unwrap_or(serde_json::Value::Null);
    let _ = engine
        .transport
        .emit(sender, ServerEvent::ReconnectResponse { success: true, user_data, connection_health })
        .await;
}
