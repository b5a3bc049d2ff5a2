//! Host-only actions: mute/video/remove/transfer/spotlight, meeting
//! controls, breakout rooms, polls, whiteboard, files, and Q&A. Every
//! handler here requires the caller to be the room's current host; a
//! non-host caller is silently ignored, no emission, no state change.

use tracing::debug;

use crate::engine::Engine;
use crate::events::ServerEvent;
use crate::hostelect;
use crate::model::{ConnectionId, Participant};

fn require_host(engine: &Engine, caller: ConnectionId) -> Option<Participant> {
    let p = engine.connections.get(caller)?;
    if p.host {
        Some(p)
    } else {
        debug!(caller = %caller, "host-only action rejected: caller is not host");
        None
    }
}

fn target_in_room(engine: &Engine, host: &Participant, target: ConnectionId) -> bool {
    engine.connections.get(target).map(|t| t.room_id == host.room_id).unwrap_or(false)
}

pub async fn handle_mute_participant(engine: &Engine, caller: ConnectionId, participant_id: ConnectionId) {
    let Some(host) = require_host(engine, caller) else { return };
    if !target_in_room(engine, &host, participant_id) {
        return;
    }
    engine.connections.update(participant_id, |p| p.muted = true);
    engine.emit_to_room(&host.room_id, ServerEvent::ParticipantForceMuted { participant_id }).await;
}

pub async fn handle_toggle_video(engine: &Engine, caller: ConnectionId, participant_id: ConnectionId) {
    let Some(host) = require_host(engine, caller) else { return };
    let Some(target) = engine.connections.get(participant_id) else { return };
    if target.room_id != host.room_id {
        return;
    }
    let video_off = !target.video_off;
    engine.connections.update(participant_id, |p| p.video_off = video_off);
    engine
        .emit_to_room(&host.room_id, ServerEvent::ParticipantForceVideoToggle { participant_id, video_off })
        .await;
}

pub async fn handle_remove_participant(engine: &Engine, caller: ConnectionId, participant_id: ConnectionId) {
    let Some(host) = require_host(engine, caller) else { return };
    if !target_in_room(engine, &host, participant_id) {
        return;
    }
    let _ = engine
        .transport
        .emit(
            participant_id,
            ServerEvent::ForceDisconnect {
                reason: "removed-by-host".into(),
                message: "You have been removed from the meeting".into(),
            },
        )
        .await;
    engine.transport.force_close(participant_id).await;
    super::evict(engine, participant_id, "host-removed", false).await;
}

pub async fn handle_transfer(engine: &Engine, caller: ConnectionId, new_host_id: ConnectionId) {
    let Some(host) = engine.connections.get(caller) else { return };
    let Some(election) = hostelect::transfer(&engine.rooms, &host.room_id, caller, new_host_id) else {
        return;
    };
    engine.connections.update(caller, |p| p.host = false);
    engine.connections.update(new_host_id, |p| p.host = true);
    if let Some(event) = hostelect::host_changed_event(&engine.connections, &host.room_id, &engine.rooms, &election) {
        engine.emit_to_room(&host.room_id, event).await;
    }
}

pub async fn handle_spotlight(engine: &Engine, caller: ConnectionId, participant_id: ConnectionId) {
    let Some(host) = require_host(engine, caller) else { return };
    if !target_in_room(engine, &host, participant_id) {
        return;
    }
    engine.emit_to_room(&host.room_id, ServerEvent::ParticipantSpotlighted { participant_id }).await;
}

pub async fn handle_remove_spotlight(engine: &Engine, caller: ConnectionId) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::SpotlightRemoved { participant_id: caller }).await;
}

pub async fn handle_toggle_meeting_lock(engine: &Engine, caller: ConnectionId, locked: bool) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::MeetingLocked { locked }).await;
}

pub async fn handle_toggle_waiting_room(engine: &Engine, caller: ConnectionId, enabled: bool) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::WaitingRoomToggled { enabled }).await;
}

pub async fn handle_toggle_screen_share_restriction(engine: &Engine, caller: ConnectionId, restricted: bool) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::ScreenShareRestricted { restricted }).await;
}

pub async fn handle_toggle_chat_restriction(engine: &Engine, caller: ConnectionId, restricted: bool) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::ChatRestricted { restricted }).await;
}

/// Screen share is self-service (any participant, not host-gated) but
/// automatically spotlights/unspotlights the sharer.
pub async fn handle_screen_share_started(engine: &Engine, caller: ConnectionId) {
    let Some(p) = engine.connections.get(caller) else { return };
    engine.emit_to_room(&p.room_id, ServerEvent::ScreenShareStarted { participant_id: caller }).await;
    engine.emit_to_room(&p.room_id, ServerEvent::ParticipantSpotlighted { participant_id: caller }).await;
}

pub async fn handle_screen_share_stopped(engine: &Engine, caller: ConnectionId) {
    let Some(p) = engine.connections.get(caller) else { return };
    engine.emit_to_room(&p.room_id, ServerEvent::ScreenShareStopped { participant_id: caller }).await;
    engine.emit_to_room(&p.room_id, ServerEvent::SpotlightRemoved { participant_id: caller }).await;
}

pub async fn handle_start_breakout_rooms(engine: &Engine, caller: ConnectionId, rooms: serde_json::Value, duration: Option<u64>) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::BreakoutRoomsCreated { rooms: rooms.clone() }).await;
    let duration = duration.unwrap_or(0);
    engine.emit_to_room(&host.room_id, ServerEvent::BreakoutRoomsStarted { duration }).await;

    let Some(assignments) = rooms.as_object() else { return };
    for (breakout_room_id, members) in assignments {
        let Some(members) = members.as_array() else { continue };
        for member in members {
            let Some(conn_str) = member.as_str() else { continue };
            let Ok(conn_id) = conn_str.parse::<uuid::Uuid>() else { continue };
            let conn_id = ConnectionId(conn_id);
            if !target_in_room(engine, &host, conn_id) {
                continue;
            }
            let _ = engine
                .transport
                .emit(conn_id, ServerEvent::AssignedToBreakoutRoom { room_id: breakout_room_id.clone() })
                .await;
        }
    }
}

pub async fn handle_end_breakout_rooms(engine: &Engine, caller: ConnectionId) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::BreakoutRoomsEnded).await;
}

pub async fn handle_create_poll(engine: &Engine, caller: ConnectionId, poll: serde_json::Value) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::PollCreated { poll }).await;
}

pub async fn handle_vote_poll(engine: &Engine, caller: ConnectionId, vote: serde_json::Value) {
    let Some(p) = engine.connections.get(caller) else { return };
    engine.emit_to_room(&p.room_id, ServerEvent::PollVote { vote }).await;
}

pub async fn handle_end_poll(engine: &Engine, caller: ConnectionId, poll_id: String) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::PollEnded { poll_id }).await;
}

pub async fn handle_whiteboard_draw(engine: &Engine, caller: ConnectionId, stroke: serde_json::Value) {
    let Some(p) = engine.connections.get(caller) else { return };
    engine.emit_to_room_except(&p.room_id, caller, ServerEvent::WhiteboardDraw { stroke }).await;
}

pub async fn handle_whiteboard_clear(engine: &Engine, caller: ConnectionId) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::WhiteboardClear).await;
}

pub async fn handle_share_file(engine: &Engine, caller: ConnectionId, file: serde_json::Value) {
    let Some(p) = engine.connections.get(caller) else { return };
    engine.emit_to_room(&p.room_id, ServerEvent::FileShared { file }).await;
}

pub async fn handle_delete_file(engine: &Engine, caller: ConnectionId, file_id: String) {
    let Some(host) = require_host(engine, caller) else { return };
    engine.emit_to_room(&host.room_id, ServerEvent::FileDeleted { file_id }).await;
}

pub async fn handle_ask_question(engine: &Engine, caller: ConnectionId, question: serde_json::Value) {
    let Some(p) = engine.connections.get(caller) else { return };
    engine.emit_to_room(&p.room_id, ServerEvent::QuestionAsked { question }).await;
}

pub async fn handle_upvote_question(engine: &Engine, caller: ConnectionId, question_id: String) {
    let Some(p) = engine.connections.get(caller) else { return };
    engine.emit_to_room(&p.room_id, ServerEvent::QuestionUpvoted { question_id }).await;
}

pub async fn handle_answer_question(engine: &Engine, caller: ConnectionId, question_id: String, answer: serde_json::Value) {
    let Some(host) = require_host(engine, caller) else { return };
    engine
        .emit_to_room(&host.room_id, ServerEvent::QuestionAnswered { question_id, answer })
        .await;
}
