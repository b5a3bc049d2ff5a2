//! Event Router: the static dispatch table from named client events to
//! typed handlers. Unknown events are
//! dropped; a panicking or erroring handler is caught and logged, never
//! terminates the connection or the process.

mod host;
mod join;
mod presence;
mod signaling;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::warn;

use crate::engine::Engine;
use crate::events::{ClientEvent, ServerEvent};
use crate::hostelect;
use crate::model::ConnectionId;

/// Dispatch one client event. Never panics the caller: a handler that
/// panics is caught and logged.
pub async fn dispatch(engine: &Arc<Engine>, conn_id: ConnectionId, event: ClientEvent) {
    let outcome = AssertUnwindSafe(route(engine, conn_id, event)).catch_unwind().await;
    if outcome.is_err() {
        warn!(conn_id = %conn_id, "event handler panicked, connection preserved");
    }
}

async fn route(engine: &Arc<Engine>, conn_id: ConnectionId, event: ClientEvent) {
    match event {
        ClientEvent::JoinRoom { room_id, user_name, user_id } => {
            join::handle(engine, conn_id, room_id, user_name, user_id).await;
        }
        ClientEvent::Offer { target_id, payload } => signaling::relay_offer(engine, conn_id, target_id, payload).await,
        ClientEvent::Answer { target_id, payload } => signaling::relay_answer(engine, conn_id, target_id, payload).await,
        ClientEvent::IceCandidate { target_id, payload } => {
            signaling::relay_ice_candidate(engine, conn_id, target_id, payload).await;
        }
        ClientEvent::UserMuted { muted } => presence::handle_user_muted(engine, conn_id, muted).await,
        ClientEvent::UserVideoToggled { video_off } => presence::handle_user_video_toggled(engine, conn_id, video_off).await,
        ClientEvent::RaiseHandToggled { raised } => presence::handle_raise_hand_toggled(engine, conn_id, raised).await,
        ClientEvent::Reaction { emoji } => presence::handle_reaction(engine, conn_id, emoji).await,
        ClientEvent::ChatMessage { message } => presence::handle_chat_message(engine, conn_id, message).await,
        ClientEvent::Typing { is_typing } => presence::handle_typing(engine, conn_id, is_typing).await,
        ClientEvent::RenameParticipant { participant_id, new_name } => {
            presence::handle_rename(engine, conn_id, participant_id, new_name).await;
        }
        ClientEvent::Ping => presence::handle_ping(engine, conn_id).await,
        ClientEvent::ReconnectRequest => presence::handle_reconnect_request(engine, conn_id).await,
        ClientEvent::HostMuteParticipant { participant_id } => host::handle_mute_participant(engine, conn_id, participant_id).await,
        ClientEvent::HostToggleVideo { participant_id } => host::handle_toggle_video(engine, conn_id, participant_id).await,
        ClientEvent::HostRemoveParticipant { participant_id } => host::handle_remove_participant(engine, conn_id, participant_id).await,
        ClientEvent::HostTransfer { new_host_id } => host::handle_transfer(engine, conn_id, new_host_id).await,
        ClientEvent::HostSpotlightParticipant { participant_id } => {
            host::handle_spotlight(engine, conn_id, participant_id).await;
        }
        ClientEvent::HostRemoveSpotlight => host::handle_remove_spotlight(engine, conn_id).await,
        ClientEvent::ToggleMeetingLock { locked } => host::handle_toggle_meeting_lock(engine, conn_id, locked).await,
        ClientEvent::ToggleWaitingRoom { enabled } => host::handle_toggle_waiting_room(engine, conn_id, enabled).await,
        ClientEvent::ToggleScreenShareRestriction { restricted } => {
            host::handle_toggle_screen_share_restriction(engine, conn_id, restricted).await;
        }
        ClientEvent::ToggleChatRestriction { restricted } => {
            host::handle_toggle_chat_restriction(engine, conn_id, restricted).await;
        }
        ClientEvent::ScreenShareStarted => host::handle_screen_share_started(engine, conn_id).await,
        ClientEvent::ScreenShareStopped => host::handle_screen_share_stopped(engine, conn_id).await,
        ClientEvent::StartBreakoutRooms { rooms, duration } => {
            host::handle_start_breakout_rooms(engine, conn_id, rooms, duration).await;
        }
        ClientEvent::EndBreakoutRooms => host::handle_end_breakout_rooms(engine, conn_id).await,
        ClientEvent::CreatePoll { poll } => host::handle_create_poll(engine, conn_id, poll).await,
        ClientEvent::VotePoll { vote } => host::handle_vote_poll(engine, conn_id, vote).await,
        ClientEvent::EndPoll { poll_id } => host::handle_end_poll(engine, conn_id, poll_id).await,
        ClientEvent::WhiteboardDraw { stroke } => host::handle_whiteboard_draw(engine, conn_id, stroke).await,
        ClientEvent::WhiteboardClear => host::handle_whiteboard_clear(engine, conn_id).await,
        ClientEvent::ShareFile { file } => host::handle_share_file(engine, conn_id, file).await,
        ClientEvent::DeleteFile { file_id } => host::handle_delete_file(engine, conn_id, file_id).await,
        ClientEvent::AskQuestion { question } => host::handle_ask_question(engine, conn_id, question).await,
        ClientEvent::UpvoteQuestion { question_id } => host::handle_upvote_question(engine, conn_id, question_id).await,
        ClientEvent::AnswerQuestion { question_id, answer } => {
            host::handle_answer_question(engine, conn_id, question_id, answer).await;
        }
        ClientEvent::Error { message } => handle_transport_error(engine, conn_id, message).await,
    }
}

/// Transport error observed on a connection: hint a reconnect, leave
/// recovery to the client.
async fn handle_transport_error(engine: &Engine, conn_id: ConnectionId, message: String) {
    warn!(conn_id = %conn_id, %message, "client reported a transport error");
    let _ = engine
        .transport
        .emit(
            conn_id,
            ServerEvent::ConnectionRecovery { message, timestamp: chrono::Utc::now().timestamp_millis() },
        )
        .await;
}

/// Remove a participant's state across every registry, promote a new host
/// if it was the host of a room that remains non-empty, and emit
/// `user-left` unless `silent` is set (the stale sweep removes silently).
pub async fn evict(engine: &Engine, conn_id: ConnectionId, reason: &str, silent: bool) {
    let Some(p) = engine.connections.remove(conn_id) else {
        return;
    };
    engine.rooms.remove_member(&p.room_id, conn_id);
    engine.health.remove(conn_id);

    if !silent {
        engine
            .emit_to_room(
                &p.room_id,
                ServerEvent::UserLeft {
                    participant_id: conn_id,
                    user_name: p.display_name.clone(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                    reason: reason.into(),
                },
            )
            .await;
    }

    if !p.host || !engine.rooms.exists(&p.room_id) {
        return;
    }
    if let Some(election) = hostelect::promote_on_host_disconnect(&engine.rooms, &p.room_id, conn_id) {
        if let Some(new_host) = election.new_host {
            engine.connections.update(new_host, |np| np.host = true);
        }
        if let Some(event) = hostelect::host_changed_event(&engine.connections, &p.room_id, &engine.rooms, &election) {
            engine.emit_to_room(&p.room_id, event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::Participant;
    use crate::transport::ChannelTransport;

    #[tokio::test]
    async fn evict_promotes_next_host_and_broadcasts_host_changed() {
        let transport = ChannelTransport::new();
        let engine = Engine::new(Config::from_env().unwrap(), transport.clone());
        let room = "R1".to_string();

        let alice = Participant::new(ConnectionId::new(), "Alice".into(), room.clone(), None);
        let (alice_id,) = (alice.connection_id,);
        engine.connections.insert(alice);
        engine.rooms.add_member(&room, alice_id);
        engine.rooms.set_host(&room, alice_id);
        engine.connections.update(alice_id, |p| p.host = true);

        let bob = Participant::new(ConnectionId::new(), "Bob".into(), room.clone(), None);
        let bob_id = bob.connection_id;
        engine.connections.insert(bob);
        engine.rooms.add_member(&room, bob_id);
        let mut bob_rx = transport.connect(bob_id);
        let _alice_rx = transport.connect(alice_id);

        evict(&engine, alice_id, "disconnect", false).await;

        assert_eq!(engine.rooms.host_of(&room), Some(bob_id));
        assert!(engine.connections.get(bob_id).unwrap().host);

        let mut saw_user_left = false;
        let mut saw_host_changed = false;
        while let Ok(event) = bob_rx.try_recv() {
            match event {
                ServerEvent::UserLeft { .. } => saw_user_left = true,
                ServerEvent::HostChanged { new_host_id, .. } => {
                    saw_host_changed = true;
                    assert_eq!(new_host_id, bob_id);
                }
                _ => {}
            }
        }
        assert!(saw_user_left && saw_host_changed);
    }

    #[tokio::test]
    async fn silent_eviction_emits_nothing() {
        let transport = ChannelTransport::new();
        let engine = Engine::new(Config::from_env().unwrap(), transport.clone());
        let room = "R1".to_string();
        let alice = Participant::new(ConnectionId::new(), "Alice".into(), room.clone(), None);
        let alice_id = alice.connection_id;
        engine.connections.insert(alice);
        engine.rooms.add_member(&room, alice_id);

        let bob_id = ConnectionId::new();
        let mut bob_rx = transport.connect(bob_id);
        engine.rooms.add_member(&room, bob_id);

        evict(&engine, alice_id, "stale", true).await;

        assert!(bob_rx.try_recv().is_err());
    }
}
