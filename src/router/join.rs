//! `join-room` handler: session-collision resolution, host election,
//! and the four emissions a successful join requires.

use std::sync::Arc;

use tracing::info;

use crate::engine::Engine;
use crate::events::{ParticipantView, ServerEvent};
use crate::hostelect;
use crate::model::{ConnectionId, Participant, RoomId};

fn to_view(p: &Participant) -> ParticipantView {
    ParticipantView {
        id: p.connection_id,
        name: p.display_name.clone(),
        is_muted: p.muted,
        is_video_off: p.video_off,
        is_host: p.host,
        is_raise_hand: p.raised_hand,
    }
}

/// A display name is rejected as "looks like a room id" if it contains a
/// hyphen and runs longer than 10 characters. Lossy by design — see the
/// open-question note in the data model writeup.
fn looks_like_room_id(name: &str) -> bool {
    name.contains('-') && name.len() > 10
}

pub async fn handle(
    engine: &Arc<Engine>,
    conn_id: ConnectionId,
    room_id: RoomId,
    user_name: String,
    user_id: Option<String>,
) {
    if engine.connections.total_count() >= engine.config.max_total_participants {
        let _ = engine
            .transport
            .emit(conn_id, ServerEvent::JoinError { message: "Server at capacity".into() })
            .await;
        return;
    }

    if room_id.trim().is_empty() || user_name.trim().is_empty() || looks_like_room_id(&user_name) {
        let _ = engine
            .transport
            .emit(conn_id, ServerEvent::JoinError { message: "Invalid room id or user name".into() })
            .await;
        return;
    }

    preempt_duplicate_sessions(engine, &user_name).await;
    purge_zombies(engine, &room_id, &user_name).await;

    if engine.rooms.size(&room_id) >= engine.config.max_room_participants {
        let _ = engine
            .transport
            .emit(conn_id, ServerEvent::JoinError { message: "Room is full".into() })
            .await;
        return;
    }

    let participant = Participant::new(conn_id, user_name.clone(), room_id.clone(), user_id.clone());
    engine.connections.insert(participant);
    engine.rooms.add_member(&room_id, conn_id);
    if let Some(uid) = user_id.clone() {
        engine.rooms.set_creator_if_absent(&room_id, uid);
    }

    let election = hostelect::elect_on_join(&engine.rooms, &engine.connections, &room_id, conn_id, user_id.as_deref());
    let became_host = election.new_host == Some(conn_id);
    if became_host {
        engine.connections.update(conn_id, |p| p.host = true);
    }
    if let (Some(new_host), Some(previous)) = (election.new_host, election.previous_host) {
        if new_host != previous {
            engine.connections.update(previous, |p| p.host = false);
        }
    }

    let Some(joiner) = engine.connections.get(conn_id) else {
        return;
    };
    engine
        .emit_to_room_except(&room_id, conn_id, ServerEvent::UserJoined(to_view(&joiner)))
        .await;

    if became_host {
        engine
            .emit_to_room(
                &room_id,
                ServerEvent::HostStatusUpdate { host_id: conn_id, host_name: user_name.clone() },
            )
            .await;
    }

    let snapshot: Vec<ParticipantView> = engine
        .connections
        .in_room(&room_id)
        .iter()
        .filter(|p| p.connection_id != conn_id)
        .map(to_view)
        .collect();
    let _ = engine
        .transport
        .emit(conn_id, ServerEvent::CurrentParticipants { participants: snapshot })
        .await;

    let count = engine.rooms.size(&room_id);
    engine.emit_to_room(&room_id, ServerEvent::ParticipantCount { count }).await;

    info!(conn_id = %conn_id, room_id = %room_id, user_name = %user_name, "participant joined");
}

/// Preempt every other live connection bearing the same display name,
/// wherever its room. Synchronous with respect to the caller: by the time
/// this returns, the joiner cannot observe its own predecessor. Goes
/// through the same eviction path as a disconnect so a preempted host is
/// replaced immediately, not left dangling until the next join.
async fn preempt_duplicate_sessions(engine: &Engine, user_name: &str) {
    for old_id in engine.connections.by_display_name(user_name) {
        engine.transport.force_close(old_id).await;
        super::evict(engine, old_id, "duplicate-session", false).await;
    }
}

/// Remove any member of the target room that the transport no longer
/// reports as connected, or that shares the joining name (belt-and-braces:
/// the preemption pass above should already have caught the latter).
async fn purge_zombies(engine: &Engine, room_id: &RoomId, joining_name: &str) {
    for member_id in engine.rooms.members(room_id) {
        match engine.connections.get(member_id) {
            Some(p) => {
                let zombie = !engine.transport.is_connected(member_id) || p.display_name == joining_name;
                if zombie {
                    super::evict(engine, member_id, "stale-connection", false).await;
                }
            }
            None => engine.rooms.remove_member(room_id, member_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::transport::ChannelTransport;

    #[tokio::test]
    async fn first_joiner_becomes_host_and_gets_empty_snapshot() {
        let transport = ChannelTransport::new();
        let engine = Engine::new(Config::from_env().unwrap(), transport.clone());
        let alice = ConnectionId::new();
        let mut alice_rx = transport.connect(alice);

        handle(&engine, alice, "R1".into(), "Alice".into(), None).await;

        assert!(engine.connections.get(alice).unwrap().host);
        match alice_rx.try_recv() {
            Ok(ServerEvent::CurrentParticipants { participants }) => assert!(participants.is_empty()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_joiner_is_rejected_at_room_capacity() {
        let mut config = Config::from_env().unwrap();
        config.max_room_participants = 1;
        let transport = ChannelTransport::new();
        let engine = Engine::new(config, transport.clone());

        let alice = ConnectionId::new();
        let _a = transport.connect(alice);
        handle(&engine, alice, "R1".into(), "Alice".into(), None).await;

        let bob = ConnectionId::new();
        let mut bob_rx = transport.connect(bob);
        handle(&engine, bob, "R1".into(), "Bob".into(), None).await;

        assert_eq!(engine.rooms.size(&"R1".to_string()), 1);
        match bob_rx.try_recv() {
            Ok(ServerEvent::JoinError { message }) => assert_eq!(message, "Room is full"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_session_preempts_predecessor_and_inherits_host() {
        let transport = ChannelTransport::new();
        let engine = Engine::new(Config::from_env().unwrap(), transport.clone());

        let alice1 = ConnectionId::new();
        let _a1 = transport.connect(alice1);
        handle(&engine, alice1, "R1".into(), "Alice".into(), None).await;
        assert!(engine.connections.get(alice1).unwrap().host);

        let alice2 = ConnectionId::new();
        let _a2 = transport.connect(alice2);
        handle(&engine, alice2, "R1".into(), "Alice".into(), None).await;

        assert_eq!(engine.rooms.size(&"R1".to_string()), 1);
        assert!(engine.connections.get(alice1).is_none());
        assert!(engine.connections.get(alice2).unwrap().host);
    }
}
