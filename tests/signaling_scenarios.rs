//! End-to-end scenarios driven through `router::dispatch` and the
//! in-process `ChannelTransport`, exercising the full event path a real
//! websocket connection would take.

use signal_hub::config::Config;
use signal_hub::engine::Engine;
use signal_hub::events::{ClientEvent, ServerEvent};
use signal_hub::model::ConnectionId;
use signal_hub::router;
use signal_hub::transport::ChannelTransport;
use tokio::sync::mpsc::Receiver;

fn new_engine() -> (std::sync::Arc<Engine>, std::sync::Arc<ChannelTransport>) {
    let transport = ChannelTransport::new();
    let engine = Engine::new(Config::from_env().unwrap(), transport.clone());
    (engine, transport)
}

async fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn join(room: &str, name: &str, user_id: Option<String>) -> ClientEvent {
    ClientEvent::JoinRoom { room_id: room.into(), user_name: name.into(), user_id }
}

#[tokio::test]
async fn s1_two_peer_join() {
    let (engine, transport) = new_engine();

    let alice = ConnectionId::new();
    let mut alice_rx = transport.connect(alice);
    router::dispatch(&engine, alice, join("R1", "Alice", None)).await;

    match alice_rx.try_recv() {
        Ok(ServerEvent::CurrentParticipants { participants }) => assert!(participants.is_empty()),
        other => panic!("unexpected: {other:?}"),
    }

    let bob = ConnectionId::new();
    let mut bob_rx = transport.connect(bob);
    router::dispatch(&engine, bob, join("R1", "Bob", None)).await;

    let alice_events = drain(&mut alice_rx).await;
    assert!(alice_events.iter().any(|e| matches!(e, ServerEvent::UserJoined(v) if v.name == "Bob" && !v.is_host)));
    assert!(alice_events.iter().any(|e| matches!(e, ServerEvent::ParticipantCount { count: 2 })));

    let bob_events = drain(&mut bob_rx).await;
    let snapshot = bob_events.iter().find_map(|e| match e {
        ServerEvent::CurrentParticipants { participants } => Some(participants),
        _ => None,
    });
    assert!(snapshot.is_some_and(|p| p.len() == 1 && p[0].name == "Alice" && p[0].is_host));
    assert!(bob_events.iter().any(|e| matches!(e, ServerEvent::ParticipantCount { count: 2 })));

    assert!(engine.connections.get(alice).unwrap().host);
}

#[tokio::test]
async fn s2_duplicate_session_preemption() {
    let (engine, transport) = new_engine();

    let alice1 = ConnectionId::new();
    let _a1_rx = transport.connect(alice1);
    router::dispatch(&engine, alice1, join("R1", "Alice", None)).await;
    assert!(engine.connections.get(alice1).unwrap().host);

    let alice2 = ConnectionId::new();
    let mut a2_rx = transport.connect(alice2);
    router::dispatch(&engine, alice2, join("R1", "Alice", None)).await;

    assert!(engine.connections.get(alice1).is_none());
    assert!(!transport.is_connected(alice1));
    assert_eq!(engine.rooms.size(&"R1".to_string()), 1);
    assert!(engine.connections.get(alice2).unwrap().host);

    let a2_events = drain(&mut a2_rx).await;
    assert!(a2_events.iter().any(|e| matches!(e, ServerEvent::CurrentParticipants { participants } if participants.is_empty())));
}

#[tokio::test]
async fn s3_peer_relay_isolation() {
    let (engine, transport) = new_engine();

    let alpha = ConnectionId::new();
    let beta = ConnectionId::new();
    let gamma = ConnectionId::new();
    let _a_rx = transport.connect(alpha);
    let mut b_rx = transport.connect(beta);
    let mut g_rx = transport.connect(gamma);

    router::dispatch(&engine, alpha, join("R1", "Alpha", None)).await;
    router::dispatch(&engine, beta, join("R1", "Beta", None)).await;
    router::dispatch(&engine, gamma, join("R1", "Gamma", None)).await;
    drain(&mut b_rx).await;
    drain(&mut g_rx).await;

    router::dispatch(
        &engine,
        alpha,
        ClientEvent::Offer { target_id: beta, payload: serde_json::json!("X") },
    )
    .await;

    let beta_events = drain(&mut b_rx).await;
    assert_eq!(beta_events.len(), 1);
    match &beta_events[0] {
        ServerEvent::Offer { sender_id, payload } => {
            assert_eq!(*sender_id, alpha);
            assert_eq!(payload, &serde_json::json!("X"));
        }
        other => panic!("unexpected: {other:?}"),
    }

    assert!(drain(&mut g_rx).await.is_empty());
}

#[tokio::test]
async fn s4_host_auto_transfer_on_disconnect() {
    let (engine, transport) = new_engine();

    let alpha = ConnectionId::new();
    let beta = ConnectionId::new();
    let gamma = ConnectionId::new();
    let _a_rx = transport.connect(alpha);
    let mut b_rx = transport.connect(beta);
    let mut g_rx = transport.connect(gamma);

    router::dispatch(&engine, alpha, join("R1", "Alpha", None)).await;
    router::dispatch(&engine, beta, join("R1", "Beta", None)).await;
    router::dispatch(&engine, gamma, join("R1", "Gamma", None)).await;
    drain(&mut b_rx).await;
    drain(&mut g_rx).await;

    router::evict(&engine, alpha, "disconnect", false).await;

    assert_eq!(engine.rooms.host_of(&"R1".to_string()), Some(beta));

    let beta_events = drain(&mut b_rx).await;
    let host_changed = beta_events.iter().find_map(|e| match e {
        ServerEvent::HostChanged { new_host_id, previous_host_id, participants, .. } => {
            Some((*new_host_id, *previous_host_id, participants.clone()))
        }
        _ => None,
    });
    let (new_host_id, previous_host_id, participants) = host_changed.expect("host-changed broadcast");
    assert_eq!(new_host_id, beta);
    assert_eq!(previous_host_id, Some(alpha));
    assert!(participants.iter().any(|p| p.id == beta && p.is_host));
    assert!(participants.iter().any(|p| p.id == gamma && !p.is_host));

    assert!(g_rx.try_recv().is_ok());
}

#[tokio::test]
async fn s5_capacity_rejection() {
    let mut config = Config::from_env().unwrap();
    config.max_room_participants = 1;
    let transport = ChannelTransport::new();
    let engine = Engine::new(config, transport.clone());

    let alpha = ConnectionId::new();
    let _a_rx = transport.connect(alpha);
    router::dispatch(&engine, alpha, join("R1", "Alpha", None)).await;

    let beta = ConnectionId::new();
    let mut b_rx = transport.connect(beta);
    router::dispatch(&engine, beta, join("R1", "Beta", None)).await;

    assert_eq!(engine.rooms.size(&"R1".to_string()), 1);
    assert!(engine.connections.get(beta).is_none());
    match b_rx.try_recv() {
        Ok(ServerEvent::JoinError { message }) => assert_eq!(message, "Room is full"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn s6_unauthorized_host_action_is_a_silent_no_op() {
    let (engine, transport) = new_engine();

    let alpha = ConnectionId::new();
    let beta = ConnectionId::new();
    let _a_rx = transport.connect(alpha);
    let mut b_rx = transport.connect(beta);

    router::dispatch(&engine, alpha, join("R1", "Alpha", None)).await;
    router::dispatch(&engine, beta, join("R1", "Beta", None)).await;
    drain(&mut b_rx).await;

    router::dispatch(&engine, beta, ClientEvent::HostRemoveParticipant { participant_id: alpha }).await;

    assert!(engine.connections.get(alpha).is_some());
    assert!(drain(&mut b_rx).await.is_empty());
    let _a_rx_after = transport.is_connected(alpha);
    assert!(_a_rx_after);
}

#[tokio::test]
async fn raise_hand_round_trip_restores_initial_state() {
    let (engine, transport) = new_engine();
    let alpha = ConnectionId::new();
    let _a_rx = transport.connect(alpha);
    router::dispatch(&engine, alpha, join("R1", "Alpha", None)).await;

    assert!(!engine.connections.get(alpha).unwrap().raised_hand);
    router::dispatch(&engine, alpha, ClientEvent::RaiseHandToggled { raised: true }).await;
    assert!(engine.connections.get(alpha).unwrap().raised_hand);
    router::dispatch(&engine, alpha, ClientEvent::RaiseHandToggled { raised: false }).await;
    assert!(!engine.connections.get(alpha).unwrap().raised_hand);
}

#[tokio::test]
async fn host_transfer_round_trip_restores_original_host() {
    let (engine, transport) = new_engine();
    let alpha = ConnectionId::new();
    let beta = ConnectionId::new();
    let _a_rx = transport.connect(alpha);
    let _b_rx = transport.connect(beta);

    router::dispatch(&engine, alpha, join("R1", "Alpha", None)).await;
    router::dispatch(&engine, beta, join("R1", "Beta", None)).await;
    assert!(engine.connections.get(alpha).unwrap().host);

    router::dispatch(&engine, alpha, ClientEvent::HostTransfer { new_host_id: beta }).await;
    assert!(engine.connections.get(beta).unwrap().host);
    assert!(!engine.connections.get(alpha).unwrap().host);

    router::dispatch(&engine, beta, ClientEvent::HostTransfer { new_host_id: alpha }).await;
    assert!(engine.connections.get(alpha).unwrap().host);
    assert!(!engine.connections.get(beta).unwrap().host);
    assert_eq!(engine.rooms.host_of(&"R1".to_string()), Some(alpha));
}
