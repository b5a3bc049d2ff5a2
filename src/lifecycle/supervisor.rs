//! Lifecycle Supervisor: periodic stale-connection reaping and a health
//! summary log line, running on timers orthogonal to event handling.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::info;

use crate::engine::Engine;
use crate::router;

/// Spawn the stale-sweep and health-summary log loops. Both run until
/// aborted; the caller (main) holds the handles and aborts them as part of
/// graceful shutdown.
pub fn spawn(engine: Arc<Engine>) -> (JoinHandle<()>, JoinHandle<()>) {
    let sweep_engine = engine.clone();
    let sweep = tokio::spawn(async move {
        let mut ticker = interval(sweep_engine.config.sweep_interval);
        loop {
            ticker.tick().await;
            sweep_stale(&sweep_engine).await;
        }
    });

    let log_engine = engine;
    let log = tokio::spawn(async move {
        let mut ticker = interval(log_engine.config.health_log_interval);
        loop {
            ticker.tick().await;
            log_health_summary(&log_engine);
        }
    });

    (sweep, log)
}

/// Remove every connection whose last ping exceeds the stale threshold.
/// Silent by design — no `user-left` is emitted, these are assumed
/// dead sockets the client side already gave up on.
async fn sweep_stale(engine: &Engine) {
    let stale = engine.health.stale_connections(engine.config.stale_after);
    for conn_id in &stale {
        router::evict(engine, *conn_id, "stale-sweep", true).await;
    }
    if !stale.is_empty() {
        info!(count = stale.len(), "stale sweep removed connections");
    }
}

fn log_health_summary(engine: &Engine) {
    info!(
        participants = engine.connections.total_count(),
        rooms = engine.rooms.room_count(),
        "health summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{ConnectionId, Participant};
    use crate::transport::ChannelTransport;
    use std::time::Duration;

    #[tokio::test]
    async fn sweep_silently_removes_stale_connections() {
        let mut config = Config::from_env().unwrap();
        config.stale_after = Duration::from_millis(0);
        let transport = ChannelTransport::new();
        let engine = Engine::new(config, transport.clone());
        let room = "R1".to_string();
        let alice = Participant::new(ConnectionId::new(), "Alice".into(), room.clone(), None);
        let alice_id = alice.connection_id;
        engine.connections.insert(alice);
        engine.rooms.add_member(&room, alice_id);

        let handle = engine.health.spawn_ping_loop(alice_id, transport.clone(), &engine.config);
        handle.abort();
        tokio::time::sleep(Duration::from_millis(5)).await;

        sweep_stale(&engine).await;

        assert!(engine.connections.get(alice_id).is_none());
        assert!(!engine.rooms.exists(&room));
    }
}
