//! Signal Hook: translates OS signals into graceful shutdown, and
//! the process-level panic hook fallback.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::engine::Engine;
use crate::events::ServerEvent;

/// Wait for any of SIGTERM/SIGINT/SIGUSR2/SIGHUP, returning its name.
pub async fn wait_for_signal() -> &'static str {
    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut usr2 = signal(SignalKind::user_defined2()).expect("failed to install SIGUSR2 handler");
    let mut hup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = int.recv() => "SIGINT",
        _ = usr2.recv() => "SIGUSR2",
        _ = hup.recv() => "SIGHUP",
    }
}

/// Run the shutdown sequence: snapshot, broadcast, soft deadline,
/// force-close, with an independent hard deadline armed the whole time.
/// Returns once every connection has been closed (or the soft deadline
/// passed); the caller should exit 0 afterward.
pub async fn graceful_shutdown(engine: Arc<Engine>, signal_name: &str) {
    info!(signal = signal_name, "shutdown signal received");

    let recovery_data = snapshot_recovery_data(&engine);
    engine
        .broadcast_all(ServerEvent::ServerShutdown {
            message: "Server is shutting down".into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            recovery_data,
            expected_downtime: 30_000,
        })
        .await;

    let hard_deadline = engine.config.shutdown_hard_deadline;
    let hard_exit = tokio::spawn(async move {
        tokio::time::sleep(hard_deadline).await;
        error!("hard shutdown deadline exceeded, forcing exit");
        std::process::exit(1);
    });

    tokio::time::sleep(engine.config.shutdown_soft_deadline).await;
    force_close_all(&engine).await;

    hard_exit.abort();
    info!("graceful shutdown complete");
}

async fn force_close_all(engine: &Engine) {
    for conn_id in engine.connections.all_ids() {
        engine.transport.force_close(conn_id).await;
    }
}

/// Hint-only snapshot: makes no commitment to resurrect state on
/// restart, clients are expected to re-issue `join-room`.
fn snapshot_recovery_data(engine: &Engine) -> serde_json::Value {
    let participants: Vec<serde_json::Value> = engine
        .connections
        .all_ids()
        .into_iter()
        .filter_map(|id| engine.connections.get(id))
        .map(|p| {
            serde_json::json!({
                "connectionId": p.connection_id.to_string(),
                "roomId": p.room_id,
                "displayName": p.display_name,
            })
        })
        .collect();
    serde_json::json!({ "participants": participants })
}

/// Install the process-level panic hook: log the panic, then wait the 1s
/// grace period and initiate graceful shutdown if nothing else has.
pub fn install_panic_hook(engine: Arc<Engine>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        error!(panic = %panic_info, "uncaught panic, starting 1s grace period before shutdown");
        let engine = engine.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            graceful_shutdown(engine, "panic").await;
            std::process::exit(1);
        });
    }));
}
