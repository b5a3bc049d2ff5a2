//! Health Monitor
//!
//! Runs a per-connection adaptive ping loop: send a `pong`-shaped keepalive,
//! wait up to 15 s for the client's next `ping`, and adjust the interval
//! based on observed latency or timeout. Only ever writes its own
//! connection's entry in the health-map — the shared-resource policy in the
//! concurrency model draws that line precisely so this task never
//! needs to touch the registries the Event Router owns.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::config::Config;
use crate::events::ServerEvent;
use crate::model::{ConnectionHealth, ConnectionId};
use crate::transport::Transport;

/// Health-map: one record per live connection, written only by that
/// connection's own ping task. A plain `std::sync::Mutex` is enough here —
/// every critical section is synchronous and never held across an `.await`.
#[derive(Default)]
pub struct HealthMonitor {
    records: DashMap<ConnectionId, Mutex<ConnectionHealth>>,
}

impl HealthMonitor {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn snapshot(&self, conn_id: ConnectionId) -> Option<ConnectionHealth> {
        self.records.get(&conn_id).map(|m| m.lock().unwrap().clone())
    }

    /// Remove a connection's health record, e.g. on disconnect.
    pub fn remove(&self, conn_id: ConnectionId) {
        self.records.remove(&conn_id);
    }

    /// Connection ids whose last ping is older than the configured staleness
    /// threshold — candidates for the lifecycle supervisor's sweep.
    #[must_use]
    pub fn stale_connections(&self, older_than: Duration) -> Vec<ConnectionId> {
        self.records
            .iter()
            .filter_map(|entry| {
                let health = entry.value().lock().unwrap();
                if health.last_ping.elapsed() > older_than {
                    Some(*entry.key())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Spawn the adaptive ping loop for a newly-registered connection.
    /// Returns a handle the caller should abort on disconnect to avoid
    /// leaking the timer.
    pub fn spawn_ping_loop(
        self: &Arc<Self>,
        conn_id: ConnectionId,
        transport: Arc<dyn Transport>,
        config: &Config,
    ) -> AbortHandle {
        self.records
            .insert(conn_id, Mutex::new(ConnectionHealth::new(config.ping_interval_start)));

        let monitor = self.clone();
        let ping_timeout = config.ping_timeout;
        let interval_min = config.ping_interval_min;

        let task = tokio::spawn(async move {
            loop {
                let interval = {
                    let Some(record) = monitor.records.get(&conn_id) else {
                        return;
                    };
                    record.lock().unwrap().interval
                };
                tokio::time::sleep(interval).await;

                if !transport.is_connected(conn_id) {
                    return;
                }

                let sent_at = Instant::now();
                {
                    let Some(record) = monitor.records.get(&conn_id) else {
                        return;
                    };
                    record.lock().unwrap().pending_ping_sent_at = Some(sent_at);
                }

                let (server_load, memory_usage) = sample_load();
                // Wire-named `pong`: the adaptive keepalive reuses the same
                // shape clients see in reply to their own `ping`, since the
                // outbound catalog has no separate `ping` event.
                let keepalive = ServerEvent::Pong {
                    timestamp: chrono::Utc::now().timestamp_millis(),
                    server_load,
                    memory_usage,
                    latency_ms: None,
                };
                if transport.emit(conn_id, keepalive).await.is_err() {
                    return;
                }

                tokio::time::sleep(ping_timeout).await;

                let Some(record) = monitor.records.get(&conn_id) else {
                    return;
                };
                let mut health = record.lock().unwrap();
                if health.pending_ping_sent_at.is_none() {
                    // The client's `ping` already arrived and cleared this.
                    continue;
                }
                health.pending_ping_sent_at = None;
                health.healthy = false;
                health.reconnect_count += 1;
                health.interval = health.interval.saturating_sub(Duration::from_secs(5)).max(interval_min);
                debug!(conn_id = %conn_id, interval = ?health.interval, "ping timed out, connection marked unhealthy");
            }
        });

        task.abort_handle()
    }

    /// Record a client-initiated `ping`, matching it against the last
    /// server-initiated keepalive (if any) to compute latency and adapt the
    /// interval. Also serves the client-initiated ping handler:
    /// callers reply with `pong{..., latencyMs}` using the returned snapshot.
    pub fn record_pong(&self, conn_id: ConnectionId, config: &Config) {
        let Some(record) = self.records.get(&conn_id) else {
            return;
        };
        let mut health = record.lock().unwrap();
        let latency = health.pending_ping_sent_at.take().map(|sent_at| sent_at.elapsed());
        health.last_ping = Instant::now();
        health.ping_count += 1;
        health.healthy = true;
        health.latest_latency = latency;

        if let Some(latency) = latency {
            if latency < Duration::from_millis(100) {
                health.interval = (health.interval + Duration::from_secs(5)).min(config.ping_interval_max);
            } else if latency > Duration::from_millis(1000) {
                health.interval = health.interval.saturating_sub(Duration::from_secs(2)).max(config.ping_interval_min);
            }
        }
    }
}

/// Placeholder load sampling: real deployments would read `/proc` or an
/// injected sampler. The ping payload only needs *a* number clients can
/// chart; exactness is not load-bearing for signaling correctness.
fn sample_load() -> (f64, f64) {
    (0.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;

    #[test]
    fn record_pong_without_pending_ping_has_no_latency() {
        let monitor = HealthMonitor::new();
        let conn_id = ConnectionId::new();
        let config = Config::from_env().unwrap();
        monitor.records.insert(conn_id, Mutex::new(ConnectionHealth::new(config.ping_interval_start)));

        monitor.record_pong(conn_id, &config);

        let snap = monitor.snapshot(conn_id).unwrap();
        assert!(snap.healthy);
        assert!(snap.latest_latency.is_none());
    }

    #[test]
    fn fast_pong_increases_interval_up_to_max() {
        let monitor = HealthMonitor::new();
        let conn_id = ConnectionId::new();
        let mut config = Config::from_env().unwrap();
        config.ping_interval_max = Duration::from_secs(35);
        monitor.records.insert(conn_id, Mutex::new(ConnectionHealth::new(Duration::from_secs(30))));
        {
            let record = monitor.records.get(&conn_id).unwrap();
            record.lock().unwrap().pending_ping_sent_at = Some(Instant::now());
        }

        monitor.record_pong(conn_id, &config);

        let snap = monitor.snapshot(conn_id).unwrap();
        assert_eq!(snap.interval, Duration::from_secs(35));
    }

    #[test]
    fn slow_pong_decreases_interval_down_to_min() {
        let monitor = HealthMonitor::new();
        let conn_id = ConnectionId::new();
        let config = Config::from_env().unwrap();
        monitor.records.insert(conn_id, Mutex::new(ConnectionHealth::new(Duration::from_secs(16))));
        {
            let record = monitor.records.get(&conn_id).unwrap();
            record.lock().unwrap().pending_ping_sent_at = Some(Instant::now() - Duration::from_millis(1500));
        }

        monitor.record_pong(conn_id, &config);

        let snap = monitor.snapshot(conn_id).unwrap();
        assert_eq!(snap.interval, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn spawn_ping_loop_registers_a_health_record() {
        let monitor = HealthMonitor::new();
        let transport = ChannelTransport::new();
        let conn_id = ConnectionId::new();
        let _rx = transport.connect(conn_id);
        let config = Config::from_env().unwrap();

        let handle = monitor.spawn_ping_loop(conn_id, transport, &config);
        assert!(monitor.snapshot(conn_id).is_some());
        handle.abort();
    }
}
