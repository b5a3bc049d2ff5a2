//! Engine Configuration
//!
//! Loads configuration from environment variables.

use anyhow::Result;
use std::env;
use std::time::Duration;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,

    /// CORS allowed origins (comma-separated in env, empty = permissive).
    pub cors_origins: Vec<String>,

    /// Announced IP for any downstream SFU. Opaque to this engine.
    pub announced_ip: Option<String>,

    /// Maximum signaling payload size in bytes.
    pub max_payload_bytes: usize,

    /// Maximum total participants across all rooms.
    pub max_total_participants: usize,

    /// Maximum participants per room.
    pub max_room_participants: usize,

    /// Adaptive ping interval starting point.
    pub ping_interval_start: Duration,
    /// Adaptive ping interval lower bound.
    pub ping_interval_min: Duration,
    /// Adaptive ping interval upper bound.
    pub ping_interval_max: Duration,

    /// Timeout waiting for a pong before marking a connection unhealthy.
    pub ping_timeout: Duration,

    /// A connection is stale once its last ping exceeds this age.
    pub stale_after: Duration,

    /// Interval between stale-connection sweeps.
    pub sweep_interval: Duration,

    /// Interval between health-summary log lines.
    pub health_log_interval: Duration,

    /// Soft shutdown deadline: force-close any remaining connections after this.
    pub shutdown_soft_deadline: Duration,

    /// Hard shutdown deadline: exit(1) if graceful shutdown hasn't finished.
    pub shutdown_hard_deadline: Duration,
}

impl Config {
    /// Load configuration from environment variables, applying spec defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:4000".into()),
            cors_origins: env::var("CORS_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            announced_ip: env::var("ANNOUNCED_IP").ok(),
            max_payload_bytes: env_usize("MAX_PAYLOAD_BYTES", 1024 * 1024),
            max_total_participants: env_usize("MAX_TOTAL_PARTICIPANTS", 1000),
            max_room_participants: env_usize("MAX_ROOM_PARTICIPANTS", 50),
            ping_interval_start: Duration::from_secs(30),
            ping_interval_min: Duration::from_secs(15),
            ping_interval_max: Duration::from_secs(60),
            ping_timeout: Duration::from_secs(15),
            stale_after: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
            health_log_interval: Duration::from_secs(30),
            shutdown_soft_deadline: Duration::from_secs(5),
            shutdown_hard_deadline: Duration::from_secs(15),
        })
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
