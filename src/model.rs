//! Core data model: connection, participant, room, and health records.
//!
//! Mirrors the invariants in the room/participant state machine: every
//! participant belongs to exactly one room, at most one participant per
//! room is host, and the session index tracks live connections per display
//! name so duplicate sessions can be detected.

use std::time::{Duration, Instant};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque per-connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Generate a new random connection id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque room identifier, as supplied by clients on `join-room`.
pub type RoomId = String;

/// Authenticated user identifier, supplied optionally at join time.
pub type UserId = String;

/// The room-level identity backed by a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub room_id: RoomId,
    pub user_id: Option<UserId>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    pub last_seen: chrono::DateTime<chrono::Utc>,
    pub online: bool,
    pub muted: bool,
    pub video_off: bool,
    pub host: bool,
    pub raised_hand: bool,
}

impl Participant {
    /// Construct a freshly-joined participant record.
    #[must_use]
    pub fn new(connection_id: ConnectionId, display_name: String, room_id: RoomId, user_id: Option<UserId>) -> Self {
        let now = chrono::Utc::now();
        Self {
            connection_id,
            display_name,
            room_id,
            user_id,
            joined_at: now,
            last_seen: now,
            online: true,
            muted: false,
            video_off: false,
            host: false,
            raised_hand: false,
        }
    }
}

/// Per-connection adaptive-ping health record. Written only by the health
/// monitor, for its own connection.
#[derive(Debug, Clone)]
pub struct ConnectionHealth {
    pub connected_at: Instant,
    pub last_ping: Instant,
    pub ping_count: u64,
    pub reconnect_count: u64,
    pub healthy: bool,
    pub latest_latency: Option<Duration>,
    pub interval: Duration,
    /// Send-time of the outstanding server ping, if one hasn't been
    /// answered yet. Cleared when the matching client `ping` arrives.
    pub pending_ping_sent_at: Option<Instant>,
}

impl ConnectionHealth {
    #[must_use]
    pub fn new(interval_start: Duration) -> Self {
        let now = Instant::now();
        Self {
            connected_at: now,
            last_ping: now,
            ping_count: 0,
            reconnect_count: 0,
            healthy: true,
            latest_latency: None,
            interval: interval_start,
            pending_ping_sent_at: None,
        }
    }
}

/// A named set of participants sharing signaling fan-out and host scope.
///
/// `members` is insertion-ordered (an `IndexSet`, not a `HashSet`): host
/// promotion on disconnect picks the first remaining member in join order,
/// and that only holds if iteration order is join order rather than
/// whatever a `RandomState`-keyed hash happens to produce.
#[derive(Debug, Default)]
pub struct RoomRecord {
    pub members: IndexSet<ConnectionId>,
}

impl RoomRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_round_trips_through_json() {
        let id = ConnectionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn new_participant_is_unmuted_non_host() {
        let p = Participant::new(ConnectionId::new(), "Alice".into(), "R1".into(), None);
        assert!(!p.host);
        assert!(!p.muted);
        assert!(!p.raised_hand);
        assert!(p.online);
    }

    #[test]
    fn room_record_starts_empty() {
        let room = RoomRecord::new();
        assert!(room.is_empty());
    }
}
