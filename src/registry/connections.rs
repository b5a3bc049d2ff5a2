//! Connection Registry
//!
//! CRUD over participant records keyed by connection id, and session-index
//! maintenance keyed by display name. The session index is how the join
//! handler detects and preempts a session collision: a new
//! connection claiming a display name already live elsewhere.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::model::{ConnectionId, Participant, RoomId};

/// CRUD over participant records, plus a display-name → live-connections
/// index used to detect session collisions.
#[derive(Default)]
pub struct ConnectionRegistry {
    participants: DashMap<ConnectionId, Participant>,
    by_name: DashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of live participants across all rooms.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn get(&self, conn_id: ConnectionId) -> Option<Participant> {
        self.participants.get(&conn_id).map(|e| e.value().clone())
    }

    /// Connection ids currently registered under a display name.
    #[must_use]
    pub fn by_display_name(&self, name: &str) -> Vec<ConnectionId> {
        self.by_name
            .get(name)
            .map(|e| e.value().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Insert a new participant record and index it by display name.
    ///
    /// Callers are expected to have already resolved session collisions
    /// before calling this — it does not itself preempt anything.
    pub fn insert(&self, participant: Participant) {
        let name = participant.display_name.clone();
        let conn_id = participant.connection_id;
        self.participants.insert(conn_id, participant);
        self.by_name.entry(name).or_default().insert(conn_id);
    }

    /// Remove a participant record, scrubbing it from the session index.
    /// Returns the removed record, if any.
    pub fn remove(&self, conn_id: ConnectionId) -> Option<Participant> {
        let removed = self.participants.remove(&conn_id).map(|(_, p)| p);
        if let Some(ref p) = removed {
            if let Some(mut set) = self.by_name.get_mut(&p.display_name) {
                set.remove(&conn_id);
                if set.is_empty() {
                    drop(set);
                    self.by_name.remove(&p.display_name);
                }
            }
        }
        removed
    }

    /// Apply a mutation to a participant in place. Returns `false` if the
    /// connection has no record.
    pub fn update<F: FnOnce(&mut Participant)>(&self, conn_id: ConnectionId, f: F) -> bool {
        if let Some(mut entry) = self.participants.get_mut(&conn_id) {
            f(entry.value_mut());
            true
        } else {
            false
        }
    }

    /// Change a participant's display name, keeping the session index
    /// consistent (invariant 4): the old name's index entry is scrubbed and
    /// the new one populated, same as `insert`/`remove` would.
    pub fn rename(&self, conn_id: ConnectionId, new_name: String) -> bool {
        let Some(mut entry) = self.participants.get_mut(&conn_id) else {
            return false;
        };
        let old_name = std::mem::replace(&mut entry.value_mut().display_name, new_name.clone());
        drop(entry);
        if old_name != new_name {
            if let Some(mut set) = self.by_name.get_mut(&old_name) {
                set.remove(&conn_id);
                if set.is_empty() {
                    drop(set);
                    self.by_name.remove(&old_name);
                }
            }
            self.by_name.entry(new_name).or_default().insert(conn_id);
        }
        true
    }

    /// All participants currently attributed to a room.
    #[must_use]
    pub fn in_room(&self, room_id: &RoomId) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|e| &e.value().room_id == room_id)
            .map(|e| e.value().clone())
            .collect()
    }

    /// All connection ids with a live participant record, used for the
    /// shutdown broadcast.
    #[must_use]
    pub fn all_ids(&self) -> Vec<ConnectionId> {
        self.participants.iter().map(|e| *e.key()).collect()
    }
}
