//! Room Registry
//!
//! CRUD over room id → set-of-connection-ids, plus the host-map and
//! creator-map that ride alongside it. A room is created lazily on first
//! join and destroyed the moment its member set becomes empty (invariant 5
//! in the data model).

use dashmap::DashMap;

use crate::model::{ConnectionId, RoomId, RoomRecord};

/// Rooms plus the auxiliary host-id and creator-id maps.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, RoomRecord>,
    host: DashMap<RoomId, ConnectionId>,
    creator: DashMap<RoomId, String>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current member connection ids for a room in join order, empty if the
    /// room doesn't exist. Join order, not hash order — `RoomRecord.members`
    /// is an `IndexSet` for exactly this reason.
    #[must_use]
    pub fn members(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|r| r.members.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn size(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map(|r| r.members.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn exists(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Add a member, creating the room record if this is the first join.
    pub fn add_member(&self, room_id: &RoomId, conn_id: ConnectionId) {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(RoomRecord::new)
            .members
            .insert(conn_id);
    }

    /// Remove a member. Deletes the room (and its host/creator entries) if
    /// that empties it, preserving invariant 5. Uses `shift_remove` rather
    /// than `swap_remove` so the remaining members keep their original join
    /// order — host promotion depends on that order being real.
    pub fn remove_member(&self, room_id: &RoomId, conn_id: ConnectionId) {
        let mut delete_room = false;
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.members.shift_remove(&conn_id);
            delete_room = room.members.is_empty();
        }
        if delete_room {
            self.rooms.remove(room_id);
            self.host.remove(room_id);
            self.creator.remove(room_id);
        }
    }

    #[must_use]
    pub fn host_of(&self, room_id: &RoomId) -> Option<ConnectionId> {
        self.host.get(room_id).map(|e| *e.value())
    }

    pub fn set_host(&self, room_id: &RoomId, conn_id: ConnectionId) {
        self.host.insert(room_id.clone(), conn_id);
    }

    pub fn clear_host(&self, room_id: &RoomId) {
        self.host.remove(room_id);
    }

    #[must_use]
    pub fn creator_of(&self, room_id: &RoomId) -> Option<String> {
        self.creator.get(room_id).map(|e| e.value().clone())
    }

    /// Record the creator id for a room, if not already set. A room's
    /// creator is fixed at its first join with a supplied user id.
    pub fn set_creator_if_absent(&self, room_id: &RoomId, user_id: String) {
        self.creator.entry(room_id.clone()).or_insert(user_id);
    }

    /// All room ids currently tracked (used by the lifecycle supervisor's
    /// health-summary log).
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_is_created_lazily_on_first_add() {
        let registry = RoomRegistry::new();
        let room = "R1".to_string();
        assert!(!registry.exists(&room));
        registry.add_member(&room, ConnectionId::new());
        assert!(registry.exists(&room));
        assert_eq!(registry.size(&room), 1);
    }

    #[test]
    fn room_is_destroyed_when_emptied() {
        let registry = RoomRegistry::new();
        let room = "R1".to_string();
        let conn = ConnectionId::new();
        registry.add_member(&room, conn);
        registry.set_host(&room, conn);
        registry.remove_member(&room, conn);
        assert!(!registry.exists(&room));
        assert!(registry.host_of(&room).is_none());
    }

    #[test]
    fn creator_is_fixed_on_first_set() {
        let registry = RoomRegistry::new();
        let room = "R1".to_string();
        registry.set_creator_if_absent(&room, "user-a".into());
        registry.set_creator_if_absent(&room, "user-b".into());
        assert_eq!(registry.creator_of(&room), Some("user-a".into()));
    }
}
