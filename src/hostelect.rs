//! Host-Election State Machine
//!
//! Tracks exactly one host per non-empty room and mediates the transitions
//! that change it: election on join, creator-reclaim, explicit transfer,
//! and promotion on the host's disconnect. The host-map itself is owned by
//! this module; the Event Router calls into it rather than touching a host
//! entry directly, so every transition goes through one place.

use crate::events::{HostFlag, ServerEvent};
use crate::model::{ConnectionId, RoomId};
use crate::registry::{ConnectionRegistry, RoomRegistry};

/// The outcome of a host-election decision: who, if anyone, became host,
/// and the event(s) the caller should fan out.
pub struct Election {
    pub new_host: Option<ConnectionId>,
    pub previous_host: Option<ConnectionId>,
}

/// Decide whether a joiner should become host:
/// an empty (post-cleanup) room, a room whose host entry points to a dead
/// participant, or a joiner whose authenticated user id matches the room's
/// creator while a different host currently holds it.
pub fn elect_on_join(
    rooms: &RoomRegistry,
    connections: &ConnectionRegistry,
    room_id: &RoomId,
    joiner: ConnectionId,
    joiner_user_id: Option<&str>,
) -> Election {
    let current_host = rooms.host_of(room_id);
    let host_is_live = current_host
        .map(|h| connections.get(h).is_some())
        .unwrap_or(false);

    if !host_is_live {
        rooms.set_host(room_id, joiner);
        return Election {
            new_host: Some(joiner),
            previous_host: current_host,
        };
    }

    let creator = rooms.creator_of(room_id);
    let joiner_is_creator = match (&creator, joiner_user_id) {
        (Some(c), Some(u)) => c == u,
        _ => false,
    };
    if joiner_is_creator && current_host != Some(joiner) {
        rooms.set_host(room_id, joiner);
        return Election {
            new_host: Some(joiner),
            previous_host: current_host,
        };
    }

    Election {
        new_host: None,
        previous_host: current_host,
    }
}

/// Explicit transfer: only the current host may initiate it, and only to a
/// participant in the same room.
pub fn transfer(
    rooms: &RoomRegistry,
    room_id: &RoomId,
    caller: ConnectionId,
    target: ConnectionId,
) -> Option<Election> {
    if rooms.host_of(room_id) != Some(caller) {
        return None;
    }
    if !rooms.members(room_id).contains(&target) {
        return None;
    }
    rooms.set_host(room_id, target);
    Some(Election {
        new_host: Some(target),
        previous_host: Some(caller),
    })
}

/// Promote the first remaining member, in join order, when the host
/// disconnects from a non-empty room. `RoomRegistry::members` returns its
/// `IndexSet` in insertion order, so "first remaining" here really is the
/// earliest surviving joiner, not an artifact of hashing.
pub fn promote_on_host_disconnect(
    rooms: &RoomRegistry,
    room_id: &RoomId,
    departing_host: ConnectionId,
) -> Option<Election> {
    let remaining = rooms.members(room_id);
    let next = remaining.into_iter().find(|id| *id != departing_host)?;
    rooms.set_host(room_id, next);
    Some(Election {
        new_host: Some(next),
        previous_host: Some(departing_host),
    })
}

/// Build the `host-changed` broadcast for an election outcome, given the
/// room's current membership and display names.
pub fn host_changed_event(
    connections: &ConnectionRegistry,
    room_id: &RoomId,
    rooms: &RoomRegistry,
    election: &Election,
) -> Option<ServerEvent> {
    let new_host = election.new_host?;
    let new_host_name = connections.get(new_host)?.display_name;
    let participants = rooms
        .members(room_id)
        .into_iter()
        .map(|id| HostFlag { id, is_host: id == new_host })
        .collect();
    Some(ServerEvent::HostChanged {
        new_host_id: new_host,
        new_host_name,
        previous_host_id: election.previous_host,
        participants,
    })
}
