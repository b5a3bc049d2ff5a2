//! The central coordination point: owns the registries, health monitor, and
//! transport handle the Event Router mutates and reads. Every handler is
//! threaded through a single `Arc<Engine>`, the same way a server struct
//! wires its connection handlers through one shared state.

use std::sync::Arc;

use crate::config::Config;
use crate::events::ServerEvent;
use crate::health::HealthMonitor;
use crate::model::{ConnectionId, RoomId};
use crate::registry::{ConnectionRegistry, RoomRegistry};
use crate::transport::Transport;

pub struct Engine {
    pub config: Config,
    pub connections: ConnectionRegistry,
    pub rooms: RoomRegistry,
    pub health: Arc<HealthMonitor>,
    pub transport: Arc<dyn Transport>,
}

impl Engine {
    #[must_use]
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            config,
            connections: ConnectionRegistry::new(),
            rooms: RoomRegistry::new(),
            health: HealthMonitor::new(),
            transport,
        })
    }

    /// Emit to every member of a room.
    pub async fn emit_to_room(&self, room_id: &RoomId, event: ServerEvent) {
        for member in self.rooms.members(room_id) {
            let _ = self.transport.emit(member, event.clone()).await;
        }
    }

    /// Emit to every member of a room except one connection.
    pub async fn emit_to_room_except(&self, room_id: &RoomId, except: ConnectionId, event: ServerEvent) {
        for member in self.rooms.members(room_id) {
            if member == except {
                continue;
            }
            let _ = self.transport.emit(member, event.clone()).await;
        }
    }

    /// Emit to every connection with a live participant record, used by the
    /// shutdown broadcast.
    pub async fn broadcast_all(&self, event: ServerEvent) {
        for conn_id in self.connections.all_ids() {
            let _ = self.transport.emit(conn_id, event.clone()).await;
        }
    }
}
