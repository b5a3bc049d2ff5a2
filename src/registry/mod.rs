//! Process-wide registries: connections, rooms, and the host/creator maps
//! that sit alongside them. These are the shared stores named in the
//! concurrency model — only the Event Router and Lifecycle Supervisor
//! mutate them; the Transport Adapter only ever reads.

pub mod connections;
pub mod rooms;

pub use connections::ConnectionRegistry;
pub use rooms::RoomRegistry;
