//! Lifecycle Supervisor and Signal Hook: the timers and OS-signal handling
//! that run orthogonal to per-connection event dispatch.

pub mod shutdown;
pub mod supervisor;
