//! Background Tasks Module
//!
//! Maintenance that runs alongside normal cache use.
//!
//! # Tasks
//! - Expired sweep: removes stale entries at a configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
