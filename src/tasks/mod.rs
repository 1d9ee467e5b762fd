//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is open.
//!
//! # Tasks
//! - Maintenance: runs the backend's housekeeping (compaction for the
//!   embedded store) at a configured interval

mod maintenance;

pub use maintenance::spawn_maintenance_task;
