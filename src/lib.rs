//! Cachette - A key-value cache facade
//!
//! One synchronous cache contract backed by either an embedded RocksDB
//! store or a pooled Redis connection, chosen once from configuration.

pub mod cache;
pub mod config;
pub mod error;
pub mod store;
pub mod tasks;

pub use cache::{Cache, CacheExt, Value};
pub use config::Config;
pub use error::{CacheError, Result};
pub use store::open_cache;
pub use tasks::spawn_maintenance_task;
