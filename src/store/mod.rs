//! Store Module
//!
//! Concrete cache backends and the constructor that picks one from
//! configuration.

mod embedded;
mod networked;

use std::sync::Arc;

use tracing::info;

use crate::cache::Cache;
use crate::config::{BackendKind, Config};
use crate::error::Result;

pub use embedded::EmbeddedCache;
pub use networked::NetworkedCache;

/// Opens the backend selected by `config`.
///
/// Call once at startup and share the handle with every component that
/// caches.
pub fn open_cache(config: &Config) -> Result<Arc<dyn Cache>> {
    let cache: Arc<dyn Cache> = match config.backend {
        BackendKind::Embedded => Arc::new(EmbeddedCache::open(&config.embedded.path)?),
        BackendKind::Networked => Arc::new(NetworkedCache::connect(&config.networked)?),
    };
    info!("Cache backend '{}' ready", cache.backend_name());
    Ok(cache)
}
