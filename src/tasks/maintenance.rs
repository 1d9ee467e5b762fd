//! Maintenance Task
//!
//! Background task that periodically runs the backend's housekeeping.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::Cache;

/// Spawns a background task that periodically calls
/// [`Cache::run_maintenance`].
///
/// Maintenance is blocking engine work, so each run goes through
/// `spawn_blocking` instead of stalling the runtime.
///
/// # Arguments
/// * `cache` - Shared cache handle
/// * `interval_secs` - Interval in seconds between runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = open_cache(&config)?;
/// let handle = spawn_maintenance_task(cache.clone(), 86_400);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_maintenance_task(cache: Arc<dyn Cache>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting {} cache maintenance task with interval of {} seconds",
            cache.backend_name(),
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let worker = Arc::clone(&cache);
            match tokio::task::spawn_blocking(move || worker.run_maintenance()).await {
                Ok(Ok(())) => debug!("Cache maintenance finished"),
                Ok(Err(e)) => error!("Cache maintenance failed: {}", e),
                Err(e) => error!("Cache maintenance task panicked: {}", e),
            }
        }
    })
}
