//! Cachette - cache maintenance daemon
//!
//! Opens the configured cache backend and keeps its scheduled maintenance
//! running until the process is asked to stop.

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cachette::{open_cache, spawn_maintenance_task, Config};

/// Main entry point for the cachette daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the configured cache backend
/// 4. Start the background maintenance task
/// 5. Wait for SIGINT/SIGTERM and stop the task
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cachette=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cachette");

    let config = Config::from_env().context("loading cache configuration")?;
    info!(
        "Configuration loaded: backend={:?}, maintenance_interval={}s",
        config.backend, config.maintenance_interval
    );

    let cache = open_cache(&config).context("opening cache backend")?;

    let maintenance_handle = spawn_maintenance_task(cache.clone(), config.maintenance_interval);
    info!("Background maintenance task started");

    shutdown_signal().await?;

    maintenance_handle.abort();
    warn!("Maintenance task aborted");

    drop(cache);
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("installing SIGTERM handler")?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("installing Ctrl+C handler")?;
                info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.context("installing Ctrl+C handler")?;
        info!("Received Ctrl+C, initiating shutdown...");
    }

    Ok(())
}
