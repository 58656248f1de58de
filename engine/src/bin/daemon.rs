//! bpmd - bulk process manager daemon
//!
//! Opens the state database, reconciles recorded projects against the OS and
//! serves the REST control API until SIGINT or SIGTERM.

#[path = "daemon/config.rs"]
mod config;

use anyhow::{Context, Result};
use bpm_engine::adapters::rest::{build_router, serve_on_tcp};
use bpm_engine::application::Application;
use bpm_engine::infrastructure::{SqliteStateStore, TokioProcessExecutor};
use config::DaemonConfig;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = DaemonConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    config.validate().map_err(anyhow::Error::msg)?;
    let addr = config.socket_addr().map_err(anyhow::Error::msg)?;

    info!(
        db = %config.db_path.display(),
        log_dir = %config.log_dir.display(),
        interpreter = %config.interpreter,
        stop_on_exit = config.stop_on_exit,
        "Starting bulk process manager daemon"
    );

    let store = SqliteStateStore::open(&config.db_path)
        .with_context(|| format!("failed to open state database {}", config.db_path.display()))?;
    let executor = Arc::new(TokioProcessExecutor::new());
    let app = Arc::new(Application::new(
        Arc::new(store),
        executor,
        config.supervisor_config(),
    ));

    // projects left running by a previous daemon are picked up, dead ones corrected
    let states = app
        .status_all()
        .await
        .context("failed to read recorded project states")?;
    let running = states.values().filter(|s| s.is_running()).count();
    info!(projects = states.len(), running = running, "Recorded projects reconciled");

    serve_on_tcp(addr, build_router(app.clone()), shutdown_signal())
        .await
        .context("REST server failed")?;

    if config.stop_on_exit {
        info!("Stopping supervised projects");
        app.stop_all().await;
    } else {
        info!("Leaving supervised projects running");
    }

    app.close().await.context("failed to close state database")?;
    info!("Daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot install SIGTERM handler, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received");
}
