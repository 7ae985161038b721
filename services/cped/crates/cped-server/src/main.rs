//! pcloud-cped entry point.
//!
//! Initialises tracing, loads configuration from `PCLOUD_CPED_*`
//! environment variables, starts the Unix-socket listener and serves
//! Cloud Policy Engine method calls from the message bus until Ctrl-C.

mod agent;
mod init_jobs;
mod listener;
mod state;

use anyhow::{Context, Result};
use pcloud_common::CpedServerConfig;
use tracing_subscriber::EnvFilter;

use crate::init_jobs::Systemctl;
use crate::state::BusState;

// ===================================================================
// Entry point
// ===================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialise tracing with RUST_LOG env filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("pcloud-cped starting");

    // 2. Load configuration from PCLOUD_CPED_* env vars.
    let config: CpedServerConfig = envy::prefixed("PCLOUD_CPED_")
        .from_env()
        .context("failed to load config from PCLOUD_CPED_* env vars")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid PCLOUD_CPED_* configuration")?;

    tracing::info!(
        socket = %config.socket_path.display(),
        redis_url = %config.redis_url,
        init_unit = %config.init_unit,
        agent_id = %config.agent_id,
        heartbeat_secs = config.heartbeat_secs,
        "configuration loaded",
    );

    // 3. Listener.
    let unix = listener::bind(&config.socket_path)?;
    let listener_task = tokio::spawn(listener::serve(unix));

    // 4. Bus agent.
    let state = BusState::new(&config.redis_url)
        .await
        .context("failed to initialise bus connection")?;
    state.register(&agent::agent_info(&config.agent_id)).await?;

    tokio::select! {
        () = agent::run(&state, &config, &Systemctl) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    // 5. Shutdown.
    listener_task.abort();
    if let Err(e) = state.deregister(&config.agent_id).await {
        tracing::warn!(error = %e, "deregister failed");
    }
    if let Err(e) = std::fs::remove_file(&config.socket_path) {
        tracing::debug!(error = %e, "socket cleanup failed");
    }
    Ok(())
}
