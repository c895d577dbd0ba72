//! Status API binary.
//!
//! Serves read-only REST projections of the persisted wallet state.
//! Runs alongside the scheduler-driven cycle runner and never writes.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use midas::config::AppConfig;
use midas::server;
use midas::server::routes::ApiState;
use midas::storage::StateStore;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    let state = Arc::new(ApiState {
        store: StateStore::new(&cfg.storage.state_dir),
        wallet: cfg.wallet.name.clone(),
    });

    info!(wallet = %cfg.wallet.name, port = cfg.server.port, "Starting status API");
    server::serve(state, cfg.server.port).await
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("midas=info"));
    fmt().with_env_filter(env_filter).with_target(true).init();
}
