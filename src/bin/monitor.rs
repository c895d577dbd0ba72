//! Monitoring report binary.
//!
//! Long-lived: renders a wallet report from the persisted state and the
//! typed event log on a fixed interval, writing a timestamped file plus
//! `latest_report.txt`. Ctrl+C stops it cleanly.

use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use midas::config::AppConfig;
use midas::report;
use midas::storage::StateStore;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    let store = StateStore::new(&cfg.storage.state_dir);
    let report_dir = PathBuf::from(&cfg.report.dir);

    info!(
        wallet = %cfg.wallet.name,
        dir = %report_dir.display(),
        interval_secs = cfg.report.interval_secs,
        "Monitor started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.report.interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = generate(&store, &cfg.wallet.name, &report_dir) {
                    error!(error = %e, "Report generation failed — retrying next interval");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    Ok(())
}

fn generate(store: &StateStore, wallet: &str, dir: &std::path::Path) -> Result<()> {
    let state = store.load(wallet)?;
    let events = store.read_events(wallet)?;

    let now = Utc::now();
    let text = report::render(state.as_ref(), &events, now);
    let path = report::write_report(dir, &text, now)?;

    info!(path = %path.display(), "Report written");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("midas=info"));
    fmt().with_env_filter(env_filter).with_target(true).init();
}
