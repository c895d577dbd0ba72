//! MIDAS — Autonomous AI Paper-Trading Agent
//!
//! Entry point for the cycle runner. Loads configuration, initialises
//! structured logging, then executes exactly one trading cycle and exits:
//! an external scheduler provides periodicity. Nonzero exit on any fatal
//! error so the scheduler can alert or retry.

use anyhow::Result;
use tracing::{error, info, warn};

use midas::advisor::anthropic::AnthropicAdvisor;
use midas::advisor::openai::OpenAiAdvisor;
use midas::advisor::AdvisorClient;
use midas::config::AppConfig;
use midas::engine::{CycleOutcome, CycleRunner};
use midas::market::hyperliquid::HyperliquidProvider;
use midas::storage::StateStore;

const BANNER: &str = r#"
 __  __ ___ ____    _    ____
|  \/  |_ _|  _ \  / \  / ___|
| |\/| || || | | |/ _ \ \___ \
| |  | || || |_| / ___ \ ___) |
|_|  |_|___|____/_/   \_\____/

  Market Intelligence Driven Advisory System
  v0.1.0 — Paper Trading
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML (path from argv[1], default config.toml)
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        wallet = %cfg.wallet.name,
        config = %config_path,
        state_dir = %cfg.storage.state_dir,
        pairs = ?cfg.wallet.trading_pairs,
        initial_capital = %cfg.wallet.initial_capital,
        "MIDAS starting up (paper trading — no real funds at risk)"
    );

    // -- Initialise components -------------------------------------------

    let provider = HyperliquidProvider::new(&cfg.market.api_url, cfg.market.request_timeout_secs)?;

    let api_key = std::env::var(&cfg.advisor.api_key_env).unwrap_or_default();
    if api_key.is_empty() {
        warn!(
            env = %cfg.advisor.api_key_env,
            "No advisor API key configured — every pair will fail advisor analysis"
        );
    }

    let advisor: Box<dyn AdvisorClient> = match cfg.advisor.provider.as_str() {
        "openai" => {
            info!(model = %cfg.advisor.model, "Using OpenAI-compatible advisor");
            Box::new(OpenAiAdvisor::new(
                api_key,
                Some(cfg.advisor.model.clone()),
                cfg.advisor.max_tokens,
                cfg.advisor.request_timeout_secs,
                cfg.advisor.api_url.clone(),
            )?)
        }
        "anthropic" => {
            info!(model = %cfg.advisor.model, "Using Anthropic advisor");
            Box::new(AnthropicAdvisor::new(
                api_key,
                Some(cfg.advisor.model.clone()),
                cfg.advisor.max_tokens,
                cfg.advisor.request_timeout_secs,
            )?)
        }
        other => {
            warn!(provider = other, "Unknown advisor provider, defaulting to Anthropic");
            Box::new(AnthropicAdvisor::new(
                api_key,
                Some(cfg.advisor.model.clone()),
                cfg.advisor.max_tokens,
                cfg.advisor.request_timeout_secs,
            )?)
        }
    };

    let store = StateStore::new(&cfg.storage.state_dir);

    // -- Run one cycle -----------------------------------------------------

    let runner = CycleRunner::new(&cfg, &provider, &*advisor, &store);

    match runner.run().await {
        Ok(report) => {
            info!(
                outcome = %report.outcome,
                pairs = report.pairs_analyzed,
                capital = %report.state.current_capital,
                total_trades = report.state.total_trades,
                daily = report.state.daily_trades,
                "Execution completed successfully"
            );
            if report.outcome == CycleOutcome::TradeRecorded {
                if let Some(trade) = &report.trade {
                    info!(trade = %trade, "Recorded trade");
                }
            }
            Ok(())
        }
        Err(e) => {
            error!(error = ?e, "Fatal error during cycle");
            Err(e)
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("midas=info"));

    let json_logging = std::env::var("MIDAS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
