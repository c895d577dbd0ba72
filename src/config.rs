//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub wallet: WalletConfig,
    pub market: MarketConfig,
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WalletConfig {
    pub name: String,
    pub initial_capital: Decimal,
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: u32,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_trading_pairs")]
    pub trading_pairs: Vec<String>,
    /// Fraction of current capital risked per trade (0.01 = 1%).
    #[serde(default = "default_risk_pct")]
    pub risk_pct: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    #[serde(default = "default_market_api_url")]
    pub api_url: String,
    #[serde(default = "default_candle_interval")]
    pub candle_interval: String,
    /// Number of historical closes fetched for the indicator window.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdvisorConfig {
    /// "anthropic" | "openai"
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Base URL override for OpenAI-compatible gateways.
    #[serde(default)]
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_report_dir")]
    pub dir: String,
    #[serde(default = "default_report_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: default_report_dir(),
            interval_secs: default_report_interval_secs(),
        }
    }
}

fn default_max_daily_trades() -> u32 {
    12
}
fn default_min_confidence() -> f64 {
    60.0
}
fn default_trading_pairs() -> Vec<String> {
    vec!["BTC".into(), "ETH".into(), "SOL".into()]
}
fn default_risk_pct() -> Decimal {
    rust_decimal_macros::dec!(0.01)
}
fn default_market_api_url() -> String {
    "https://api.hyperliquid-testnet.xyz".to_string()
}
fn default_candle_interval() -> String {
    "1h".to_string()
}
fn default_history_limit() -> usize {
    50
}
fn default_rsi_window() -> usize {
    14
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_tokens() -> u32 {
    512
}
fn default_state_dir() -> String {
    "state".to_string()
}
fn default_server_port() -> u16 {
    5000
}
fn default_report_dir() -> String {
    "monitoring_reports".to_string()
}
fn default_report_interval_secs() -> u64 {
    3600
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
