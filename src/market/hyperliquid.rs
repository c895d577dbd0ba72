//! Hyperliquid market data integration.
//!
//! Read-only client for the Hyperliquid `/info` endpoint: mid prices and
//! per-asset contexts for live quotes, candle snapshots for the historical
//! close series. All requests are JSON POSTs to a single URL.
//!
//! API docs: https://hyperliquid.gitbook.io/hyperliquid-docs
//! Mainnet: https://api.hyperliquid.xyz — Testnet: https://api.hyperliquid-testnet.xyz

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::MarketDataProvider;
use crate::types::{BotError, PriceInfo};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const VENUE_NAME: &str = "hyperliquid";

/// High/low fallback spread when the venue supplies no day range.
const RANGE_ESTIMATE_PCT: f64 = 0.02;

// ---------------------------------------------------------------------------
// API response types (Hyperliquid JSON → Rust)
// ---------------------------------------------------------------------------

/// Element 0 of the `metaAndAssetCtxs` response.
#[derive(Debug, Deserialize)]
struct Meta {
    universe: Vec<UniverseEntry>,
}

#[derive(Debug, Deserialize)]
struct UniverseEntry {
    name: String,
}

/// Element 1 of the `metaAndAssetCtxs` response, index-aligned with the
/// universe. Prices arrive as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetCtx {
    #[serde(default)]
    mark_px: Option<String>,
    #[serde(default)]
    mid_px: Option<String>,
    #[serde(default)]
    prev_day_px: Option<String>,
}

/// One candle from a `candleSnapshot` request.
#[derive(Debug, Deserialize)]
struct Candle {
    /// Open time in ms since epoch.
    t: i64,
    /// Close price as a decimal string.
    c: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Hyperliquid market data client.
pub struct HyperliquidProvider {
    http: Client,
    info_url: String,
}

impl HyperliquidProvider {
    /// Create a new provider against the given API base URL.
    pub fn new(api_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent("MIDAS/0.1.0 (paper-trading-agent)")
            .build()
            .context("Failed to build HTTP client for Hyperliquid")?;

        Ok(Self {
            http,
            info_url: format!("{}/info", api_url.trim_end_matches('/')),
        })
    }

    async fn post_info<T: serde::de::DeserializeOwned>(
        &self,
        body: serde_json::Value,
    ) -> Result<T> {
        let resp = self
            .http
            .post(&self.info_url)
            .json(&body)
            .send()
            .await
            .context("Hyperliquid info request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BotError::Venue {
                venue: VENUE_NAME.to_string(),
                message: format!("HTTP {status}: {text}"),
            }
            .into());
        }

        resp.json::<T>()
            .await
            .context("Failed to parse Hyperliquid info response")
    }
}

#[async_trait]
impl MarketDataProvider for HyperliquidProvider {
    async fn get_price(&self, symbol: &str) -> Result<PriceInfo> {
        let (meta, ctxs): (Meta, Vec<AssetCtx>) =
            self.post_info(json!({"type": "metaAndAssetCtxs"})).await?;

        let idx = meta
            .universe
            .iter()
            .position(|u| u.name == symbol)
            .ok_or_else(|| BotError::SymbolNotFound(symbol.to_string()))?;

        let ctx = ctxs
            .get(idx)
            .ok_or_else(|| BotError::Venue {
                venue: VENUE_NAME.to_string(),
                message: format!("asset context missing for {symbol} (index {idx})"),
            })?;

        let price = parse_px(ctx.mid_px.as_deref().or(ctx.mark_px.as_deref()))
            .ok_or_else(|| BotError::Venue {
                venue: VENUE_NAME.to_string(),
                message: format!("no usable price for {symbol}"),
            })?;

        let prev_day = parse_px(ctx.prev_day_px.as_deref());
        let change_24h = change_pct(price, prev_day);
        if prev_day.is_none() {
            warn!(symbol, "No previous-day price; 24h change defaults to 0");
        }

        debug!(symbol, price, change_24h, "Quote fetched");

        Ok(PriceInfo {
            symbol: symbol.to_string(),
            price,
            change_24h,
            high_24h: price * (1.0 + RANGE_ESTIMATE_PCT),
            low_24h: price * (1.0 - RANGE_ESTIMATE_PCT),
        })
    }

    async fn get_historical_closes(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<f64>> {
        let step_ms = interval_ms(interval).ok_or_else(|| BotError::Venue {
            venue: VENUE_NAME.to_string(),
            message: format!("unsupported candle interval: {interval}"),
        })?;

        let end = Utc::now().timestamp_millis();
        let start = end - step_ms * limit as i64;

        let candles: Vec<Candle> = self
            .post_info(json!({
                "type": "candleSnapshot",
                "req": {"coin": symbol, "interval": interval, "startTime": start, "endTime": end},
            }))
            .await?;

        let mut candles = candles;
        candles.sort_by_key(|c| c.t);

        let closes: Vec<f64> = candles
            .iter()
            .filter_map(|c| c.c.parse::<f64>().ok())
            .collect();

        debug!(symbol, interval, count = closes.len(), "Candles fetched");

        // Trailing `limit` closes, oldest first.
        let start_idx = closes.len().saturating_sub(limit);
        Ok(closes[start_idx..].to_vec())
    }

    fn venue_name(&self) -> &str {
        VENUE_NAME
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_px(px: Option<&str>) -> Option<f64> {
    px.and_then(|s| s.parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p > 0.0)
}

/// 24h percentage change against the previous-day price. Zero when the
/// reference price is unavailable.
fn change_pct(price: f64, prev_day: Option<f64>) -> f64 {
    match prev_day {
        Some(prev) if prev > 0.0 => (price - prev) / prev * 100.0,
        _ => 0.0,
    }
}

fn interval_ms(interval: &str) -> Option<i64> {
    match interval {
        "1m" => Some(60_000),
        "5m" => Some(300_000),
        "15m" => Some(900_000),
        "1h" => Some(3_600_000),
        "4h" => Some(14_400_000),
        "1d" => Some(86_400_000),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px(Some("65432.5")), Some(65432.5));
        assert_eq!(parse_px(Some("0")), None);
        assert_eq!(parse_px(Some("-1.5")), None);
        assert_eq!(parse_px(Some("abc")), None);
        assert_eq!(parse_px(None), None);
    }

    #[test]
    fn test_change_pct() {
        assert!((change_pct(102.0, Some(100.0)) - 2.0).abs() < 1e-10);
        assert!((change_pct(95.0, Some(100.0)) + 5.0).abs() < 1e-10);
        assert_eq!(change_pct(100.0, None), 0.0);
        assert_eq!(change_pct(100.0, Some(0.0)), 0.0);
    }

    #[test]
    fn test_interval_ms() {
        assert_eq!(interval_ms("1h"), Some(3_600_000));
        assert_eq!(interval_ms("1d"), Some(86_400_000));
        assert_eq!(interval_ms("2w"), None);
    }

    #[test]
    fn test_meta_and_ctxs_deserializes() {
        let body = r#"[
            {"universe": [{"name": "BTC", "szDecimals": 5}, {"name": "ETH", "szDecimals": 4}]},
            [
                {"funding": "0.0000125", "markPx": "65000.0", "midPx": "65001.5", "prevDayPx": "64000.0"},
                {"funding": "0.00001", "markPx": "3200.0", "prevDayPx": "3300.0"}
            ]
        ]"#;
        let (meta, ctxs): (Meta, Vec<AssetCtx>) = serde_json::from_str(body).unwrap();
        assert_eq!(meta.universe.len(), 2);
        assert_eq!(meta.universe[0].name, "BTC");
        assert_eq!(ctxs[0].mid_px.as_deref(), Some("65001.5"));
        assert_eq!(ctxs[1].mid_px, None);
        assert_eq!(ctxs[1].mark_px.as_deref(), Some("3200.0"));
    }

    #[test]
    fn test_candles_deserialize_and_sort() {
        let body = r#"[
            {"t": 200, "T": 260, "s": "BTC", "i": "1h", "o": "1.0", "c": "2.0", "h": "2.5", "l": "0.5", "v": "10", "n": 3},
            {"t": 100, "T": 160, "s": "BTC", "i": "1h", "o": "0.9", "c": "1.0", "h": "1.1", "l": "0.8", "v": "12", "n": 4}
        ]"#;
        let mut candles: Vec<Candle> = serde_json::from_str(body).unwrap();
        candles.sort_by_key(|c| c.t);
        assert_eq!(candles[0].c, "1.0");
        assert_eq!(candles[1].c, "2.0");
    }

    #[test]
    fn test_provider_builds_info_url() {
        let p = HyperliquidProvider::new("https://api.hyperliquid-testnet.xyz/", 30).unwrap();
        assert_eq!(p.info_url, "https://api.hyperliquid-testnet.xyz/info");
        assert_eq!(p.venue_name(), "hyperliquid");
    }
}
