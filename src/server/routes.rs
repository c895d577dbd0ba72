//! Status API route handlers.
//!
//! All endpoints are read-only JSON projections over the persisted wallet
//! state document, loaded fresh on every request so the API process never
//! holds state the cycle runner owns.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

use crate::storage::StateStore;
use crate::types::{BotState, OpenPosition, TradeRecord, TradingLevel};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub store: StateStore,
    pub wallet: String,
}

pub type AppState = Arc<ApiState>;

impl ApiState {
    /// Load the wallet document, mapping absence to 404 and read/parse
    /// failures to 500.
    fn load_state(&self) -> Result<BotState, StatusCode> {
        match self.store.load(&self.wallet) {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Err(StatusCode::NOT_FOUND),
            Err(e) => {
                error!(wallet = %self.wallet, error = %e, "Failed to load state");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub wallet_name: String,
    pub current_capital: Decimal,
    pub initial_capital: Decimal,
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub daily_trades: u32,
    pub trading_level: TradingLevel,
    pub open_position: Option<OpenPosition>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}
fn default_per_page() -> usize {
    50
}

#[derive(Debug, Clone, Serialize)]
pub struct TradesResponse {
    pub trades: Vec<TradeRecord>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceResponse {
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate: f64,
    pub capital_initial: Decimal,
    pub capital_current: Decimal,
    pub pnl: Decimal,
    pub pnl_percentage: f64,
    pub bear_market_skipped: u64,
    pub low_confidence_skipped: u64,
    pub trades_by_pair: BTreeMap<String, PairBreakdown>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PairBreakdown {
    pub total: u64,
    pub buys: u64,
    pub sells: u64,
    pub notional: Decimal,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/bot/status
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    let bot = state.load_state()?;
    Ok(Json(StatusResponse {
        wallet_name: bot.wallet_name.clone(),
        current_capital: bot.current_capital,
        initial_capital: bot.initial_capital,
        total_trades: bot.total_trades,
        winning_trades: bot.winning_trades,
        losing_trades: bot.losing_trades,
        daily_trades: bot.daily_trades,
        trading_level: bot.current_level,
        open_position: bot.open_position.clone(),
        last_updated: bot.updated_at,
    }))
}

/// GET /api/bot/trades?page=&per_page=
pub async fn get_trades(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<TradesResponse>, StatusCode> {
    let bot = state.load_state()?;
    let trades = &bot.trade_history;

    let per_page = pagination.per_page.clamp(1, 500);
    let page = pagination.page.max(1);
    let total = trades.len();
    let pages = total.div_ceil(per_page);

    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = (start + per_page).min(total);

    Ok(Json(TradesResponse {
        trades: trades[start..end].to_vec(),
        total,
        page,
        per_page,
        pages,
    }))
}

/// GET /api/bot/trades/{index}
pub async fn get_trade(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<TradeRecord>, StatusCode> {
    let bot = state.load_state()?;
    bot.trade_history
        .get(index)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// GET /api/bot/performance
pub async fn get_performance(
    State(state): State<AppState>,
) -> Result<Json<PerformanceResponse>, StatusCode> {
    let bot = state.load_state()?;

    let pnl = bot.current_capital - bot.initial_capital;
    let pnl_percentage = if bot.initial_capital > Decimal::ZERO {
        (bot.growth_ratio() - 1.0) * 100.0
    } else {
        0.0
    };

    let mut trades_by_pair: BTreeMap<String, PairBreakdown> = BTreeMap::new();
    for trade in &bot.trade_history {
        let entry = trades_by_pair.entry(trade.pair.clone()).or_default();
        entry.total += 1;
        match trade.action {
            crate::types::TradeAction::Buy => entry.buys += 1,
            crate::types::TradeAction::Sell => entry.sells += 1,
            crate::types::TradeAction::Hold => {}
        }
        entry.notional += trade.notional;
    }

    Ok(Json(PerformanceResponse {
        total_trades: bot.total_trades,
        winning_trades: bot.winning_trades,
        losing_trades: bot.losing_trades,
        win_rate: bot.win_rate(),
        capital_initial: bot.initial_capital,
        capital_current: bot.current_capital,
        pnl,
        pnl_percentage,
        bear_market_skipped: bot.bear_market_skipped,
        low_confidence_skipped: bot.low_confidence_skipped,
        trades_by_pair,
    }))
}

/// GET /api/bot/state — the full persisted document.
pub async fn get_state(State(state): State<AppState>) -> Result<Json<BotState>, StatusCode> {
    state.load_state().map(Json)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TradeAction, Trend};
    use rust_decimal_macros::dec;

    fn temp_state() -> AppState {
        let mut p = std::env::temp_dir();
        p.push(format!("midas_api_test_{}", uuid::Uuid::new_v4()));
        Arc::new(ApiState {
            store: StateStore::new(p),
            wallet: "w1".to_string(),
        })
    }

    fn seeded_state(trades: usize) -> AppState {
        let api = temp_state();
        let mut bot = BotState::new("w1", dec!(10000));
        for i in 0..trades {
            bot.record_trade(TradeRecord {
                timestamp: Utc::now(),
                pair: if i % 2 == 0 { "BTC" } else { "ETH" }.to_string(),
                action: TradeAction::Buy,
                price: dec!(100),
                quantity: dec!(1),
                notional: dec!(100),
                confidence: 70.0,
                reasoning: format!("trade {i}"),
                trend: Trend::Sideways,
            });
        }
        api.store.save(&mut bot).unwrap();
        api
    }

    #[tokio::test]
    async fn test_health_is_static() {
        let Json(resp) = health().await;
        assert_eq!(resp.status, "healthy");
    }

    #[tokio::test]
    async fn test_status_404_without_state() {
        let api = temp_state();
        let result = get_status(State(api)).await;
        assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_status_reflects_document() {
        let api = seeded_state(3);
        let Json(resp) = get_status(State(api)).await.unwrap();
        assert_eq!(resp.total_trades, 3);
        assert_eq!(resp.current_capital, dec!(10000));
        assert_eq!(resp.trading_level, TradingLevel::Turtle);
    }

    #[tokio::test]
    async fn test_trades_pagination() {
        let api = seeded_state(7);
        let Json(resp) = get_trades(
            State(api.clone()),
            Query(Pagination {
                page: 2,
                per_page: 3,
            }),
        )
        .await
        .unwrap();

        assert_eq!(resp.total, 7);
        assert_eq!(resp.pages, 3);
        assert_eq!(resp.trades.len(), 3);
        assert_eq!(resp.trades[0].reasoning, "trade 3");

        // Past-the-end page is empty, not an error
        let Json(last) = get_trades(
            State(api),
            Query(Pagination {
                page: 9,
                per_page: 3,
            }),
        )
        .await
        .unwrap();
        assert!(last.trades.is_empty());
    }

    #[tokio::test]
    async fn test_trade_by_index() {
        let api = seeded_state(2);
        let Json(trade) = get_trade(State(api.clone()), Path(1)).await.unwrap();
        assert_eq!(trade.reasoning, "trade 1");

        let missing = get_trade(State(api), Path(5)).await;
        assert_eq!(missing.err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_performance_groups_by_pair() {
        let api = seeded_state(4);
        let Json(resp) = get_performance(State(api)).await.unwrap();
        assert_eq!(resp.total_trades, 4);
        assert_eq!(resp.pnl, Decimal::ZERO);
        assert_eq!(resp.trades_by_pair["BTC"].total, 2);
        assert_eq!(resp.trades_by_pair["ETH"].buys, 2);
        assert_eq!(resp.trades_by_pair["BTC"].notional, dec!(200));
    }

    #[tokio::test]
    async fn test_full_state_endpoint() {
        let api = seeded_state(1);
        let Json(bot) = get_state(State(api)).await.unwrap();
        assert_eq!(bot.wallet_name, "w1");
        assert_eq!(bot.trade_history.len(), 1);
    }
}
