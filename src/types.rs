//! Shared types for the MIDAS agent.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that market, advisor, strategy,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Trade direction recommended by the advisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
            TradeAction::Hold => write!(f, "HOLD"),
        }
    }
}

/// Attempt to parse a string into a TradeAction (case-insensitive).
impl std::str::FromStr for TradeAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            "HOLD" => Ok(TradeAction::Hold),
            _ => Err(anyhow::anyhow!("Unknown trade action: {s}")),
        }
    }
}

/// Coarse market direction derived from the 24h change proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

impl Trend {
    /// Change threshold (in percent) separating a trend from chop.
    pub const CHANGE_THRESHOLD_PCT: f64 = 2.0;

    /// Classify a 24h percentage change into a trend.
    pub fn from_change_24h(change_pct: f64) -> Self {
        if change_pct > Self::CHANGE_THRESHOLD_PCT {
            Trend::Bullish
        } else if change_pct < -Self::CHANGE_THRESHOLD_PCT {
            Trend::Bearish
        } else {
            Trend::Sideways
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "BULLISH"),
            Trend::Bearish => write!(f, "BEARISH"),
            Trend::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

/// Informational capital tier. Never gates a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradingLevel {
    Turtle,
    Dolphin,
    Shark,
    Whale,
}

impl TradingLevel {
    /// Tier for a given capital growth ratio (current / initial).
    pub fn for_growth(ratio: f64) -> Self {
        if ratio >= 5.0 {
            TradingLevel::Whale
        } else if ratio >= 2.5 {
            TradingLevel::Shark
        } else if ratio >= 1.5 {
            TradingLevel::Dolphin
        } else {
            TradingLevel::Turtle
        }
    }
}

impl fmt::Display for TradingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingLevel::Turtle => write!(f, "TURTLE"),
            TradingLevel::Dolphin => write!(f, "DOLPHIN"),
            TradingLevel::Shark => write!(f, "SHARK"),
            TradingLevel::Whale => write!(f, "WHALE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// Raw quote returned by a market data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceInfo {
    pub symbol: String,
    pub price: f64,
    /// 24h change proxy in percent (venue-dependent accuracy).
    pub change_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
}

/// Per-pair market view assembled for one analysis pass.
/// Created and discarded within a single pair iteration.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: f64,
    pub change_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub trend: Trend,
    /// RSI over the configured window; None when history was too short.
    pub rsi: Option<f64>,
}

impl fmt::Display for MarketSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ${:.2} ({:+.2}% 24h) {} RSI={}",
            self.symbol,
            self.price,
            self.change_24h,
            self.trend,
            self.rsi
                .map(|v| format!("{v:.1}"))
                .unwrap_or_else(|| "n/a".to_string()),
        )
    }
}

// ---------------------------------------------------------------------------
// Advisor output
// ---------------------------------------------------------------------------

/// Validated advisor recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: TradeAction,
    /// Self-reported confidence in percent (0–100).
    pub confidence: f64,
    pub reasoning: String,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}%)", self.action, self.confidence)
    }
}

// ---------------------------------------------------------------------------
// Trade records & positions
// ---------------------------------------------------------------------------

/// One recorded paper trade. Immutable once appended to the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub pair: String,
    pub action: TradeAction,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Quote-currency value of the sized position (quantity × price).
    pub notional: Decimal,
    pub confidence: f64,
    pub reasoning: String,
    pub trend: Trend,
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ ${} qty={} (${}) conf={:.1}%",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.action,
            self.pair,
            self.price,
            self.quantity,
            self.notional,
            self.confidence,
        )
    }
}

/// A single open position. The cycle never opens one itself (exit logic is
/// deferred), but its presence halts signal generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub pair: String,
    pub action: TradeAction,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub opened_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Bot state
// ---------------------------------------------------------------------------

/// Durable per-wallet state. Owned by the `StateStore`; mutated only inside
/// a cycle between one load and one save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotState {
    pub wallet_name: String,
    pub initial_capital: Decimal,
    pub current_capital: Decimal,
    pub current_level: TradingLevel,
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub daily_trades: u32,
    pub trade_history: Vec<TradeRecord>,
    pub open_position: Option<OpenPosition>,
    pub last_trade_date: Option<NaiveDate>,
    pub bear_market_skipped: u64,
    pub low_confidence_skipped: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] capital=${} trades={} (W{}/L{}) daily={} skips=bear:{}/conf:{}",
            self.wallet_name,
            self.current_level,
            self.current_capital,
            self.total_trades,
            self.winning_trades,
            self.losing_trades,
            self.daily_trades,
            self.bear_market_skipped,
            self.low_confidence_skipped,
        )
    }
}

impl BotState {
    /// Fresh state for a wallet that has never traded.
    pub fn new(wallet_name: &str, initial_capital: Decimal) -> Self {
        let now = Utc::now();
        Self {
            wallet_name: wallet_name.to_string(),
            initial_capital,
            current_capital: initial_capital,
            current_level: TradingLevel::Turtle,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            daily_trades: 0,
            trade_history: Vec::new(),
            open_position: None,
            last_trade_date: None,
            bear_market_skipped: 0,
            low_confidence_skipped: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reset the daily counter if `today` differs from the last recorded
    /// trading day. Returns true when a rollover happened.
    pub fn roll_over_day(&mut self, today: NaiveDate) -> bool {
        if self.last_trade_date == Some(today) {
            return false;
        }
        self.daily_trades = 0;
        self.last_trade_date = Some(today);
        true
    }

    /// Append an accepted signal to the history and bump the counters.
    pub fn record_trade(&mut self, record: TradeRecord) {
        self.daily_trades += 1;
        self.total_trades += 1;
        self.trade_history.push(record);
    }

    /// Apply a settled trade outcome. Entry point for a downstream
    /// settlement process; the cycle itself never calls this.
    ///
    /// Ignored (with a debug assertion) when every recorded trade already
    /// has an outcome, preserving `winning + losing <= total`.
    pub fn record_outcome(&mut self, pnl: Decimal, won: bool) {
        debug_assert!(
            self.winning_trades + self.losing_trades < self.total_trades,
            "outcome recorded with no pending trades"
        );
        if self.winning_trades + self.losing_trades >= self.total_trades {
            return;
        }
        if won {
            self.winning_trades += 1;
        } else {
            self.losing_trades += 1;
        }
        self.current_capital += pnl;
    }

    /// Win rate in percent over resolved trades. 0.0 if none resolved.
    pub fn win_rate(&self) -> f64 {
        let resolved = self.winning_trades + self.losing_trades;
        if resolved == 0 {
            0.0
        } else {
            (self.winning_trades as f64 / resolved as f64) * 100.0
        }
    }

    /// Capital growth ratio since inception.
    pub fn growth_ratio(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        let initial = self.initial_capital.to_f64().unwrap_or(0.0);
        if initial <= 0.0 {
            return 0.0;
        }
        self.current_capital.to_f64().unwrap_or(0.0) / initial
    }

    /// Refresh the informational tier from capital growth.
    pub fn refresh_level(&mut self) {
        self.current_level = TradingLevel::for_growth(self.growth_ratio());
    }

    /// The most recent `n` trades, oldest first.
    pub fn recent_trades(&self, n: usize) -> &[TradeRecord] {
        let start = self.trade_history.len().saturating_sub(n);
        &self.trade_history[start..]
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for MIDAS.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Venue error ({venue}): {message}")]
    Venue { venue: String, message: String },

    #[error("Symbol not listed on venue: {0}")]
    SymbolNotFound(String),

    #[error("Advisor error ({model}): {message}")]
    Advisor { model: String, message: String },

    #[error("Invalid advisor response: {0}")]
    InvalidRecommendation(String),

    #[error("Insufficient history for {symbol}: have {have} closes, need {need}")]
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("State lock already held for wallet {wallet} ({path})")]
    LockHeld { wallet: String, path: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_action_from_str() {
        assert_eq!(TradeAction::from_str("BUY").unwrap(), TradeAction::Buy);
        assert_eq!(TradeAction::from_str("sell").unwrap(), TradeAction::Sell);
        assert_eq!(TradeAction::from_str(" Hold ").unwrap(), TradeAction::Hold);
        assert!(TradeAction::from_str("SHORT").is_err());
    }

    #[test]
    fn test_trend_thresholds() {
        assert_eq!(Trend::from_change_24h(2.5), Trend::Bullish);
        assert_eq!(Trend::from_change_24h(-3.1), Trend::Bearish);
        assert_eq!(Trend::from_change_24h(2.0), Trend::Sideways);
        assert_eq!(Trend::from_change_24h(-2.0), Trend::Sideways);
        assert_eq!(Trend::from_change_24h(0.0), Trend::Sideways);
    }

    #[test]
    fn test_level_for_growth() {
        assert_eq!(TradingLevel::for_growth(0.8), TradingLevel::Turtle);
        assert_eq!(TradingLevel::for_growth(1.5), TradingLevel::Dolphin);
        assert_eq!(TradingLevel::for_growth(2.5), TradingLevel::Shark);
        assert_eq!(TradingLevel::for_growth(6.0), TradingLevel::Whale);
    }

    #[test]
    fn test_new_state_is_zeroed() {
        let state = BotState::new("w1", dec!(10000));
        assert_eq!(state.current_capital, dec!(10000));
        assert_eq!(state.total_trades, 0);
        assert_eq!(state.daily_trades, 0);
        assert!(state.trade_history.is_empty());
        assert!(state.open_position.is_none());
        assert!(state.last_trade_date.is_none());
        assert_eq!(state.current_level, TradingLevel::Turtle);
    }

    #[test]
    fn test_roll_over_day() {
        let mut state = BotState::new("w1", dec!(100));
        state.daily_trades = 7;
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        assert!(state.roll_over_day(today));
        assert_eq!(state.daily_trades, 0);
        assert_eq!(state.last_trade_date, Some(today));

        // Same day again: no reset
        state.daily_trades = 3;
        assert!(!state.roll_over_day(today));
        assert_eq!(state.daily_trades, 3);
    }

    #[test]
    fn test_record_trade_bumps_counters() {
        let mut state = BotState::new("w1", dec!(100));
        state.record_trade(sample_record());
        assert_eq!(state.total_trades, 1);
        assert_eq!(state.daily_trades, 1);
        assert_eq!(state.trade_history.len(), 1);
    }

    #[test]
    fn test_record_outcome_respects_invariant() {
        let mut state = BotState::new("w1", dec!(100));
        state.record_trade(sample_record());
        state.record_outcome(dec!(5), true);

        assert_eq!(state.winning_trades, 1);
        assert_eq!(state.current_capital, dec!(105));
        assert!(state.winning_trades + state.losing_trades <= state.total_trades);
    }

    #[test]
    fn test_win_rate() {
        let mut state = BotState::new("w1", dec!(100));
        assert_eq!(state.win_rate(), 0.0);

        state.total_trades = 4;
        state.winning_trades = 3;
        state.losing_trades = 1;
        assert!((state.win_rate() - 75.0).abs() < 1e-10);
    }

    #[test]
    fn test_recent_trades_tail() {
        let mut state = BotState::new("w1", dec!(100));
        for _ in 0..8 {
            state.record_trade(sample_record());
        }
        assert_eq!(state.recent_trades(5).len(), 5);
        assert_eq!(state.recent_trades(20).len(), 8);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = BotState::new("w1", dec!(10000));
        state.record_trade(sample_record());
        state.last_trade_date = NaiveDate::from_ymd_opt(2026, 3, 14);

        let json = serde_json::to_string_pretty(&state).unwrap();
        let back: BotState = serde_json::from_str(&json).unwrap();

        assert_eq!(back.wallet_name, "w1");
        assert_eq!(back.total_trades, 1);
        assert_eq!(back.trade_history.len(), 1);
        assert_eq!(back.last_trade_date, state.last_trade_date);
        assert_eq!(back.current_capital, dec!(10000));
    }

    #[test]
    fn test_level_serializes_uppercase() {
        let json = serde_json::to_string(&TradingLevel::Turtle).unwrap();
        assert_eq!(json, "\"TURTLE\"");
    }

    fn sample_record() -> TradeRecord {
        TradeRecord {
            timestamp: Utc::now(),
            pair: "BTC".to_string(),
            action: TradeAction::Buy,
            price: dec!(100),
            quantity: dec!(1),
            notional: dec!(100),
            confidence: 75.0,
            reasoning: "test".to_string(),
            trend: Trend::Sideways,
        }
    }
}
