//! Risk filter chain.
//!
//! Ordered deterministic filters deciding whether an advisor recommendation
//! becomes a recorded trade. Cycle-level guards (daily limit, open position)
//! halt the whole cycle before any pair is analyzed; pair-level filters
//! short-circuit on the first rejection and the cycle moves to the next
//! pair. Every rejection carries a stable reason code.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::sizing::{PositionSizer, SizedOrder};
use crate::types::{BotState, MarketSnapshot, Recommendation, TradeAction, Trend};

/// Minimum notional (quote units) a sized order must reach.
pub const MIN_NOTIONAL: Decimal = dec!(1.0);

// ---------------------------------------------------------------------------
// Reason codes
// ---------------------------------------------------------------------------

/// Stable rejection reason codes, one per filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    DailyLimitReached,
    PositionOpen,
    HoldRecommended,
    LowConfidence,
    BearMarketBlock,
    BelowMinNotional,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            RejectReason::DailyLimitReached => "DAILY_LIMIT_REACHED",
            RejectReason::PositionOpen => "POSITION_OPEN",
            RejectReason::HoldRecommended => "HOLD_RECOMMENDED",
            RejectReason::LowConfidence => "LOW_CONFIDENCE",
            RejectReason::BearMarketBlock => "BEAR_MARKET_BLOCK",
            RejectReason::BelowMinNotional => "BELOW_MIN_NOTIONAL",
        };
        write!(f, "{code}")
    }
}

/// Outcome of the pair-level filter pass.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Signal accepted; carries the sizing inputs for the trade record.
    Accept(SizedOrder),
    Reject(RejectReason),
}

// ---------------------------------------------------------------------------
// Filter chain
// ---------------------------------------------------------------------------

/// Filter chain configuration (the deterministic subset of wallet config).
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub max_daily_trades: u32,
    /// Minimum advisor confidence in percent.
    pub min_confidence: f64,
}

pub struct RiskFilterChain {
    config: FilterConfig,
    sizer: PositionSizer,
}

impl RiskFilterChain {
    pub fn new(config: FilterConfig, sizer: PositionSizer) -> Self {
        Self { config, sizer }
    }

    /// Cycle-level guards, evaluated once before the pair loop.
    /// A `Some` return ends the entire cycle.
    pub fn cycle_guard(&self, state: &BotState) -> Option<RejectReason> {
        if state.daily_trades >= self.config.max_daily_trades {
            return Some(RejectReason::DailyLimitReached);
        }
        if state.open_position.is_some() {
            return Some(RejectReason::PositionOpen);
        }
        None
    }

    /// Pair-level filters in fixed order, short-circuiting on the first
    /// rejection. Pure: identical inputs always yield the same verdict.
    pub fn evaluate(
        &self,
        state: &BotState,
        snapshot: &MarketSnapshot,
        recommendation: &Recommendation,
    ) -> Verdict {
        if recommendation.action == TradeAction::Hold {
            return Verdict::Reject(RejectReason::HoldRecommended);
        }

        if recommendation.confidence < self.config.min_confidence {
            return Verdict::Reject(RejectReason::LowConfidence);
        }

        if snapshot.trend == Trend::Bearish && recommendation.action == TradeAction::Buy {
            return Verdict::Reject(RejectReason::BearMarketBlock);
        }

        let price = Decimal::from_f64(snapshot.price).unwrap_or(Decimal::ZERO);
        let order = self.sizer.size(state.current_capital, price);
        if order.notional < MIN_NOTIONAL || order.quantity <= Decimal::ZERO {
            return Verdict::Reject(RejectReason::BelowMinNotional);
        }

        Verdict::Accept(order)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
