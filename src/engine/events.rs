//! Typed cycle events.
//!
//! One serializable record per cycle transition and per filter decision,
//! appended to a per-wallet JSONL log. The monitoring layer consumes these
//! records instead of scraping log text.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cycle::CycleOutcome;
use crate::strategy::RejectReason;
use crate::types::{TradeAction, Trend};

/// A timestamped event attributed to one wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub wallet: String,
    #[serde(flatten)]
    pub event: CycleEvent,
}

impl EventRecord {
    pub fn new(wallet: &str, event: CycleEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            wallet: wallet.to_string(),
            event,
        }
    }
}

/// Why a pair was skipped before reaching the filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCause {
    PriceUnavailable,
    HistoryUnavailable,
    InsufficientHistory,
    AdvisorError,
}

/// Everything the orchestrator decides, as data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CycleEvent {
    CycleStarted,
    DayRollover {
        date: NaiveDate,
    },
    /// Cycle-level guard fired; no pair was analyzed.
    CycleHalted {
        reason: RejectReason,
    },
    /// Pair abandoned on a transient failure; the cycle continued.
    PairSkipped {
        pair: String,
        cause: SkipCause,
    },
    /// Pair reached the filter chain and was rejected.
    SignalRejected {
        pair: String,
        action: TradeAction,
        confidence: f64,
        reason: RejectReason,
    },
    TradeRecorded {
        pair: String,
        action: TradeAction,
        price: Decimal,
        quantity: Decimal,
        notional: Decimal,
        confidence: f64,
        trend: Trend,
    },
    CycleCompleted {
        outcome: CycleOutcome,
        pairs_analyzed: usize,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
