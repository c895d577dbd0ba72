//! Strategy engine — deterministic risk filters and position sizing.
//!
//! The filter chain decides whether an advisor recommendation becomes a
//! recorded trade; the sizer turns capital and risk percentage into a
//! quantity. Both are pure so the engine's decisions are auditable and
//! replayable from the typed event log.

pub mod filters;
pub mod sizing;

pub use filters::{FilterConfig, RejectReason, RiskFilterChain, Verdict, MIN_NOTIONAL};
pub use sizing::{PositionSizer, SizedOrder, SizingConfig};
