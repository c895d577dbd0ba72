//! Cycle orchestrator.
//!
//! Drives one full trading cycle: load state → day rollover → cycle guards
//! → per-pair analyze → filter chain → size → record → persist. At most one
//! trade is recorded per cycle; the pair loop terminates through an
//! explicit accepted outcome rather than a break flag.
//!
//! Per-pair failures (quote fetch, short history, advisor errors) are
//! logged, emitted as typed events, and skip to the next pair. Everything
//! outside that isolation — lock contention, unreadable state — aborts the
//! cycle as a fatal error.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

use super::events::{CycleEvent, EventRecord, SkipCause};
use crate::advisor::{AdvisorClient, AdvisorContext};
use crate::config::AppConfig;
use crate::indicators::rsi;
use crate::market::MarketDataProvider;
use crate::storage::StateStore;
use crate::strategy::{
    FilterConfig, PositionSizer, RejectReason, RiskFilterChain, SizingConfig, Verdict,
};
use crate::types::{BotState, MarketSnapshot, TradeRecord, Trend};

/// How many past trades the advisor sees.
const ADVISOR_HISTORY_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Cycle outcome & report
// ---------------------------------------------------------------------------

/// Terminal condition of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleOutcome {
    DailyLimitHalt,
    PositionHalt,
    TradeRecorded,
    AllPairsExhausted,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CycleOutcome::DailyLimitHalt => "DAILY_LIMIT_HALT",
            CycleOutcome::PositionHalt => "POSITION_HALT",
            CycleOutcome::TradeRecorded => "TRADE_RECORDED",
            CycleOutcome::AllPairsExhausted => "ALL_PAIRS_EXHAUSTED",
        };
        write!(f, "{label}")
    }
}

/// Summary of a completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub pairs_analyzed: usize,
    pub trade: Option<TradeRecord>,
    /// State as persisted at the end of the cycle.
    pub state: BotState,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// One-shot cycle runner. Owns no state; everything durable goes through
/// the `StateStore` passed in.
pub struct CycleRunner<'a> {
    config: &'a AppConfig,
    provider: &'a dyn MarketDataProvider,
    advisor: &'a dyn AdvisorClient,
    store: &'a StateStore,
    chain: RiskFilterChain,
}

impl<'a> CycleRunner<'a> {
    pub fn new(
        config: &'a AppConfig,
        provider: &'a dyn MarketDataProvider,
        advisor: &'a dyn AdvisorClient,
        store: &'a StateStore,
    ) -> Self {
        let chain = RiskFilterChain::new(
            FilterConfig {
                max_daily_trades: config.wallet.max_daily_trades,
                min_confidence: config.wallet.min_confidence,
            },
            PositionSizer::new(SizingConfig {
                risk_pct: config.wallet.risk_pct,
                ..SizingConfig::default()
            }),
        );
        Self {
            config,
            provider,
            advisor,
            store,
            chain,
        }
    }

    /// Run one full cycle. Holds the wallet lock for the duration.
    pub async fn run(&self) -> Result<CycleReport> {
        let wallet = &self.config.wallet;
        let _lock = self.store.acquire_lock(&wallet.name)?;

        let mut state = match self.store.load(&wallet.name)? {
            Some(s) => s,
            None => {
                info!(wallet = %wallet.name, capital = %wallet.initial_capital, "Initialising fresh state");
                BotState::new(&wallet.name, wallet.initial_capital)
            }
        };

        let mut events = vec![EventRecord::new(&wallet.name, CycleEvent::CycleStarted)];
        info!(wallet = %wallet.name, "Cycle start");

        // Day rollover runs unconditionally before any filter check.
        let today = Utc::now().date_naive();
        if state.roll_over_day(today) {
            info!(date = %today, "New day — daily counter reset");
            events.push(EventRecord::new(
                &wallet.name,
                CycleEvent::DayRollover { date: today },
            ));
        }

        // Cycle-level guards: terminal, but the rollover still persists.
        if let Some(reason) = self.chain.cycle_guard(&state) {
            let outcome = match reason {
                RejectReason::DailyLimitReached => CycleOutcome::DailyLimitHalt,
                _ => CycleOutcome::PositionHalt,
            };
            warn!(%reason, daily = state.daily_trades, "Cycle halted before analysis");
            events.push(EventRecord::new(&wallet.name, CycleEvent::CycleHalted { reason }));
            events.push(EventRecord::new(
                &wallet.name,
                CycleEvent::CycleCompleted {
                    outcome,
                    pairs_analyzed: 0,
                },
            ));
            self.persist(&mut state, &events);
            return Ok(CycleReport {
                outcome,
                pairs_analyzed: 0,
                trade: None,
                state,
            });
        }

        // Pair loop: first accepted signal is the terminal state.
        let mut analyzed = 0usize;
        let accepted = 'pairs: {
            for pair in &wallet.trading_pairs {
                analyzed += 1;
                info!(pair = %pair, "Analyzing pair");

                let snapshot = match self.build_snapshot(pair, &mut events).await {
                    Some(s) => s,
                    None => continue,
                };
                info!(pair = %pair, snapshot = %snapshot, "Snapshot built");

                let ctx = AdvisorContext {
                    snapshot: &snapshot,
                    recent_trades: state.recent_trades(ADVISOR_HISTORY_LEN),
                };
                let recommendation = match self.advisor.recommend(&ctx).await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(pair = %pair, error = %e, "Advisor failed — skipping pair");
                        events.push(EventRecord::new(
                            &wallet.name,
                            CycleEvent::PairSkipped {
                                pair: pair.clone(),
                                cause: SkipCause::AdvisorError,
                            },
                        ));
                        continue;
                    }
                };
                info!(
                    pair = %pair,
                    action = %recommendation.action,
                    confidence = recommendation.confidence,
                    reasoning = %recommendation.reasoning,
                    "Advisor recommendation"
                );

                match self.chain.evaluate(&state, &snapshot, &recommendation) {
                    Verdict::Reject(reason) => {
                        info!(pair = %pair, %reason, "Signal rejected");
                        match reason {
                            RejectReason::LowConfidence => state.low_confidence_skipped += 1,
                            RejectReason::BearMarketBlock => state.bear_market_skipped += 1,
                            _ => {}
                        }
                        events.push(EventRecord::new(
                            &wallet.name,
                            CycleEvent::SignalRejected {
                                pair: pair.clone(),
                                action: recommendation.action,
                                confidence: recommendation.confidence,
                                reason,
                            },
                        ));
                    }
                    Verdict::Accept(order) => {
                        let record = TradeRecord {
                            timestamp: Utc::now(),
                            pair: pair.clone(),
                            action: recommendation.action,
                            price: order.price,
                            quantity: order.quantity,
                            notional: order.notional,
                            confidence: recommendation.confidence,
                            reasoning: recommendation.reasoning.clone(),
                            trend: snapshot.trend,
                        };
                        info!(
                            pair = %pair,
                            action = %record.action,
                            price = %record.price,
                            quantity = %record.quantity,
                            notional = %record.notional,
                            daily = state.daily_trades + 1,
                            "TRADE SIGNAL accepted (paper)"
                        );
                        events.push(EventRecord::new(
                            &wallet.name,
                            CycleEvent::TradeRecorded {
                                pair: pair.clone(),
                                action: record.action,
                                price: record.price,
                                quantity: record.quantity,
                                notional: record.notional,
                                confidence: record.confidence,
                                trend: record.trend,
                            },
                        ));
                        state.record_trade(record.clone());
                        break 'pairs Some(record);
                    }
                }
            }
            None
        };

        let outcome = if accepted.is_some() {
            CycleOutcome::TradeRecorded
        } else {
            CycleOutcome::AllPairsExhausted
        };

        events.push(EventRecord::new(
            &wallet.name,
            CycleEvent::CycleCompleted {
                outcome,
                pairs_analyzed: analyzed,
            },
        ));
        self.persist(&mut state, &events);

        info!(
            %outcome,
            pairs = analyzed,
            total_trades = state.total_trades,
            daily = state.daily_trades,
            bear_skipped = state.bear_market_skipped,
            low_conf_skipped = state.low_confidence_skipped,
            "Cycle complete"
        );

        Ok(CycleReport {
            outcome,
            pairs_analyzed: analyzed,
            trade: accepted,
            state,
        })
    }

    /// Build the market snapshot for one pair, or None (with a typed skip
    /// event) on any transient failure.
    async fn build_snapshot(
        &self,
        pair: &str,
        events: &mut Vec<EventRecord>,
    ) -> Option<MarketSnapshot> {
        let wallet = &self.config.wallet.name;
        let market = &self.config.market;

        let quote = match self.provider.get_price(pair).await {
            Ok(q) => q,
            Err(e) => {
                warn!(pair, error = %e, "Quote fetch failed — skipping pair");
                events.push(EventRecord::new(
                    wallet,
                    CycleEvent::PairSkipped {
                        pair: pair.to_string(),
                        cause: SkipCause::PriceUnavailable,
                    },
                ));
                return None;
            }
        };

        let closes = match self
            .provider
            .get_historical_closes(pair, &market.candle_interval, market.history_limit)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                warn!(pair, error = %e, "History fetch failed — skipping pair");
                events.push(EventRecord::new(
                    wallet,
                    CycleEvent::PairSkipped {
                        pair: pair.to_string(),
                        cause: SkipCause::HistoryUnavailable,
                    },
                ));
                return None;
            }
        };

        let rsi_value = rsi(&closes, market.rsi_window);
        if rsi_value.is_none() {
            warn!(
                pair,
                have = closes.len(),
                need = market.rsi_window,
                "Insufficient history for RSI — skipping pair"
            );
            events.push(EventRecord::new(
                wallet,
                CycleEvent::PairSkipped {
                    pair: pair.to_string(),
                    cause: SkipCause::InsufficientHistory,
                },
            ));
            return None;
        }

        Some(MarketSnapshot {
            symbol: quote.symbol,
            price: quote.price,
            change_24h: quote.change_24h,
            high_24h: quote.high_24h,
            low_24h: quote.low_24h,
            trend: Trend::from_change_24h(quote.change_24h),
            rsi: rsi_value,
        })
    }

    /// Persist state and flush events. Failures are logged, not raised:
    /// the cycle's in-memory result is lost but the process exits cleanly.
    fn persist(&self, state: &mut BotState, events: &[EventRecord]) {
        if let Err(e) = self.store.save(state) {
            error!(wallet = %state.wallet_name, error = %e, "Failed to save state");
        }
        if let Err(e) = self.store.append_events(&state.wallet_name, events) {
            error!(wallet = %state.wallet_name, error = %e, "Failed to append events");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
