//! Monitoring reports.
//!
//! Renders a plain-text snapshot of a wallet: capital, counters, win rate,
//! cycle activity, and recent trades. Everything is read from the persisted
//! state document and the typed event log — never from log text.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::events::{CycleEvent, EventRecord};
use crate::types::BotState;

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";

/// Count cycles started on a given calendar day.
pub fn cycles_on(events: &[EventRecord], date: NaiveDate) -> usize {
    events
        .iter()
        .filter(|e| {
            matches!(e.event, CycleEvent::CycleStarted) && e.timestamp.date_naive() == date
        })
        .count()
}

/// Most recent recorded signal price per pair, from the event log.
fn latest_signal_prices(events: &[EventRecord]) -> BTreeMap<String, String> {
    let mut prices = BTreeMap::new();
    for record in events {
        if let CycleEvent::TradeRecorded { pair, price, .. } = &record.event {
            prices.insert(pair.clone(), price.to_string());
        }
    }
    prices
}

/// Render the monitoring report.
pub fn render(state: Option<&BotState>, events: &[EventRecord], now: DateTime<Utc>) -> String {
    let mut out = Vec::new();

    out.push(RULE.to_string());
    out.push(format!(
        "MIDAS Monitoring Report - {}",
        now.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push(RULE.to_string());
    out.push(String::new());

    out.push("Cycle Activity".to_string());
    out.push(THIN_RULE.to_string());
    out.push(format!(
        "Cycles Today: {}",
        cycles_on(events, now.date_naive())
    ));
    out.push(String::new());

    match state {
        Some(state) => {
            out.push("Trading Statistics".to_string());
            out.push(THIN_RULE.to_string());
            out.push(format!("Wallet: {} [{}]", state.wallet_name, state.current_level));
            out.push(format!("Capital: ${}", state.current_capital));
            out.push(format!("Total Trades: {}", state.total_trades));
            out.push(format!("Daily Trades: {}", state.daily_trades));
            out.push(format!("Winning Trades: {}", state.winning_trades));
            out.push(format!("Losing Trades: {}", state.losing_trades));
            if state.winning_trades + state.losing_trades > 0 {
                out.push(format!("Win Rate: {:.1}%", state.win_rate()));
            }
            out.push(format!("ROI: {:+.2}%", (state.growth_ratio() - 1.0) * 100.0));
            out.push(format!("Bear Market Skipped: {}", state.bear_market_skipped));
            out.push(format!(
                "Low Confidence Skipped: {}",
                state.low_confidence_skipped
            ));
            out.push(format!("Last Update: {}", state.updated_at.to_rfc3339()));
            out.push(String::new());

            let prices = latest_signal_prices(events);
            if !prices.is_empty() {
                out.push("Latest Signal Prices".to_string());
                out.push(THIN_RULE.to_string());
                for (pair, price) in &prices {
                    out.push(format!("{pair}: ${price}"));
                }
                out.push(String::new());
            }

            if !state.trade_history.is_empty() {
                out.push("Recent Trades (Last 5)".to_string());
                out.push(THIN_RULE.to_string());
                for trade in state.recent_trades(5) {
                    out.push(format!(
                        "{} | {} | {} | ${} | {:.1}%",
                        trade.timestamp.format("%Y-%m-%d %H:%M"),
                        trade.pair,
                        trade.action,
                        trade.price,
                        trade.confidence,
                    ));
                }
                out.push(String::new());
            }
        }
        None => {
            out.push("No wallet state recorded yet.".to_string());
            out.push(String::new());
        }
    }

    out.push(RULE.to_string());
    out.join("\n")
}

/// Write a timestamped report file plus `latest_report.txt`.
/// Returns the timestamped path.
pub fn write_report(dir: &Path, text: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report dir {}", dir.display()))?;

    let path = dir.join(format!("report_{}.txt", now.format("%Y%m%d_%H%M%S")));
    fs::write(&path, text)
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    let latest = dir.join("latest_report.txt");
    fs::write(&latest, text)
        .with_context(|| format!("Failed to write report {}", latest.display()))?;

    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
