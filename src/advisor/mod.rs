//! AI advisor integration.
//!
//! Defines the `AdvisorClient` trait and provides implementations for
//! Claude (Anthropic) and OpenAI-compatible endpoints. Advisors receive the
//! market snapshot plus recent trade history and must answer with a single
//! JSON object; anything that fails strict validation is an advisor error
//! for that pair, never a crash.

pub mod anthropic;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::str::FromStr;

use crate::types::{BotError, MarketSnapshot, Recommendation, TradeAction, TradeRecord};

/// How many past trades the advisor sees for context.
const HISTORY_CONTEXT_LEN: usize = 5;

/// Market context handed to an advisor for one pair.
pub struct AdvisorContext<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub recent_trades: &'a [TradeRecord],
}

/// Abstraction over AI trading advisors.
///
/// Implementors send the market context to a model and parse a validated
/// BUY/SELL/HOLD recommendation from the response.
#[async_trait]
pub trait AdvisorClient: Send + Sync {
    /// Request a recommendation for a single pair.
    async fn recommend(&self, ctx: &AdvisorContext<'_>) -> Result<Recommendation>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Prompt construction (shared by providers)
// ---------------------------------------------------------------------------

/// System prompt fixing the response contract.
pub fn system_prompt() -> &'static str {
    "You are a disciplined crypto trading analyst for a paper-trading account. \
     Review your own recent trade history and learn from it: if past low-confidence \
     calls or specific reasonings went against you, adjust today's call accordingly.\n\n\
     RESPONSE CONTRACT:\n\
     Reply with EXACTLY one JSON object and nothing else — no prose, no code fences:\n\
     {\"action\": \"BUY\" | \"SELL\" | \"HOLD\", \"confidence\": <number 0-100>, \"reasoning\": \"<one or two sentences>\"}\n\
     The reasoning must mention how the trade history influenced the decision."
}

/// Build the user prompt for a single pair.
pub fn build_user_prompt(ctx: &AdvisorContext<'_>) -> String {
    let snap = ctx.snapshot;
    let mut prompt = String::with_capacity(1500);

    if ctx.recent_trades.is_empty() {
        prompt.push_str("No prior trades recorded.\n");
    } else {
        prompt.push_str("Recent trades (oldest to newest):\n");
        for trade in ctx.recent_trades.iter().rev().take(HISTORY_CONTEXT_LEN).rev() {
            prompt.push_str(&format!(
                "- {} {} {} @ ${} (conf: {:.1}%) - {}\n",
                trade.timestamp.format("%Y-%m-%d"),
                trade.pair,
                trade.action,
                trade.price,
                trade.confidence,
                trade.reasoning,
            ));
        }
    }

    prompt.push_str(&format!(
        "\nMarket data:\n\
         Pair: {}\n\
         Current Price: ${:.2}\n\
         24h Change: {:.2}%\n\
         24h High: ${:.2}\n\
         24h Low: ${:.2}\n\
         Trend: {}\n",
        snap.symbol, snap.price, snap.change_24h, snap.high_24h, snap.low_24h, snap.trend,
    ));
    match snap.rsi {
        Some(v) => prompt.push_str(&format!("RSI(14): {v:.1}\n")),
        None => prompt.push_str("RSI(14): unavailable\n"),
    }

    prompt.push_str("\nProvide your trading recommendation as the single JSON object described in the contract.\n");

    prompt
}

// ---------------------------------------------------------------------------
// Response validation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    action: String,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// Parse and validate a model response into a `Recommendation`.
///
/// Tolerates surrounding prose or code fences by extracting the first
/// top-level JSON object, but the object itself is validated strictly:
/// unknown actions or out-of-range confidence are errors.
pub fn parse_recommendation(text: &str) -> Result<Recommendation> {
    let body = extract_json_object(text).ok_or_else(|| {
        BotError::InvalidRecommendation(format!("no JSON object in response: {}", truncate(text)))
    })?;

    let raw: RawRecommendation = serde_json::from_str(body)
        .map_err(|e| BotError::InvalidRecommendation(format!("malformed JSON: {e}")))?;

    let action = TradeAction::from_str(&raw.action)
        .map_err(|_| BotError::InvalidRecommendation(format!("unknown action: {}", raw.action)))?;

    if !(0.0..=100.0).contains(&raw.confidence) || raw.confidence.is_nan() {
        return Err(BotError::InvalidRecommendation(format!(
            "confidence out of range: {}",
            raw.confidence
        ))
        .into());
    }

    Ok(Recommendation {
        action,
        confidence: raw.confidence,
        reasoning: raw.reasoning,
    })
}

/// Slice out the first `{` … last `}` span, if any.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

fn truncate(text: &str) -> String {
    let t: String = text.chars().take(120).collect();
    if text.chars().count() > 120 {
        format!("{t}…")
    } else {
        t
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Trend;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "BTC".into(),
            price: 65000.0,
            change_24h: 1.2,
            high_24h: 66300.0,
            low_24h: 63700.0,
            trend: Trend::Sideways,
            rsi: Some(55.3),
        }
    }

    #[test]
    fn test_parse_valid_recommendation() {
        let rec = parse_recommendation(
            r#"{"action": "BUY", "confidence": 72.5, "reasoning": "momentum building"}"#,
        )
        .unwrap();
        assert_eq!(rec.action, TradeAction::Buy);
        assert!((rec.confidence - 72.5).abs() < 1e-10);
        assert_eq!(rec.reasoning, "momentum building");
    }

    #[test]
    fn test_parse_tolerates_fences_and_prose() {
        let text = "Here is my call:\n```json\n{\"action\": \"hold\", \"confidence\": 50, \"reasoning\": \"chop\"}\n```";
        let rec = parse_recommendation(text).unwrap();
        assert_eq!(rec.action, TradeAction::Hold);
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let err = parse_recommendation(r#"{"action": "SHORT", "confidence": 80, "reasoning": "x"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_confidence() {
        assert!(parse_recommendation(r#"{"action": "BUY", "confidence": 140, "reasoning": "x"}"#).is_err());
        assert!(parse_recommendation(r#"{"action": "BUY", "confidence": -5, "reasoning": "x"}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(parse_recommendation(r#"{"action": "BUY"}"#).is_err());
        assert!(parse_recommendation("ACTION|80|legacy pipe format").is_err());
        assert!(parse_recommendation("").is_err());
    }

    #[test]
    fn test_prompt_includes_market_and_history() {
        let snap = snapshot();
        let trades = vec![];
        let ctx = AdvisorContext {
            snapshot: &snap,
            recent_trades: &trades,
        };
        let prompt = build_user_prompt(&ctx);
        assert!(prompt.contains("Pair: BTC"));
        assert!(prompt.contains("RSI(14): 55.3"));
        assert!(prompt.contains("No prior trades recorded."));
    }

    #[test]
    fn test_prompt_caps_history_at_five() {
        use chrono::Utc;
        use rust_decimal_macros::dec;

        let snap = snapshot();
        let trades: Vec<TradeRecord> = (0..8)
            .map(|i| TradeRecord {
                timestamp: Utc::now(),
                pair: format!("P{i}"),
                action: TradeAction::Buy,
                price: dec!(10),
                quantity: dec!(1),
                notional: dec!(10),
                confidence: 70.0,
                reasoning: "r".into(),
                trend: Trend::Sideways,
            })
            .collect();
        let ctx = AdvisorContext {
            snapshot: &snap,
            recent_trades: &trades,
        };
        let prompt = build_user_prompt(&ctx);
        // Only the newest five make it into the prompt
        assert!(!prompt.contains("P2 "));
        assert!(prompt.contains("P3 "));
        assert!(prompt.contains("P7 "));
    }
}
