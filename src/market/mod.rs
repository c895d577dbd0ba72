//! Market data integrations.
//!
//! Defines the `MarketDataProvider` trait and provides the Hyperliquid
//! implementation. Providers supply live quotes and the historical close
//! series the indicator engine consumes.

pub mod hyperliquid;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::PriceInfo;

/// Abstraction over market data venues.
///
/// Implementors supply a live quote per symbol and an ordered historical
/// close series. Both calls are bounded by the provider's request timeout
/// so a hung venue fails a single pair, not the whole cycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the current quote for a symbol.
    /// Unknown symbols are an error, not an empty quote.
    async fn get_price(&self, symbol: &str) -> Result<PriceInfo>;

    /// Fetch up to `limit` historical closes for a symbol, oldest first.
    async fn get_historical_closes(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<f64>>;

    /// Venue name for logging and identification.
    fn venue_name(&self) -> &str;
}
