//! Position sizing.
//!
//! Converts account capital and a risk percentage into a trade quantity.
//! Deterministic and pure; the minimum-notional guard in the filter chain
//! consumes its output to decide acceptance.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Sizing configuration.
#[derive(Debug, Clone)]
pub struct SizingConfig {
    /// Fraction of current capital risked per trade (0.01 = 1%).
    pub risk_pct: Decimal,
    /// Decimal places the quantity is rounded to.
    pub quantity_dp: u32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_pct: dec!(0.01),
            quantity_dp: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Sizer
// ---------------------------------------------------------------------------

/// A sized order candidate, ready for the minimum-notional guard.
#[derive(Debug, Clone, Serialize)]
pub struct SizedOrder {
    pub price: Decimal,
    pub quantity: Decimal,
    /// Quote-currency value committed: `current_capital × risk_pct`.
    pub notional: Decimal,
}

pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    /// Access the sizing configuration.
    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Size an order against the current capital.
    ///
    /// `notional` is exact decimal arithmetic; `quantity` is rounded to the
    /// configured precision. A non-positive price yields a zero quantity
    /// rather than an error.
    pub fn size(&self, current_capital: Decimal, price: Decimal) -> SizedOrder {
        let notional = current_capital * self.config.risk_pct;
        let quantity = if price > Decimal::ZERO {
            (notional / price).round_dp(self.config.quantity_dp)
        } else {
            Decimal::ZERO
        };

        SizedOrder {
            price,
            quantity,
            notional,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::ToPrimitive;

    fn sizer() -> PositionSizer {
        PositionSizer::new(SizingConfig::default())
    }

    #[test]
    fn test_reference_sizing() {
        // 10_000 × 1% at price 100 → qty 1.0, notional 100.0
        let order = sizer().size(dec!(10000), dec!(100));
        assert_eq!(order.notional, dec!(100));
        assert_eq!(order.quantity, dec!(1));
    }

    #[test]
    fn test_notional_is_exact() {
        let order = sizer().size(dec!(12345.67), dec!(3));
        assert_eq!(order.notional, dec!(123.4567));
    }

    #[test]
    fn test_quantity_rounded_to_four_places() {
        let order = sizer().size(dec!(10000), dec!(65432.10));
        // 100 / 65432.10 = 0.00152829... → 0.0015
        assert_eq!(order.quantity, dec!(0.0015));
    }

    #[test]
    fn test_quantity_times_price_approximates_notional() {
        let order = sizer().size(dec!(10000), dec!(137.35));
        let implied = (order.quantity * order.price).to_f64().unwrap();
        let notional = order.notional.to_f64().unwrap();
        // Within rounding tolerance of the quantity precision
        assert!((implied - notional).abs() < 137.35 * 1e-4);
    }

    #[test]
    fn test_custom_risk_pct() {
        let sizer = PositionSizer::new(SizingConfig {
            risk_pct: dec!(0.05),
            quantity_dp: 4,
        });
        let order = sizer.size(dec!(2000), dec!(50));
        assert_eq!(order.notional, dec!(100));
        assert_eq!(order.quantity, dec!(2));
    }

    #[test]
    fn test_zero_price_yields_zero_quantity() {
        let order = sizer().size(dec!(10000), Decimal::ZERO);
        assert_eq!(order.quantity, Decimal::ZERO);
        assert_eq!(order.notional, dec!(100));
    }

    #[test]
    fn test_deterministic() {
        let a = sizer().size(dec!(777.77), dec!(13.13));
        let b = sizer().size(dec!(777.77), dec!(13.13));
        assert_eq!(a.quantity, b.quantity);
        assert_eq!(a.notional, b.notional);
    }
}
