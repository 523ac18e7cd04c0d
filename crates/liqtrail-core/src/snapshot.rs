//! Per-tick market observation.
//!
//! A `MarketSnapshot` is supplied by the external price/liquidity feed for
//! every tick of a monitored position. It is never persisted.

use crate::error::{CoreError, Result};
use crate::Price;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Liquidity floor used in place of a zero or missing pool liquidity.
pub const MIN_POOL_LIQUIDITY_USD: Decimal = Decimal::ONE;

/// Market state for one position at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Current price.
    pub price: Price,
    /// Short-window volatility as a fraction (ATR%, e.g. 0.12 = 12%).
    pub atr_pct: Decimal,
    /// Current effective spread as a fraction.
    pub spread_pct: Decimal,
    /// Quote-side pool liquidity in USD.
    pub pool_liquidity_usd: Decimal,
    /// Notional of the position's order in USD.
    pub trade_size_usd: Decimal,
    /// Timestamp when this snapshot was received.
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Create a validated snapshot.
    ///
    /// Rejects non-positive prices and negative volatility, spread,
    /// liquidity or trade size.
    pub fn new(
        price: Price,
        atr_pct: Decimal,
        spread_pct: Decimal,
        pool_liquidity_usd: Decimal,
        trade_size_usd: Decimal,
    ) -> Result<Self> {
        let snapshot = Self {
            price,
            atr_pct,
            spread_pct,
            pool_liquidity_usd,
            trade_size_usd,
            received_at: Utc::now(),
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check the snapshot ranges.
    ///
    /// Fields are public and snapshots may arrive deserialized from a feed,
    /// so consumers re-validate before touching any position state.
    pub fn validate(&self) -> Result<()> {
        if !self.price.is_positive() {
            return Err(CoreError::InvalidSnapshot(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        for (name, value) in [
            ("atr_pct", self.atr_pct),
            ("spread_pct", self.spread_pct),
            ("pool_liquidity_usd", self.pool_liquidity_usd),
            ("trade_size_usd", self.trade_size_usd),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(CoreError::InvalidSnapshot(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Pool liquidity floored at [`MIN_POOL_LIQUIDITY_USD`].
    pub fn effective_liquidity_usd(&self) -> Decimal {
        self.pool_liquidity_usd.max(MIN_POOL_LIQUIDITY_USD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(price: Decimal) -> Result<MarketSnapshot> {
        MarketSnapshot::new(
            Price::new(price),
            dec!(0.10),
            dec!(0.01),
            dec!(1000000),
            dec!(0),
        )
    }

    #[test]
    fn test_valid_snapshot() {
        let snap = snapshot(dec!(100)).unwrap();
        assert_eq!(snap.price, Price::new(dec!(100)));
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_price() {
        assert!(matches!(
            snapshot(dec!(0)),
            Err(CoreError::InvalidSnapshot(_))
        ));
        assert!(matches!(
            snapshot(dec!(-5)),
            Err(CoreError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_rejects_negative_fields() {
        let err = MarketSnapshot::new(
            Price::new(dec!(1)),
            dec!(0.1),
            dec!(-0.01),
            dec!(10),
            dec!(1),
        )
        .unwrap_err();
        assert!(err.to_string().contains("spread_pct"));

        let err = MarketSnapshot::new(
            Price::new(dec!(1)),
            dec!(0.1),
            dec!(0.01),
            dec!(-10),
            dec!(1),
        )
        .unwrap_err();
        assert!(err.to_string().contains("pool_liquidity_usd"));
    }

    #[test]
    fn test_zero_fields_are_valid() {
        let snap = MarketSnapshot::new(
            Price::new(dec!(1)),
            dec!(0),
            dec!(0),
            dec!(0),
            dec!(0),
        )
        .unwrap();
        assert_eq!(snap.effective_liquidity_usd(), dec!(1));
    }

    #[test]
    fn test_deserialized_snapshot_revalidates() {
        let json = r#"{
            "price": "-1",
            "atr_pct": "0.1",
            "spread_pct": "0.01",
            "pool_liquidity_usd": "1000",
            "trade_size_usd": "10"
        }"#;
        let snap: MarketSnapshot = serde_json::from_str(json).unwrap();
        assert!(snap.validate().is_err());
    }
}
