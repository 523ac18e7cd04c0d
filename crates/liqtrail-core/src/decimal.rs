//! Precision-safe price type.
//!
//! Uses `rust_decimal` for exact decimal arithmetic so that stop levels
//! computed from percentages do not drift through binary rounding.

use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Mul, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to keep prices apart from percentages and USD notionals
/// in the stop calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Fractional gain of this price over `base`: `self / base - 1`.
    ///
    /// Returns None if `base` is zero or the division overflows.
    #[inline]
    pub fn gain_over(&self, base: Price) -> Option<Decimal> {
        if base.is_zero() {
            return None;
        }
        self.0.checked_div(base.0).map(|ratio| ratio - Decimal::ONE)
    }

    /// Price lowered by a fractional distance: `self * (1 - pct)`.
    ///
    /// Returns None on overflow.
    #[inline]
    pub fn below_by(&self, pct: Decimal) -> Option<Price> {
        (Decimal::ONE - pct).checked_mul(self.0).map(Self)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gain_over() {
        let entry = Price::new(dec!(100));
        assert_eq!(Price::new(dec!(115)).gain_over(entry), Some(dec!(0.15)));
        assert_eq!(Price::new(dec!(90)).gain_over(entry), Some(dec!(-0.1)));
        assert_eq!(entry.gain_over(Price::ZERO), None);
    }

    #[test]
    fn test_below_by() {
        let price = Price::new(dec!(100));
        assert_eq!(price.below_by(dec!(0.175)), Some(Price::new(dec!(82.5))));
        assert_eq!(
            Price::new(dec!(115)).below_by(dec!(0.175)),
            Some(Price::new(dec!(94.875)))
        );
    }

    #[test]
    fn test_is_positive() {
        assert!(Price::new(dec!(0.000001)).is_positive());
        assert!(!Price::ZERO.is_positive());
        assert!(!Price::new(dec!(-1)).is_positive());
    }

    #[test]
    fn test_parse_and_display() {
        let price: Price = "94.875".parse().unwrap();
        assert_eq!(price.inner(), dec!(94.875));
        assert_eq!(price.to_string(), "94.875");
        assert!(matches!(
            "ninety".parse::<Price>(),
            Err(CoreError::DecimalParse(_))
        ));
    }

    #[test]
    fn test_serde_transparent() {
        let price = Price::new(dec!(82.5));
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"82.5\"");
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, price);
    }
}
