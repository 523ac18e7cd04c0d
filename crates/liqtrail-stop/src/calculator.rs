//! Stop-distance calculator.
//!
//! The stop distance covers three sources of adverse movement that a
//! position should tolerate without being stopped out:
//!
//! ```text
//! impact = alpha * trade_size_usd / max(pool_liquidity_usd, 1)
//! noise  = z * atr_pct
//! buffer = beta * spread_pct
//! ts_pct = clamp(noise + impact + buffer, floor_pct, ceiling_pct)
//! ```
//!
//! The calculator never fails. Malformed input or arithmetic overflow yields
//! `floor_pct`, reported as [`StopPctOutcome::Fallback`] so callers can tell a
//! safe default apart from a computed value.

use liqtrail_core::{MarketSnapshot, TrailingStopConfig};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Individual terms of a computed stop distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopPctBreakdown {
    /// Market-impact term.
    pub impact: Decimal,
    /// Volatility term.
    pub noise: Decimal,
    /// Spread term.
    pub buffer: Decimal,
    /// Unclamped sum.
    pub raw: Decimal,
    /// Sum clamped into `[floor_pct, ceiling_pct]`.
    pub stop_pct: Decimal,
}

/// Why the calculator fell back to `floor_pct`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcFault {
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("overflow computing {0}")]
    Overflow(&'static str),
}

/// Result of a stop-distance computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopPctOutcome {
    /// All terms computed from the snapshot.
    Computed(StopPctBreakdown),
    /// Upstream data was unusable; `stop_pct` is the configured floor.
    Fallback { stop_pct: Decimal, fault: CalcFault },
}

impl StopPctOutcome {
    /// The stop distance to apply, always within `[floor_pct, ceiling_pct]`.
    #[inline]
    pub fn stop_pct(&self) -> Decimal {
        match self {
            Self::Computed(breakdown) => breakdown.stop_pct,
            Self::Fallback { stop_pct, .. } => *stop_pct,
        }
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Compute the required stop distance for a snapshot.
///
/// Deterministic: identical inputs always give identical outputs.
pub fn compute_ts_pct(config: &TrailingStopConfig, snapshot: &MarketSnapshot) -> StopPctOutcome {
    match try_compute(config, snapshot) {
        Ok(breakdown) => {
            debug!(
                impact = %breakdown.impact,
                noise = %breakdown.noise,
                buffer = %breakdown.buffer,
                raw = %breakdown.raw,
                stop_pct = %breakdown.stop_pct,
                "Stop distance computed"
            );
            StopPctOutcome::Computed(breakdown)
        }
        Err(fault) => {
            warn!(
                fault = %fault,
                floor_pct = %config.floor_pct(),
                "Stop distance fell back to floor"
            );
            StopPctOutcome::Fallback {
                stop_pct: config.floor_pct(),
                fault,
            }
        }
    }
}

fn try_compute(
    config: &TrailingStopConfig,
    snapshot: &MarketSnapshot,
) -> Result<StopPctBreakdown, CalcFault> {
    snapshot
        .validate()
        .map_err(|e| CalcFault::MalformedSnapshot(e.to_string()))?;

    // Order matters for reproducibility: impact, noise, buffer, then the sum.
    let impact = snapshot
        .trade_size_usd
        .checked_div(snapshot.effective_liquidity_usd())
        .and_then(|ratio| ratio.checked_mul(config.alpha()))
        .ok_or(CalcFault::Overflow("impact"))?;

    let noise = config
        .z()
        .checked_mul(snapshot.atr_pct)
        .ok_or(CalcFault::Overflow("noise"))?;

    let buffer = config
        .beta()
        .checked_mul(snapshot.spread_pct)
        .ok_or(CalcFault::Overflow("buffer"))?;

    let raw = noise
        .checked_add(impact)
        .and_then(|sum| sum.checked_add(buffer))
        .ok_or(CalcFault::Overflow("raw"))?;

    Ok(StopPctBreakdown {
        impact,
        noise,
        buffer,
        raw,
        stop_pct: config.clamp_pct(raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use liqtrail_core::{Price, TrailingStopParams};
    use rust_decimal_macros::dec;

    fn snapshot(atr: Decimal, spread: Decimal, liquidity: Decimal, size: Decimal) -> MarketSnapshot {
        MarketSnapshot::new(Price::new(dec!(100)), atr, spread, liquidity, size).unwrap()
    }

    #[test]
    fn test_entry_example() {
        let config = TrailingStopConfig::default();
        let outcome = compute_ts_pct(
            &config,
            &snapshot(dec!(0.10), dec!(0.01), dec!(1000000), dec!(0)),
        );
        let StopPctOutcome::Computed(breakdown) = outcome else {
            panic!("expected computed outcome, got {outcome:?}");
        };
        assert_eq!(breakdown.impact, dec!(0));
        assert_eq!(breakdown.noise, dec!(0.165));
        assert_eq!(breakdown.buffer, dec!(0.01));
        assert_eq!(breakdown.stop_pct, dec!(0.175));
    }

    #[test]
    fn test_impact_term() {
        let config = TrailingStopConfig::default();
        // 1.8 * 1000 / 100000 = 0.018
        let outcome = compute_ts_pct(
            &config,
            &snapshot(dec!(0.10), dec!(0.01), dec!(100000), dec!(1000)),
        );
        assert_eq!(outcome.stop_pct(), dec!(0.193));
    }

    #[test]
    fn test_zero_liquidity_uses_floor_of_one() {
        let config = TrailingStopConfig::default();
        // 1.8 * 0.05 / 1 = 0.09, plus zero noise and spread
        let outcome = compute_ts_pct(&config, &snapshot(dec!(0), dec!(0), dec!(0), dec!(0.05)));
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.stop_pct(), dec!(0.09));
    }

    #[test]
    fn test_clamped_to_floor_and_ceiling() {
        let config = TrailingStopConfig::default();
        let low = compute_ts_pct(&config, &snapshot(dec!(0), dec!(0), dec!(1000000), dec!(0)));
        assert_eq!(low.stop_pct(), dec!(0.06));

        let high = compute_ts_pct(&config, &snapshot(dec!(5), dec!(0.2), dec!(10), dec!(1000)));
        assert_eq!(high.stop_pct(), dec!(0.40));
    }

    #[test]
    fn test_malformed_snapshot_falls_back_to_floor() {
        let config = TrailingStopConfig::default();
        let mut snap = snapshot(dec!(0.1), dec!(0.01), dec!(1000), dec!(10));
        snap.atr_pct = dec!(-0.5);
        let outcome = compute_ts_pct(&config, &snap);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.stop_pct(), dec!(0.06));
        assert!(matches!(
            outcome,
            StopPctOutcome::Fallback {
                fault: CalcFault::MalformedSnapshot(_),
                ..
            }
        ));
    }

    #[test]
    fn test_overflow_falls_back_to_floor() {
        let config = TrailingStopConfig::new(TrailingStopParams {
            alpha: dec!(1000),
            ..Default::default()
        })
        .unwrap();
        let snap = snapshot(dec!(0.1), dec!(0.01), dec!(0), Decimal::MAX);
        let outcome = compute_ts_pct(&config, &snap);
        assert_eq!(
            outcome,
            StopPctOutcome::Fallback {
                stop_pct: dec!(0.06),
                fault: CalcFault::Overflow("impact"),
            }
        );
    }

    #[test]
    fn test_deterministic() {
        let config = TrailingStopConfig::default();
        let snap = snapshot(dec!(0.123), dec!(0.0042), dec!(54321), dec!(250));
        assert_eq!(compute_ts_pct(&config, &snap), compute_ts_pct(&config, &snap));
    }
}
