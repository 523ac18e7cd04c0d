//! Per-position trailing stop state machine.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──on_entry──► Active(Unarmed) ──gain ≥ arm threshold──► Active(Armed)
//!                                   │                                       │
//!                                   └────────────── close() ────────────────┴──► Closed
//! ```
//!
//! - Entry computes the stop distance and places an initial protective stop
//!   below the entry price. The stop does not trail yet, so entry slippage and
//!   early noise cannot ratchet it up.
//! - Once the high-water mark has gained `ts_pct_at_entry * arm_factor` over
//!   entry, the controller arms and the stop trails the high-water mark.
//! - Every tick checks `price <= trailing_stop_price` after the ratchet and
//!   reports `exit`; acting on it is up to the caller.
//!
//! # Invariants
//!
//! - `highest_price` never decreases.
//! - `trailing_stop_price` never decreases.
//! - Arming is one-way.
//! - A rejected tick (invalid snapshot, arithmetic overflow) leaves all state
//!   untouched: every field is computed first and committed at the end.

use chrono::{DateTime, Utc};
use liqtrail_core::{MarketSnapshot, Price, TrailingStopConfig};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calculator::compute_ts_pct;
use crate::error::{StopError, StopResult};

// ============================================================================
// Results
// ============================================================================

/// Externally visible lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopPhase {
    Uninitialized,
    Unarmed,
    Armed,
    Closed,
}

impl std::fmt::Display for StopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "UNINITIALIZED"),
            Self::Unarmed => write!(f, "UNARMED"),
            Self::Armed => write!(f, "ARMED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Result of [`TrailingStopController::on_entry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryResult {
    /// Entry price (snapshot price at entry).
    pub entry_price: Price,
    /// Stop distance computed at entry.
    pub stop_pct: Decimal,
    /// Gain over entry required before the stop arms.
    pub arm_threshold: Decimal,
    /// Initial protective stop: `entry_price * (1 - stop_pct)`.
    pub initial_stop_price: Price,
    /// True if the calculator fell back to `floor_pct`.
    pub used_fallback: bool,
}

/// Result of an accepted tick on an active controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickResult {
    /// Whether the stop is armed after this tick.
    pub armed: bool,
    /// True only on the tick that armed the stop.
    pub just_armed: bool,
    /// Stop distance applied on this tick.
    pub ts_pct_active: Decimal,
    /// True if the volatility spike rule recomputed the distance.
    pub vol_spike: bool,
    /// High-water mark since entry.
    pub highest_price: Price,
    /// Current stop price.
    pub trailing_stop_price: Price,
    /// True if the ratchet raised the stop on this tick.
    pub stop_raised: bool,
    /// True if price is at or below the stop.
    pub exit: bool,
    /// Gain of the high-water mark over entry.
    pub gain_pct: Decimal,
    /// Price of this tick.
    pub current_price: Price,
}

/// Outcome of [`TrailingStopController::on_tick`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TickOutcome {
    /// The tick was applied.
    Active(TickResult),
    /// The controller is closed; the tick was ignored.
    Inactive,
}

impl TickOutcome {
    /// The applied tick result, if any.
    pub fn result(&self) -> Option<&TickResult> {
        match self {
            Self::Active(result) => Some(result),
            Self::Inactive => None,
        }
    }

    /// True if the tick was applied and price breached the stop.
    pub fn is_exit(&self) -> bool {
        self.result().is_some_and(|r| r.exit)
    }
}

/// Read-only view of a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopStatus {
    pub phase: StopPhase,
    pub armed: bool,
    pub entry_price: Option<Price>,
    pub highest_price: Option<Price>,
    pub trailing_stop_price: Option<Price>,
    pub ts_pct_at_entry: Option<Decimal>,
    pub entered_at: Option<DateTime<Utc>>,
}

// ============================================================================
// State
// ============================================================================

/// Position state from entry onwards.
#[derive(Debug, Clone)]
struct ActiveStop {
    entry_price: Price,
    /// Stop distance at entry; the applied distance never goes below this.
    ts_pct_at_entry: Decimal,
    /// ATR% at entry, baseline for spike detection. Never updated.
    entry_vol_ref: Decimal,
    highest_price: Price,
    armed: bool,
    trailing_stop_price: Price,
    entered_at: DateTime<Utc>,
}

impl ActiveStop {
    fn arm_threshold(&self, config: &TrailingStopConfig) -> Decimal {
        self.ts_pct_at_entry * config.arm_factor()
    }
}

#[derive(Debug, Clone)]
enum ControllerState {
    Uninitialized,
    Active(ActiveStop),
    Closed(ActiveStop),
}

// ============================================================================
// TrailingStopController
// ============================================================================

/// Liquidity-aware adaptive trailing stop for one position.
///
/// Not internally synchronized: the owner must serialize calls, one tick at a
/// time, in arrival order.
#[derive(Debug, Clone)]
pub struct TrailingStopController {
    config: TrailingStopConfig,
    state: ControllerState,
}

impl TrailingStopController {
    /// Create an uninitialized controller.
    #[must_use]
    pub fn new(config: TrailingStopConfig) -> Self {
        Self {
            config,
            state: ControllerState::Uninitialized,
        }
    }

    pub fn config(&self) -> &TrailingStopConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> StopPhase {
        match &self.state {
            ControllerState::Uninitialized => StopPhase::Uninitialized,
            ControllerState::Active(active) if active.armed => StopPhase::Armed,
            ControllerState::Active(_) => StopPhase::Unarmed,
            ControllerState::Closed(_) => StopPhase::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ControllerState::Closed(_))
    }

    /// Initialize the stop on position entry.
    ///
    /// # Errors
    /// - `AlreadyEntered` if the controller has left `Uninitialized`.
    /// - `InvalidSnapshot` if the snapshot fails validation.
    pub fn on_entry(&mut self, snapshot: &MarketSnapshot) -> StopResult<EntryResult> {
        if !matches!(self.state, ControllerState::Uninitialized) {
            return Err(StopError::AlreadyEntered);
        }
        snapshot.validate()?;

        let outcome = compute_ts_pct(&self.config, snapshot);
        let ts_pct = outcome.stop_pct();
        let initial_stop = snapshot
            .price
            .below_by(ts_pct)
            .ok_or_else(|| StopError::Arithmetic("initial stop price".to_string()))?;

        let active = ActiveStop {
            entry_price: snapshot.price,
            ts_pct_at_entry: ts_pct,
            entry_vol_ref: snapshot.atr_pct,
            highest_price: snapshot.price,
            armed: false,
            trailing_stop_price: initial_stop,
            entered_at: snapshot.received_at,
        };

        let result = EntryResult {
            entry_price: active.entry_price,
            stop_pct: ts_pct,
            arm_threshold: active.arm_threshold(&self.config),
            initial_stop_price: initial_stop,
            used_fallback: outcome.is_fallback(),
        };

        info!(
            entry_price = %result.entry_price,
            stop_pct = %result.stop_pct,
            arm_threshold = %result.arm_threshold,
            initial_stop = %result.initial_stop_price,
            used_fallback = result.used_fallback,
            "Trailing stop initialized"
        );

        self.state = ControllerState::Active(active);
        Ok(result)
    }

    /// Apply one price tick.
    ///
    /// Steps, in order: high-water mark, arming, volatility spike adjustment,
    /// ratchet (armed only), exit check against the ratcheted stop.
    ///
    /// # Errors
    /// - `NotEntered` if called before `on_entry`.
    /// - `InvalidSnapshot` / `Arithmetic` if the tick is rejected; state is unchanged.
    ///
    /// Ticks after `close()` return `Ok(TickOutcome::Inactive)`.
    pub fn on_tick(&mut self, snapshot: &MarketSnapshot) -> StopResult<TickOutcome> {
        let active = match &mut self.state {
            ControllerState::Uninitialized => return Err(StopError::NotEntered),
            ControllerState::Closed(_) => return Ok(TickOutcome::Inactive),
            ControllerState::Active(active) => active,
        };
        snapshot.validate()?;

        let config = &self.config;
        let price = snapshot.price;

        // 1. High-water mark
        let highest_price = active.highest_price.max(price);

        // 2. Arming (one-way)
        let gain_pct = highest_price
            .gain_over(active.entry_price)
            .ok_or_else(|| StopError::Arithmetic("gain over entry".to_string()))?;
        let arm_threshold = active.arm_threshold(config);
        let just_armed = !active.armed && gain_pct >= arm_threshold;
        let armed = active.armed || just_armed;

        // 3. Volatility spike adjustment
        let (ts_pct_active, vol_spike) = spike_adjusted_pct(config, active, snapshot);

        // 4. Ratchet
        let mut trailing_stop_price = active.trailing_stop_price;
        let mut stop_raised = false;
        if armed {
            let candidate = highest_price
                .below_by(ts_pct_active)
                .ok_or_else(|| StopError::Arithmetic("candidate stop".to_string()))?;
            if candidate > trailing_stop_price {
                trailing_stop_price = candidate;
                stop_raised = true;
            }
        }

        // 5. Exit check against the post-ratchet stop
        let exit = price <= trailing_stop_price;

        // Commit
        let previous_stop = active.trailing_stop_price;
        active.highest_price = highest_price;
        active.armed = armed;
        active.trailing_stop_price = trailing_stop_price;

        if just_armed {
            info!(
                gain_pct = %gain_pct,
                arm_threshold = %arm_threshold,
                "Trailing stop armed"
            );
        }
        if vol_spike {
            debug!(
                atr_pct = %snapshot.atr_pct,
                entry_vol_ref = %active.entry_vol_ref,
                ts_pct_active = %ts_pct_active,
                "Volatility spike, stop distance recomputed"
            );
        }
        if stop_raised {
            debug!(
                old_stop = %previous_stop,
                new_stop = %trailing_stop_price,
                highest_price = %highest_price,
                "Trailing stop raised"
            );
        }
        if exit {
            warn!(
                price = %price,
                stop = %trailing_stop_price,
                armed = armed,
                "TRAILING STOP TRIGGERED"
            );
        }

        Ok(TickOutcome::Active(TickResult {
            armed,
            just_armed,
            ts_pct_active,
            vol_spike,
            highest_price,
            trailing_stop_price,
            stop_raised,
            exit,
            gain_pct,
            current_price: price,
        }))
    }

    /// Close the stop. Later ticks are ignored.
    ///
    /// Idempotent once closed.
    ///
    /// # Errors
    /// `NotEntered` if the controller was never entered; it stays uninitialized.
    pub fn close(&mut self) -> StopResult<()> {
        let state = std::mem::replace(&mut self.state, ControllerState::Uninitialized);
        match state {
            ControllerState::Uninitialized => Err(StopError::NotEntered),
            ControllerState::Active(active) => {
                info!(
                    entry_price = %active.entry_price,
                    highest_price = %active.highest_price,
                    stop = %active.trailing_stop_price,
                    armed = active.armed,
                    "Trailing stop closed"
                );
                self.state = ControllerState::Closed(active);
                Ok(())
            }
            closed @ ControllerState::Closed(_) => {
                self.state = closed;
                Ok(())
            }
        }
    }

    /// Snapshot of the controller state.
    pub fn status(&self) -> StopStatus {
        let phase = self.phase();
        match &self.state {
            ControllerState::Uninitialized => StopStatus {
                phase,
                armed: false,
                entry_price: None,
                highest_price: None,
                trailing_stop_price: None,
                ts_pct_at_entry: None,
                entered_at: None,
            },
            ControllerState::Active(active) | ControllerState::Closed(active) => StopStatus {
                phase,
                armed: active.armed,
                entry_price: Some(active.entry_price),
                highest_price: Some(active.highest_price),
                trailing_stop_price: Some(active.trailing_stop_price),
                ts_pct_at_entry: Some(active.ts_pct_at_entry),
                entered_at: Some(active.entered_at),
            },
        }
    }
}

/// Stop distance to apply on this tick.
///
/// Starts at the entry distance. If volatility exceeds
/// `entry_vol_ref * vol_spike_mult`, the distance is recomputed from the
/// current snapshot and the result is `max(entry, min(recomputed, ceiling))`.
/// A zero entry volatility disables spike detection.
fn spike_adjusted_pct(
    config: &TrailingStopConfig,
    active: &ActiveStop,
    snapshot: &MarketSnapshot,
) -> (Decimal, bool) {
    let base = active.ts_pct_at_entry;
    if !config.tighten_on_vol_spike() || active.entry_vol_ref.is_zero() {
        return (base, false);
    }

    let spiked = active
        .entry_vol_ref
        .checked_mul(config.vol_spike_mult())
        .is_some_and(|threshold| snapshot.atr_pct > threshold);
    if !spiked {
        return (base, false);
    }

    let recomputed = compute_ts_pct(config, snapshot).stop_pct();
    (base.max(recomputed.min(config.ceiling_pct())), true)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use liqtrail_core::TrailingStopParams;
    use rust_decimal_macros::dec;

    fn snap(price: Decimal) -> MarketSnapshot {
        snap_with_atr(price, dec!(0.10))
    }

    fn snap_with_atr(price: Decimal, atr: Decimal) -> MarketSnapshot {
        MarketSnapshot::new(Price::new(price), atr, dec!(0.01), dec!(1000000), dec!(0)).unwrap()
    }

    fn entered() -> TrailingStopController {
        let mut ctl = TrailingStopController::new(TrailingStopConfig::default());
        ctl.on_entry(&snap(dec!(100))).unwrap();
        ctl
    }

    fn tick(ctl: &mut TrailingStopController, price: Decimal) -> TickResult {
        ctl.on_tick(&snap(price))
            .unwrap()
            .result()
            .cloned()
            .expect("controller should be active")
    }

    #[test]
    fn test_entry_example() {
        let mut ctl = TrailingStopController::new(TrailingStopConfig::default());
        assert_eq!(ctl.phase(), StopPhase::Uninitialized);

        let entry = ctl.on_entry(&snap(dec!(100))).unwrap();
        assert_eq!(entry.entry_price, Price::new(dec!(100)));
        assert_eq!(entry.stop_pct, dec!(0.175));
        assert_eq!(entry.arm_threshold, dec!(0.1225));
        assert_eq!(entry.initial_stop_price, Price::new(dec!(82.5)));
        assert!(!entry.used_fallback);
        assert_eq!(ctl.phase(), StopPhase::Unarmed);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut ctl = entered();

        let r = tick(&mut ctl, dec!(105));
        assert!(!r.armed);
        assert_eq!(r.gain_pct, dec!(0.05));
        assert_eq!(r.trailing_stop_price, Price::new(dec!(82.5)));
        assert!(!r.exit);

        let r = tick(&mut ctl, dec!(115));
        assert!(r.armed);
        assert!(r.just_armed);
        assert!(r.stop_raised);
        assert_eq!(r.trailing_stop_price, Price::new(dec!(94.875)));
        assert!(!r.exit);
        assert_eq!(ctl.phase(), StopPhase::Armed);

        let r = tick(&mut ctl, dec!(90));
        assert_eq!(r.highest_price, Price::new(dec!(115)));
        assert_eq!(r.trailing_stop_price, Price::new(dec!(94.875)));
        assert!(!r.stop_raised);
        assert!(r.exit);
        assert_eq!(r.current_price, Price::new(dec!(90)));
    }

    #[test]
    fn test_unarmed_position_exits_below_initial_stop() {
        let mut ctl = entered();
        let r = tick(&mut ctl, dec!(82.5));
        assert!(!r.armed);
        assert!(r.exit);
    }

    #[test]
    fn test_tick_before_entry_is_error() {
        let mut ctl = TrailingStopController::new(TrailingStopConfig::default());
        assert_eq!(ctl.on_tick(&snap(dec!(100))), Err(StopError::NotEntered));
        assert_eq!(ctl.phase(), StopPhase::Uninitialized);
    }

    #[test]
    fn test_double_entry_is_error() {
        let mut ctl = entered();
        tick(&mut ctl, dec!(120));
        let before = ctl.status();
        assert_eq!(
            ctl.on_entry(&snap(dec!(50))),
            Err(StopError::AlreadyEntered)
        );
        assert_eq!(ctl.status(), before);
    }

    #[test]
    fn test_invalid_tick_leaves_state_unchanged() {
        let mut ctl = entered();
        tick(&mut ctl, dec!(120));
        let before = ctl.status();

        let mut bad = snap(dec!(500));
        bad.price = Price::new(dec!(-1));
        assert!(matches!(
            ctl.on_tick(&bad),
            Err(StopError::InvalidSnapshot(_))
        ));

        let mut bad = snap(dec!(500));
        bad.trade_size_usd = dec!(-10);
        assert!(ctl.on_tick(&bad).is_err());

        assert_eq!(ctl.status(), before);
    }

    #[test]
    fn test_invalid_entry_leaves_controller_uninitialized() {
        let mut ctl = TrailingStopController::new(TrailingStopConfig::default());
        let mut bad = snap(dec!(100));
        bad.price = Price::ZERO;
        assert!(ctl.on_entry(&bad).is_err());
        assert_eq!(ctl.phase(), StopPhase::Uninitialized);
        assert!(ctl.on_entry(&snap(dec!(100))).is_ok());
    }

    #[test]
    fn test_ticks_after_close_are_inactive() {
        let mut ctl = entered();
        tick(&mut ctl, dec!(130));
        ctl.close().unwrap();
        let before = ctl.status();

        assert_eq!(ctl.on_tick(&snap(dec!(10))), Ok(TickOutcome::Inactive));
        assert_eq!(ctl.on_tick(&snap(dec!(1000))), Ok(TickOutcome::Inactive));
        assert_eq!(ctl.status(), before);
        assert_eq!(ctl.phase(), StopPhase::Closed);
        assert!(ctl.status().armed);

        // Idempotent
        assert!(ctl.close().is_ok());
        assert!(ctl.is_closed());
    }

    #[test]
    fn test_close_before_entry_is_rejected() {
        let mut ctl = TrailingStopController::new(TrailingStopConfig::default());
        assert_eq!(ctl.close(), Err(StopError::NotEntered));
        assert_eq!(ctl.phase(), StopPhase::Uninitialized);
    }

    #[test]
    fn test_entry_after_close_is_rejected() {
        let mut ctl = entered();
        ctl.close().unwrap();
        assert_eq!(
            ctl.on_entry(&snap(dec!(100))),
            Err(StopError::AlreadyEntered)
        );
    }

    #[test]
    fn test_arming_is_one_way() {
        let mut ctl = entered();
        assert!(tick(&mut ctl, dec!(113)).armed);
        // Price falls back below the arm threshold but stays above the stop
        let r = tick(&mut ctl, dec!(100));
        assert!(r.armed);
        assert!(!r.just_armed);
    }

    #[test]
    fn test_stop_never_decreases() {
        let mut ctl = entered();
        tick(&mut ctl, dec!(150));
        let high = tick(&mut ctl, dec!(140)).trailing_stop_price;
        assert_eq!(high, Price::new(dec!(123.75)));
        // A spike widens the distance but cannot pull the stop down
        let r = ctl
            .on_tick(&snap_with_atr(dec!(145), dec!(0.30)))
            .unwrap()
            .result()
            .cloned()
            .unwrap();
        assert!(r.vol_spike);
        assert_eq!(r.trailing_stop_price, high);
    }

    #[test]
    fn test_vol_spike_uses_recomputed_distance() {
        let mut ctl = entered();
        // atr 0.20 > 0.10 * 1.5 => recompute 1.65 * 0.20 + 0.01 = 0.34
        let r = ctl
            .on_tick(&snap_with_atr(dec!(101), dec!(0.20)))
            .unwrap()
            .result()
            .cloned()
            .unwrap();
        assert!(r.vol_spike);
        assert_eq!(r.ts_pct_active, dec!(0.34));
        assert!(r.ts_pct_active >= dec!(0.175));
    }

    #[test]
    fn test_vol_spike_never_goes_below_entry_distance() {
        let mut ctl = TrailingStopController::new(TrailingStopConfig::default());
        // impact 1.8 * 10000 / 100000 = 0.18 => entry distance 0.355
        let entry_snap = MarketSnapshot::new(
            Price::new(dec!(100)),
            dec!(0.10),
            dec!(0.01),
            dec!(100000),
            dec!(10000),
        )
        .unwrap();
        let entry = ctl.on_entry(&entry_snap).unwrap();
        assert_eq!(entry.stop_pct, dec!(0.355));

        // Spike tick with no impact recomputes to 0.274, below entry
        let r = ctl
            .on_tick(&snap_with_atr(dec!(101), dec!(0.16)))
            .unwrap()
            .result()
            .cloned()
            .unwrap();
        assert!(r.vol_spike);
        assert_eq!(r.ts_pct_active, dec!(0.355));
    }

    #[test]
    fn test_vol_spike_capped_at_ceiling() {
        let mut ctl = entered();
        let r = ctl
            .on_tick(&snap_with_atr(dec!(101), dec!(2)))
            .unwrap()
            .result()
            .cloned()
            .unwrap();
        assert_eq!(r.ts_pct_active, dec!(0.40));
    }

    #[test]
    fn test_vol_spike_disabled() {
        let config = TrailingStopConfig::new(TrailingStopParams {
            tighten_on_vol_spike: false,
            ..Default::default()
        })
        .unwrap();
        let mut ctl = TrailingStopController::new(config);
        ctl.on_entry(&snap(dec!(100))).unwrap();
        let r = ctl
            .on_tick(&snap_with_atr(dec!(101), dec!(0.5)))
            .unwrap()
            .result()
            .cloned()
            .unwrap();
        assert!(!r.vol_spike);
        assert_eq!(r.ts_pct_active, dec!(0.175));
    }

    #[test]
    fn test_zero_entry_volatility_skips_spike_detection() {
        let mut ctl = TrailingStopController::new(TrailingStopConfig::default());
        ctl.on_entry(&snap_with_atr(dec!(100), dec!(0))).unwrap();
        let r = ctl
            .on_tick(&snap_with_atr(dec!(101), dec!(0.3)))
            .unwrap()
            .result()
            .cloned()
            .unwrap();
        assert!(!r.vol_spike);
        assert_eq!(r.ts_pct_active, dec!(0.06));
    }

    #[test]
    fn test_spike_baseline_is_fixed_at_entry() {
        let mut ctl = entered();
        for price in [dec!(101), dec!(102), dec!(103)] {
            let r = ctl
                .on_tick(&snap_with_atr(price, dec!(0.2)))
                .unwrap()
                .result()
                .cloned()
                .unwrap();
            assert!(r.vol_spike);
        }
    }

    #[test]
    fn test_sub_micro_prices_ratchet_and_exit() {
        let mut ctl = TrailingStopController::new(TrailingStopConfig::default());
        let entry = ctl.on_entry(&snap(dec!(0.0000001))).unwrap();
        assert_eq!(entry.initial_stop_price, Price::new(dec!(0.0000000825)));

        let r = tick(&mut ctl, dec!(0.0000002));
        assert!(r.armed);
        assert!(r.stop_raised);
        assert_eq!(r.trailing_stop_price, Price::new(dec!(0.000000165)));

        // 0.00000021 * 0.825, a raise far below one millionth of a unit
        let r = tick(&mut ctl, dec!(0.00000021));
        assert!(r.stop_raised);
        assert_eq!(r.trailing_stop_price, Price::new(dec!(0.00000017325)));

        let r = tick(&mut ctl, dec!(0.00000015));
        assert!(!r.stop_raised);
        assert!(r.exit);
    }

    #[test]
    fn test_status_reports_phase_and_levels() {
        let mut ctl = entered();
        let status = ctl.status();
        assert_eq!(status.phase, StopPhase::Unarmed);
        assert_eq!(status.entry_price, Some(Price::new(dec!(100))));
        assert_eq!(status.ts_pct_at_entry, Some(dec!(0.175)));
        assert_eq!(status.trailing_stop_price, Some(Price::new(dec!(82.5))));

        tick(&mut ctl, dec!(115));
        let status = ctl.status();
        assert_eq!(status.phase, StopPhase::Armed);
        assert_eq!(status.highest_price, Some(Price::new(dec!(115))));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(StopPhase::Uninitialized.to_string(), "UNINITIALIZED");
        assert_eq!(StopPhase::Armed.to_string(), "ARMED");
        assert_eq!(StopPhase::Closed.to_string(), "CLOSED");
    }
}
