//! Liquidity-aware adaptive trailing stop.
//!
//! Computes a stop distance from live volatility, order-size-to-liquidity
//! impact and spread, then ratchets a stop price behind the position's
//! high-water mark and signals exit when price breaches it.
//!
//! # Key Components
//!
//! - [`compute_ts_pct`]: Pure stop-distance calculator
//! - [`StopPctOutcome`]: Calculator result, distinguishing a computed value from the floor fallback
//! - [`TrailingStopController`]: Per-position state machine (uninitialized → unarmed → armed → closed)
//! - [`EntryResult`], [`TickResult`], [`TickOutcome`]: Controller outputs
//! - [`StopStatus`]: Read-only view of a controller

pub mod calculator;
pub mod controller;
pub mod error;

pub use calculator::{compute_ts_pct, CalcFault, StopPctBreakdown, StopPctOutcome};
pub use controller::{
    EntryResult, StopPhase, StopStatus, TickOutcome, TickResult, TrailingStopController,
};
pub use error::{StopError, StopResult};
