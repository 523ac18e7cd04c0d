//! Core domain types for the liquidity-aware trailing stop.
//!
//! This crate provides the fundamental types shared by the stop engine:
//! - `Price`: Precision-safe price type
//! - `PositionKey`: Unique identifier for a monitored position (user + token)
//! - `MarketSnapshot`: Validated per-tick market observation
//! - `TrailingStopConfig`: Validated tuning parameters for the stop calculator

pub mod config;
pub mod decimal;
pub mod error;
pub mod key;
pub mod snapshot;

pub use config::{TrailingStopConfig, TrailingStopParams};
pub use decimal::Price;
pub use error::{CoreError, Result};
pub use key::{PositionKey, TokenId, UserId};
pub use snapshot::{MarketSnapshot, MIN_POOL_LIQUIDITY_USD};
