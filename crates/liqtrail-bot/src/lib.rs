//! Trailing stop service.
//!
//! - Application configuration (`[trailing_stop]`, `[dispatcher]`,
//!   `[telemetry]`, per-user `[[users]]` settings)
//! - Replay runner that drives the stop dispatcher from a recorded feed and
//!   stands in for the order-execution side

pub mod app;
pub mod config;
pub mod error;

pub use app::{ReplayEvent, ReplayRunner, ReplaySummary};
pub use config::{AppConfig, TelemetryConfig, UserStopSettings};
pub use error::{AppError, AppResult};
