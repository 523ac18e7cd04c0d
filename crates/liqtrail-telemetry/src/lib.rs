//! Prometheus metrics and structured logging for liqtrail.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters, gauges and histograms for the trailing stop engine

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_LOG_FILTER};
pub use metrics::Metrics;
