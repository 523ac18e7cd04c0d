//! Prometheus metrics for the trailing stop engine.
//!
//! Labels are bounded enums (outcome, reason); position keys are never used
//! as labels.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error and fails on first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_int_gauge, Counter,
    CounterVec, Encoder, Histogram, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Positions entered.
pub static ENTRIES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "liqtrail_entries_total",
        "Total positions entered under a trailing stop"
    )
    .unwrap()
});

/// Ticks processed.
/// Labels: outcome (hold/exit/inactive/rejected)
pub static TICKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "liqtrail_ticks_total",
        "Total ticks processed by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Snapshots rejected by validation.
/// Labels: stage (entry/tick)
pub static INVALID_SNAPSHOTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "liqtrail_invalid_snapshots_total",
        "Total snapshots rejected by validation",
        &["stage"]
    )
    .unwrap()
});

/// Entries whose stop distance fell back to the floor.
pub static CALC_FALLBACK_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "liqtrail_calc_fallback_total",
        "Total stop distance computations that fell back to floor_pct"
    )
    .unwrap()
});

/// Stops armed.
pub static ARMED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("liqtrail_armed_total", "Total trailing stops armed").unwrap()
});

/// Ticks where a volatility spike recomputed the stop distance.
pub static VOL_SPIKE_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "liqtrail_vol_spike_total",
        "Total ticks with a volatility spike adjustment"
    )
    .unwrap()
});

/// Exit signals.
/// Labels: result (sent/dropped)
pub static EXIT_SIGNALS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "liqtrail_exit_signals_total",
        "Total exit signals by delivery result",
        &["result"]
    )
    .unwrap()
});

/// Controllers currently held in the registry.
pub static ACTIVE_STOPS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "liqtrail_active_stops",
        "Trailing stop controllers currently registered"
    )
    .unwrap()
});

/// Stop distance at entry, as a fraction.
pub static STOP_PCT_AT_ENTRY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "liqtrail_stop_pct_at_entry",
        "Stop distance computed at entry (fraction)",
        vec![0.06, 0.08, 0.10, 0.125, 0.15, 0.175, 0.20, 0.25, 0.30, 0.35, 0.40]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a position entry.
    pub fn entry(stop_pct: f64, used_fallback: bool) {
        ENTRIES_TOTAL.inc();
        STOP_PCT_AT_ENTRY.observe(stop_pct);
        if used_fallback {
            CALC_FALLBACK_TOTAL.inc();
        }
    }

    /// Record a processed tick.
    pub fn tick(outcome: &str) {
        TICKS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a snapshot rejected by validation.
    pub fn invalid_snapshot(stage: &str) {
        INVALID_SNAPSHOTS_TOTAL.with_label_values(&[stage]).inc();
    }

    pub fn armed() {
        ARMED_TOTAL.inc();
    }

    pub fn vol_spike() {
        VOL_SPIKE_TOTAL.inc();
    }

    /// Record an exit signal delivered to the consumer.
    pub fn exit_sent() {
        EXIT_SIGNALS_TOTAL.with_label_values(&["sent"]).inc();
    }

    /// Record an exit signal lost to a full or closed channel.
    pub fn exit_dropped() {
        EXIT_SIGNALS_TOTAL.with_label_values(&["dropped"]).inc();
    }

    pub fn active_stops_inc() {
        ACTIVE_STOPS.inc();
    }

    pub fn active_stops_dec() {
        ACTIVE_STOPS.dec();
    }

    /// Encode all registered metrics in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
