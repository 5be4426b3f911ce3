//! Prometheus metrics for quoter.
//!
//! Covers:
//! - Order flow (submitted, rejected by venue, skipped before submission)
//! - Loop health (errors by kind, job state transitions, active jobs)
//! - Quoting state (spread, net position, venue call latency)
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_gauge,
    CounterVec, Encoder, GaugeVec, HistogramVec, IntGauge, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::TelemetryResult;

/// Orders submitted to the venue.
/// Labels: symbol, side
pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_orders_submitted_total",
        "Orders submitted to the venue",
        &["symbol", "side"]
    )
    .unwrap()
});

/// Orders the venue refused.
pub static ORDERS_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_orders_rejected_total",
        "Orders rejected by the venue",
        &["symbol", "side"]
    )
    .unwrap()
});

/// Candidate orders dropped before submission.
/// Labels: symbol, side, reason (risk reject label or wallet reason)
pub static ORDERS_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_orders_skipped_total",
        "Candidate orders skipped by risk or wallet gates",
        &["symbol", "side", "reason"]
    )
    .unwrap()
});

/// Failed loop iterations.
/// Labels: symbol, kind (exchange/timeout/internal)
pub static LOOP_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_loop_errors_total",
        "Market-making loop iteration errors",
        &["symbol", "kind"]
    )
    .unwrap()
});

/// Job state transitions.
pub static JOB_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoter_job_transitions_total",
        "Job state transitions by target state",
        &["state"]
    )
    .unwrap()
});

/// Jobs whose loop is currently running.
pub static ACTIVE_JOBS: Lazy<IntGauge> =
    Lazy::new(|| register_int_gauge!("quoter_active_jobs", "Running market-making jobs").unwrap());

/// Last per-side spread fraction quoted.
pub static QUOTED_SPREAD: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "quoter_quoted_spread",
        "Last quoted per-side spread as a fraction of mid",
        &["symbol"]
    )
    .unwrap()
});

/// Signed net position in base units.
pub static NET_POSITION: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "quoter_net_position",
        "Signed net position in base units",
        &["symbol"]
    )
    .unwrap()
});

/// Venue call latency in milliseconds.
pub static EXCHANGE_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "quoter_exchange_latency_ms",
        "Venue call latency in milliseconds",
        &["operation"],
        vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn order_submitted(symbol: &str, side: &str) {
        ORDERS_SUBMITTED_TOTAL
            .with_label_values(&[symbol, side])
            .inc();
    }

    pub fn order_rejected(symbol: &str, side: &str) {
        ORDERS_REJECTED_TOTAL
            .with_label_values(&[symbol, side])
            .inc();
    }

    pub fn order_skipped(symbol: &str, side: &str, reason: &str) {
        ORDERS_SKIPPED_TOTAL
            .with_label_values(&[symbol, side, reason])
            .inc();
    }

    pub fn loop_error(symbol: &str, kind: &str) {
        LOOP_ERRORS_TOTAL.with_label_values(&[symbol, kind]).inc();
    }

    pub fn job_transition(state: &str) {
        JOB_TRANSITIONS_TOTAL.with_label_values(&[state]).inc();
    }

    pub fn job_started() {
        ACTIVE_JOBS.inc();
    }

    pub fn job_finished() {
        ACTIVE_JOBS.dec();
    }

    pub fn quoted_spread(symbol: &str, spread: Decimal) {
        QUOTED_SPREAD
            .with_label_values(&[symbol])
            .set(to_f64(spread));
    }

    pub fn net_position(symbol: &str, position: Decimal) {
        NET_POSITION
            .with_label_values(&[symbol])
            .set(to_f64(position));
    }

    pub fn exchange_latency(operation: &str, latency_ms: f64) {
        EXCHANGE_LATENCY_MS
            .with_label_values(&[operation])
            .observe(latency_ms);
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn gather() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
