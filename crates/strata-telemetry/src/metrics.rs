//! Prometheus metrics for strata.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which is a startup configuration error; it only happens during
//! static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Session state transitions.
/// Labels: from, to
pub static SESSION_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "strata_session_transitions_total",
        "Session state transitions observed",
        &["from", "to"]
    )
    .unwrap()
});

/// Intermediate clearing state transitions.
/// Labels: from, to
pub static CLEARING_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "strata_clearing_transitions_total",
        "Intermediate clearing state transitions observed",
        &["from", "to"]
    )
    .unwrap()
});

/// Strategy engine state transitions.
/// Labels: from, to
pub static ENGINE_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "strata_engine_transitions_total",
        "Strategy engine state transitions observed",
        &["from", "to"]
    )
    .unwrap()
});

/// Reconciliation runs by outcome (reconciled/mismatched/failed).
pub static RECONCILIATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "strata_reconciliations_total",
        "Reconciliation runs by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Number of mismatched instruments in the last reconciliation.
pub static RECONCILIATION_MISMATCHES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "strata_reconciliation_mismatches",
        "Mismatched instruments in the last reconciliation"
    )
    .unwrap()
});

/// Portfolio position requests by outcome (ok/error/timeout).
pub static PORTFOLIO_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "strata_portfolio_requests_total",
        "Portfolio position requests by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Session protocol violations (event in terminal state).
pub static PROTOCOL_VIOLATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "strata_protocol_violations_total",
        "Session-state events rejected in a terminal state",
        &["state", "event"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn session_transition(from: &str, to: &str) {
        SESSION_TRANSITIONS_TOTAL.with_label_values(&[from, to]).inc();
    }

    pub fn clearing_transition(from: &str, to: &str) {
        CLEARING_TRANSITIONS_TOTAL.with_label_values(&[from, to]).inc();
    }

    pub fn engine_transition(from: &str, to: &str) {
        ENGINE_TRANSITIONS_TOTAL.with_label_values(&[from, to]).inc();
    }

    pub fn protocol_violation(state: &str, event: &str) {
        PROTOCOL_VIOLATIONS_TOTAL
            .with_label_values(&[state, event])
            .inc();
    }

    /// Record a reconciliation outcome and the mismatch count it produced.
    pub fn reconciliation(outcome: &str, mismatches: usize) {
        RECONCILIATIONS_TOTAL.with_label_values(&[outcome]).inc();
        RECONCILIATION_MISMATCHES.set(mismatches as i64);
    }

    pub fn portfolio_request(outcome: &str) {
        PORTFOLIO_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_counters_increment() {
        let before = CLEARING_TRANSITIONS_TOTAL
            .with_label_values(&["oncoming", "running"])
            .get();
        Metrics::clearing_transition("oncoming", "running");
        let after = CLEARING_TRANSITIONS_TOTAL
            .with_label_values(&["oncoming", "running"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_render_contains_registered_metric() {
        Metrics::session_transition("assigned", "online");
        let text = Metrics::render().unwrap();
        assert!(text.contains("strata_session_transitions_total"));
    }
}
