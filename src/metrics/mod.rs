// Private module declaration
mod server;

use prometheus::{
    Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry,
};
use std::sync::Arc;

use crate::utils::{CircuitState, TransitionHook};

// Re-export for public API
pub use server::{configure_metrics_routes, start_metrics_server};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order lifecycle operations (throughput, latency, failures by kind)
// - Status transitions
// - User directory lookups and degraded fallbacks
// - Circuit breaker state transitions
// - Payment event processing
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Order Lifecycle Metrics
    pub orders_created: IntCounter,
    pub status_transitions: IntCounterVec,
    pub operation_failures: IntCounterVec,
    pub operation_duration: HistogramVec,

    // User Directory Metrics
    pub user_directory_lookups: IntCounterVec,
    pub user_directory_fallbacks: IntCounterVec,

    // Circuit Breaker Metrics
    pub circuit_breaker_state: IntGauge,
    pub circuit_breaker_failure_rate: Gauge,
    pub circuit_breaker_transitions: IntCounterVec,

    // Payment Event Metrics
    pub payment_events: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Order Lifecycle Metrics
        let orders_created = IntCounter::new("orders_created_total", "Total orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let status_transitions = IntCounterVec::new(
            Opts::new("order_status_transitions_total", "Order status transitions applied"),
            &["from_status", "to_status"],
        )?;
        registry.register(Box::new(status_transitions.clone()))?;

        let operation_failures = IntCounterVec::new(
            Opts::new("order_operation_failures_total", "Order operations that returned an error"),
            &["operation", "reason"],
        )?;
        registry.register(Box::new(operation_failures.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("order_operation_duration_seconds", "Order operation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        // User Directory Metrics
        let user_directory_lookups = IntCounterVec::new(
            Opts::new("user_directory_lookups_total", "User directory lookups by result"),
            &["lookup", "result"],
        )?;
        registry.register(Box::new(user_directory_lookups.clone()))?;

        let user_directory_fallbacks = IntCounterVec::new(
            Opts::new("user_directory_fallbacks_total", "Lookups answered with a placeholder user"),
            &["lookup", "reason"],
        )?;
        registry.register(Box::new(user_directory_fallbacks.clone()))?;

        // Circuit Breaker Metrics
        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let circuit_breaker_failure_rate = Gauge::new(
            "circuit_breaker_failure_rate",
            "Failure percentage over the circuit breaker window",
        )?;
        registry.register(Box::new(circuit_breaker_failure_rate.clone()))?;

        let circuit_breaker_transitions = IntCounterVec::new(
            Opts::new("circuit_breaker_transitions_total", "Circuit breaker state transitions"),
            &["from_state", "to_state"],
        )?;
        registry.register(Box::new(circuit_breaker_transitions.clone()))?;

        // Payment Event Metrics
        let payment_events = IntCounterVec::new(
            Opts::new("payment_events_total", "Payment outcome events handled"),
            &["outcome", "result"],
        )?;
        registry.register(Box::new(payment_events.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            status_transitions,
            operation_failures,
            operation_duration,
            user_directory_lookups,
            user_directory_fallbacks,
            circuit_breaker_state,
            circuit_breaker_failure_rate,
            circuit_breaker_transitions,
            payment_events,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_created(&self) {
        self.orders_created.inc();
    }

    pub fn record_status_transition(&self, from_status: &str, to_status: &str) {
        self.status_transitions.with_label_values(&[from_status, to_status]).inc();
    }

    /// Helper to record one lifecycle operation; `failure` carries the error kind
    pub fn record_operation(&self, operation: &str, duration_secs: f64, failure: Option<&str>) {
        self.operation_duration.with_label_values(&[operation]).observe(duration_secs);
        if let Some(reason) = failure {
            self.operation_failures.with_label_values(&[operation, reason]).inc();
        }
    }

    pub fn record_directory_lookup(&self, lookup: &str, fallback_reason: Option<&str>) {
        match fallback_reason {
            None => {
                self.user_directory_lookups.with_label_values(&[lookup, "ok"]).inc();
            }
            Some(reason) => {
                self.user_directory_lookups.with_label_values(&[lookup, "fallback"]).inc();
                self.user_directory_fallbacks.with_label_values(&[lookup, reason]).inc();
            }
        }
    }

    pub fn record_payment_event(&self, outcome: &str, result: &str) {
        self.payment_events.with_label_values(&[outcome, result]).inc();
    }

    /// Helper to update circuit breaker state
    pub fn update_circuit_breaker_state(&self, state: CircuitState) {
        self.circuit_breaker_state.set(state.as_gauge());
    }

    pub fn update_circuit_breaker_failure_rate(&self, percent: f64) {
        self.circuit_breaker_failure_rate.set(percent);
    }

    /// Helper to record circuit breaker transition
    pub fn record_circuit_breaker_transition(&self, from_state: &str, to_state: &str) {
        self.circuit_breaker_transitions.with_label_values(&[from_state, to_state]).inc();
    }

    /// Transition hook that keeps the breaker gauge and counters current
    pub fn circuit_breaker_hook(self: &Arc<Self>) -> TransitionHook {
        let metrics = Arc::clone(self);
        Arc::new(move |from: CircuitState, to: CircuitState| {
            metrics.update_circuit_breaker_state(to);
            metrics.record_circuit_breaker_transition(from.as_str(), to.as_str());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> f64 {
        let gathered = metrics.registry.gather();
        let family = gathered.iter().find(|m| m.name() == name).unwrap();
        family.metric.iter().map(|m| m.counter.value.unwrap_or(0.0)).sum()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_created();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_operation_counts_failures_only() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("create", 0.01, None);
        metrics.record_operation("create", 0.02, Some("invalid_state"));

        assert_eq!(counter_value(&metrics, "order_operation_failures_total"), 1.0);
    }

    #[test]
    fn test_record_directory_fallback() {
        let metrics = Metrics::new().unwrap();
        metrics.record_directory_lookup("by_id", None);
        metrics.record_directory_lookup("by_id", Some("circuit_open"));

        assert_eq!(counter_value(&metrics, "user_directory_lookups_total"), 2.0);
        assert_eq!(counter_value(&metrics, "user_directory_fallbacks_total"), 1.0);
    }

    #[test]
    fn test_circuit_breaker_hook_updates_gauge() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let hook = metrics.circuit_breaker_hook();

        hook(CircuitState::Closed, CircuitState::Open);

        assert_eq!(metrics.circuit_breaker_state.get(), 1);
        assert_eq!(counter_value(&metrics, "circuit_breaker_transitions_total"), 1.0);
    }

    #[test]
    fn test_failure_rate_gauge_is_exported() {
        let metrics = Metrics::new().unwrap();
        metrics.update_circuit_breaker_failure_rate(37.5);

        let gathered = metrics.registry.gather();
        let family = gathered
            .iter()
            .find(|m| m.name() == "circuit_breaker_failure_rate")
            .unwrap();
        assert_eq!(family.metric[0].gauge.value, Some(37.5));
    }
}
