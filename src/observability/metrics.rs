//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_workflow_outcomes_total` (counter): finished workflows by final status
//! - `dispatch_retry_attempts_total` (counter): retries by protected operation
//! - `dispatch_circuit_state` (gauge): 0=closed, 1=half-open, 2=open, by operation
//! - `dispatch_notifications_total` (counter): deliveries by result
//! - `dispatch_intake_total` (counter): intake requests by result
//!
//! # Design Decisions
//! - Metric names are fixed here; callers only pass labels
//! - Without an installed recorder every call is a no-op

use std::net::SocketAddr;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Start the Prometheus scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_circuit_state(operation: &str, state: CircuitState) {
    gauge!("dispatch_circuit_state", "operation" => operation.to_string()).set(state.as_gauge());
}

pub fn record_retry(operation: &str) {
    counter!("dispatch_retry_attempts_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_workflow_outcome(status: &str) {
    counter!("dispatch_workflow_outcomes_total", "status" => status.to_string()).increment(1);
}

pub fn record_notification(result: &'static str) {
    counter!("dispatch_notifications_total", "result" => result).increment(1);
}

pub fn record_intake(result: &'static str) {
    counter!("dispatch_intake_total", "result" => result).increment(1);
}
