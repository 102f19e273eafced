//! Metrics collection and exposition.
//!
//! # Metrics
//! - `health_evaluations_total` (counter): evaluations by verdict
//! - `health_status` (gauge): 1=healthy, 0=unhealthy, last evaluation
//! - `health_auto_recoveries_total` (counter): expired windows cleared
//! - `health_probe_failures_total` (counter): liveness probe failures by reason
//! - `blob_store_operations_total` (counter): store calls by operation, outcome
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_health_evaluation(healthy: bool) {
    let verdict = if healthy { "healthy" } else { "unhealthy" };
    counter!("health_evaluations_total", "verdict" => verdict).increment(1);
    gauge!("health_status").set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_auto_recovery() {
    counter!("health_auto_recoveries_total").increment(1);
}

pub fn record_probe_failure(reason: &'static str) {
    counter!("health_probe_failures_total", "reason" => reason).increment(1);
}

pub fn record_store_operation(operation: &'static str, outcome: &'static str) {
    counter!("blob_store_operations_total", "operation" => operation, "outcome" => outcome).increment(1);
}
