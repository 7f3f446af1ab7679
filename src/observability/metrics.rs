//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define lifecycle and retry metrics
//! - Optionally expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `multiserve_retry_attempts_total` (counter): retries by cause
//! - `multiserve_probe_failures_total` (counter): exhausted readiness probes by dependency
//! - `multiserve_service_running` (gauge): 1=running, 0=stopped, per service
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The exporter is opt-in; its listener is not a managed service

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_retry(cause: &str) {
    metrics::counter!("multiserve_retry_attempts_total", "cause" => cause.to_string()).increment(1);
}

pub fn record_probe_failure(dependency: &str) {
    metrics::counter!("multiserve_probe_failures_total", "dependency" => dependency.to_string())
        .increment(1);
}

pub fn record_service_running(service: &str, running: bool) {
    let value = if running { 1.0 } else { 0.0 };
    metrics::gauge!("multiserve_service_running", "service" => service.to_string()).set(value);
}
