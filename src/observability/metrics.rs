//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatch metrics (requests, latency, misses, recovered panics)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `switchyard_requests_total` (counter): total requests by method, status
//! - `switchyard_request_duration_seconds` (histogram): latency distribution
//! - `switchyard_route_misses_total` (counter): paths with no matching route
//! - `switchyard_panics_recovered_total` (counter): recovered panics by phase
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so tests and
//!   library users pay nothing unless they opt in
//! - Labels are low-cardinality: never the raw path

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::middleware::Phase;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "switchyard_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("switchyard_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_route_miss() {
    counter!("switchyard_route_misses_total").increment(1);
}

pub fn record_panic(phase: Phase) {
    counter!("switchyard_panics_recovered_total", "phase" => phase.as_str()).increment(1);
}
