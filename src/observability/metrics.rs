//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define resolution metrics (outcomes, gate checks, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `dispatch_resolutions_total` (counter): resolutions by outcome
//! - `dispatch_gate_checks_total` (counter): gate evaluations by result
//! - `dispatch_resolution_duration_seconds` (histogram): resolution latency
//! - `dispatch_http_requests_total` (counter): responses by status
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels are small closed sets (no paths, no tags)

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_resolution(outcome: &'static str, elapsed: Duration) {
    counter!("dispatch_resolutions_total", "outcome" => outcome).increment(1);
    histogram!("dispatch_resolution_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_gate_check(passed: bool) {
    let result = if passed { "passed" } else { "blocked" };
    counter!("dispatch_gate_checks_total", "result" => result).increment(1);
}

pub fn record_response(status: u16) {
    counter!("dispatch_http_requests_total", "status" => status.to_string()).increment(1);
}
