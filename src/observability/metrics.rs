//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by method, status, target
//! - `edge_request_duration_seconds` (histogram): latency by target
//! - `edge_upstream_failures_total` (counter): gateway failures by target, kind
//! - `readiness_attempts_total` (counter): probe attempts by target, outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels are low-cardinality (no paths, no addresses)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_request(method: &str, status: u16, target: &'static str, start: Instant) {
    counter!(
        "edge_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "target" => target
    )
    .increment(1);
    histogram!("edge_request_duration_seconds", "target" => target)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_failure(target: &'static str, kind: &'static str) {
    counter!("edge_upstream_failures_total", "target" => target, "kind" => kind).increment(1);
}

pub fn record_readiness_attempt(target: &str, ready: bool) {
    let outcome = if ready { "ready" } else { "not_ready" };
    counter!(
        "readiness_attempts_total",
        "target" => target.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
