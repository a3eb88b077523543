//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): inbound calls by method, status
//! - `relay_request_duration_seconds` (histogram): end-to-end latency
//! - `relay_upstream_attempts_total` (counter): upstream attempts by outcome
//! - `relay_retries_total` (counter): retries by reason
//! - `relay_decrypt_failures_total` (counter): values left as received
//! - `relay_decode_fallbacks_total` (counter): decoder stages exhausted
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Labels stay low-cardinality (no URLs, no header names)

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_attempt(outcome: &'static str) {
    counter!("relay_upstream_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_retry(reason: &'static str) {
    counter!("relay_retries_total", "reason" => reason).increment(1);
}

pub fn record_decrypt_failure(field: &'static str) {
    counter!("relay_decrypt_failures_total", "field" => field).increment(1);
}

pub fn record_decode_fallback(stage: &'static str) {
    counter!("relay_decode_fallbacks_total", "stage" => stage).increment(1);
}
