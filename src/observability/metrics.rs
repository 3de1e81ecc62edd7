//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tracker_requests_total` (counter): lookups by outcome
//! - `tracker_request_duration_seconds` (histogram): lookup latency
//! - `tracker_cache_total` (counter): cache hits, misses and backend errors
//! - `tracker_admission_rejected_total` (counter): capacity rejections
//! - `tracker_in_flight` (gauge): admitted lookups
//! - `tracker_breaker_open` (gauge): 1=open, 0=closed
//! - `tracker_breaker_failures` (gauge): current failure count
//! - `tracker_extractions_total` (counter): scrape attempts by strategy, outcome
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished lookup.
pub fn record_request(outcome: &'static str, start: Instant) {
    counter!("tracker_requests_total", "outcome" => outcome).increment(1);
    histogram!("tracker_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a cache lookup result: `hit`, `miss` or `error`.
pub fn record_cache(result: &'static str) {
    counter!("tracker_cache_total", "result" => result).increment(1);
}

pub fn record_admission_rejected() {
    counter!("tracker_admission_rejected_total").increment(1);
}

pub fn record_in_flight(count: usize) {
    gauge!("tracker_in_flight").set(count as f64);
}

/// Record the breaker's current state and failure count.
pub fn record_breaker(open: bool, failures: u32) {
    gauge!("tracker_breaker_open").set(if open { 1.0 } else { 0.0 });
    gauge!("tracker_breaker_failures").set(failures as f64);
}

pub fn record_extraction(strategy: &str, outcome: &'static str) {
    counter!(
        "tracker_extractions_total",
        "strategy" => strategy.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
