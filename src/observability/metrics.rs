//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by route, status
//! - `edge_request_duration_seconds` (histogram): latency by route
//! - `edge_rate_limited_total` (counter): rejected by the rate limiter
//! - `edge_cache_lookups_total` (counter): hits/misses by cache
//! - `edge_uploads_total` (counter): stored/failed files
//! - `edge_storage_requests_total` (counter): backend calls by op, result
//! - `edge_bounded_cache_entries` (gauge): bounded cache size

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "edge_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("edge_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("edge_rate_limited_total").increment(1);
}

pub fn record_cache_lookup(cache: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("edge_cache_lookups_total", "cache" => cache, "result" => result)
        .increment(1);
}

pub fn record_upload(result: &'static str, count: usize) {
    metrics::counter!("edge_uploads_total", "result" => result).increment(count as u64);
}

pub fn record_storage_request(op: &'static str, result: &'static str) {
    metrics::counter!("edge_storage_requests_total", "op" => op, "result" => result)
        .increment(1);
}

pub fn record_bounded_cache_size(entries: usize) {
    metrics::gauge!("edge_bounded_cache_entries").set(entries as f64);
}
