//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_rate_limited_total` (counter): rejections by zone
//! - `gateway_upstream_errors_total` (counter): upstream failures by pool
//!   and kind (connect, timeout, upstream)
//! - `gateway_websocket_splices_total` (counter): upgraded sessions by pool

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string(),
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a rate-limited rejection. The rejection counter is the only
/// bookkeeping done for rejected requests.
pub fn record_rate_limited(zone: &str) {
    metrics::counter!("gateway_rate_limited_total", "zone" => zone.to_string()).increment(1);
}

/// Record an upstream failure.
pub fn record_upstream_error(pool: &str, kind: &'static str) {
    metrics::counter!(
        "gateway_upstream_errors_total",
        "pool" => pool.to_string(),
        "kind" => kind,
    )
    .increment(1);
}

/// Record an established WebSocket splice.
pub fn record_websocket_splice(pool: &str) {
    metrics::counter!("gateway_websocket_splices_total", "pool" => pool.to_string()).increment(1);
}
