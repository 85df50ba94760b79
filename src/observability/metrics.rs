//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): responses by method, status
//! - `gateway_request_duration_seconds` (histogram): time to response
//! - `gateway_route_dispatch_total` (counter): dispatches by route name
//! - `gateway_timeouts_total` (counter): requests answered by the supervisor
//! - `gateway_errors_total` (counter): dispatch failures by kind
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_dispatch(route: &'static str) {
    counter!("gateway_route_dispatch_total", "route" => route).increment(1);
}

pub fn record_timeout() {
    counter!("gateway_timeouts_total").increment(1);
}

pub fn record_error(kind: &'static str) {
    counter!("gateway_errors_total", "kind" => kind).increment(1);
}
