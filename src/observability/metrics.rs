//! Metrics collection and exposition.
//!
//! # Metrics
//! - `scaffold_requests_total` (counter): requests by method, status
//! - `scaffold_request_duration_seconds` (histogram): latency by method
//! - `scaffold_dispatch_failures_total` (counter): boundary catches by kind
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; the Prometheus exporter is
//!   only installed when enabled in config
//! - Label values are low-cardinality: no paths, and methods outside the
//!   routable verbs collapse into `OTHER`

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::StartupError;
use crate::routing::Verb;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(address: &str) -> Result<(), StartupError> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| StartupError::Metrics(format!("invalid address `{address}`: {e}")))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| StartupError::Metrics(e.to_string()))?;

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one completed request.
pub fn record_request(method: &Method, status: u16, start: Instant) {
    let method = method_label(method);
    metrics::counter!(
        "scaffold_requests_total",
        "method" => method,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("scaffold_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

fn method_label(method: &Method) -> &'static str {
    Verb::from_method(method).map_or("OTHER", Verb::as_str)
}

/// Record a failure caught by the error boundary.
pub fn record_failure(kind: &'static str) {
    metrics::counter!("scaffold_dispatch_failures_total", "kind" => kind).increment(1);
}
