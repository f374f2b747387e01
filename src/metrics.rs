//! Prometheus metrics for relay observability.
//!
//! Metrics are exported on a dedicated listener when `METRICS_PORT > 0`.
//! Recording functions are safe to call before (or without) initialization;
//! the `metrics` facade drops samples when no recorder is installed.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `relay_requests_total` - Requests served (labels: method, status)
//! - `relay_auth_failures_total` - Rejected credentials (labels: kind)
//! - `relay_upstream_requests_total` - Backend calls (labels: provider, status, streaming)
//! - `relay_upstream_errors_total` - Backend calls that produced no response (labels: provider, kind)
//!
//! ## Histograms
//! - `relay_request_duration_seconds` - Time to response head (labels: method, status)

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "relay_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "relay_request_duration_seconds";
    pub const AUTH_FAILURES_TOTAL: &str = "relay_auth_failures_total";
    pub const UPSTREAM_REQUESTS_TOTAL: &str = "relay_upstream_requests_total";
    pub const UPSTREAM_ERRORS_TOTAL: &str = "relay_upstream_errors_total";
}

/// Install the Prometheus exporter and describe all metrics.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(names::REQUESTS_TOTAL, "Total number of HTTP requests served");
    describe_counter!(
        names::AUTH_FAILURES_TOTAL,
        "Total number of requests rejected by inbound authentication"
    );
    describe_counter!(
        names::UPSTREAM_REQUESTS_TOTAL,
        "Total number of requests relayed to the backend provider"
    );
    describe_counter!(
        names::UPSTREAM_ERRORS_TOTAL,
        "Total number of backend calls that failed before a response"
    );
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Time from request arrival to response head, in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record a served request and its latency.
pub fn record_request(method: &str, status: u16, duration_secs: f64) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(names::REQUESTS_TOTAL, "method" => method.clone(), "status" => status.clone())
        .increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, "method" => method, "status" => status)
        .record(duration_secs);
}

/// Record a rejected credential.
pub fn record_auth_failure(kind: &str) {
    counter!(names::AUTH_FAILURES_TOTAL, "kind" => kind.to_string()).increment(1);
}

/// Record a backend call that produced a response.
pub fn record_upstream_request(provider: &str, status: u16, streaming: bool) {
    counter!(
        names::UPSTREAM_REQUESTS_TOTAL,
        "provider" => provider.to_string(),
        "status" => status.to_string(),
        "streaming" => streaming.to_string()
    )
    .increment(1);
}

/// Record a backend call that failed before any response (connect, timeout).
pub fn record_upstream_error(provider: &str, kind: &str) {
    counter!(
        names::UPSTREAM_ERRORS_TOTAL,
        "provider" => provider.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}
