//! Metrics collection and exposition.
//!
//! # Metrics
//! - `storefront_requests_total` (counter): inbound requests by method, route, status
//! - `storefront_request_duration_seconds` (histogram): inbound latency
//! - `storefront_dependency_calls_total` (counter): outbound attempts by target, outcome
//! - `storefront_dependency_duration_seconds` (histogram): outbound attempt latency
//! - `storefront_retries_total` (counter): scheduled retries by target
//! - `storefront_circuit_transitions_total` (counter): circuit transitions by target, state
//! - `storefront_dependency_health` (gauge): 1=healthy, 0.5=degraded, 0=unhealthy
//!
//! Without an installed recorder every call here is a no-op.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, route: &str, status: u16, duration: Duration) {
    ::metrics::counter!(
        "storefront_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "storefront_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_dependency_call(target: &str, outcome: &'static str) {
    ::metrics::counter!(
        "storefront_dependency_calls_total",
        "target" => target.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_dependency_duration(target: &str, duration: Duration) {
    ::metrics::histogram!(
        "storefront_dependency_duration_seconds",
        "target" => target.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_retry(target: &str) {
    ::metrics::counter!("storefront_retries_total", "target" => target.to_string()).increment(1);
}

pub fn record_circuit_transition(target: &str, state: &'static str) {
    ::metrics::counter!(
        "storefront_circuit_transitions_total",
        "target" => target.to_string(),
        "state" => state
    )
    .increment(1);
}

pub fn record_dependency_health(component: &str, value: f64) {
    ::metrics::gauge!("storefront_dependency_health", "component" => component.to_string()).set(value);
}
