//! Optional telemetry.
//!
//! Telemetry is chosen once at startup: a non-blank instrumentation key
//! selects [`MetricsTelemetry`], anything else [`NoOpTelemetry`]. Callers
//! hold an `Arc<dyn Telemetry>` and never branch on configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ApplicationSettings;
use crate::health::report::{HealthReport, HealthStatus};
use crate::observability::metrics;

pub trait Telemetry: Send + Sync {
    /// Whether an exporter should be installed for this sink.
    fn is_enabled(&self) -> bool;

    fn track_request(&self, method: &str, route: &str, status: u16, duration: Duration);

    fn track_dependency(&self, target: &str, success: bool, duration: Duration);

    fn track_health(&self, report: &HealthReport);
}

/// Telemetry disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpTelemetry;

impl Telemetry for NoOpTelemetry {
    fn is_enabled(&self) -> bool {
        false
    }

    fn track_request(&self, _method: &str, _route: &str, _status: u16, _duration: Duration) {}

    fn track_dependency(&self, _target: &str, _success: bool, _duration: Duration) {}

    fn track_health(&self, _report: &HealthReport) {}
}

/// Telemetry recorded through the `metrics` facade.
#[derive(Debug, Clone)]
pub struct MetricsTelemetry {
    instrumentation_key: String,
}

impl MetricsTelemetry {
    pub fn new(instrumentation_key: impl Into<String>) -> Self {
        Self {
            instrumentation_key: instrumentation_key.into(),
        }
    }

    pub fn instrumentation_key(&self) -> &str {
        &self.instrumentation_key
    }
}

impl Telemetry for MetricsTelemetry {
    fn is_enabled(&self) -> bool {
        true
    }

    fn track_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        metrics::record_request(method, route, status, duration);
    }

    fn track_dependency(&self, target: &str, success: bool, duration: Duration) {
        metrics::record_dependency_call(target, if success { "success" } else { "failure" });
        metrics::record_dependency_duration(target, duration);
    }

    fn track_health(&self, report: &HealthReport) {
        for entry in report.entries() {
            let value = match entry.status {
                HealthStatus::Healthy => 1.0,
                HealthStatus::Degraded => 0.5,
                HealthStatus::Unhealthy => 0.0,
            };
            metrics::record_dependency_health(&entry.name, value);
        }
    }
}

/// Pick the telemetry sink for these settings.
pub fn select_telemetry(settings: &ApplicationSettings) -> Arc<dyn Telemetry> {
    match settings.telemetry_key() {
        Some(key) => {
            tracing::info!("Instrumentation key configured, telemetry enabled");
            Arc::new(MetricsTelemetry::new(key))
        }
        None => {
            tracing::info!("No instrumentation key, telemetry disabled");
            Arc::new(NoOpTelemetry)
        }
    }
}
