//! Health report model and its JSON shape.
//!
//! # JSON
//! ```text
//! {
//!   "Status": "Unhealthy",
//!   "HealthChecks": [
//!     {"Component": "Product Service", "Status": "Healthy", "Description": null},
//!     {"Component": "Order Service", "Status": "Unhealthy", "Description": "connection failed: ..."}
//!   ],
//!   "HealthCheckDuration": "00:00:00.0123456"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Health of one component or of the whole report. Ordered worst first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Unhealthy,
    Degraded,
    Healthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthStatus::Unhealthy => "Unhealthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Healthy => "Healthy",
        };
        f.write_str(name)
    }
}

/// What a single check returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub description: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: None,
        }
    }

    pub fn degraded(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            description: Some(description.into()),
        }
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: Some(description.into()),
        }
    }
}

/// One named entry of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReportEntry {
    pub name: String,
    pub status: HealthStatus,
    pub description: Option<String>,
    pub duration: Duration,
}

/// Result of one pass over every registered check.
#[derive(Debug, Clone)]
pub struct HealthReport {
    status: HealthStatus,
    entries: Vec<HealthReportEntry>,
    total_duration: Duration,
}

impl HealthReport {
    pub fn new(entries: Vec<HealthReportEntry>, total_duration: Duration) -> Self {
        let status = aggregate_status(entries.iter().map(|e| e.status));
        Self {
            status,
            entries,
            total_duration,
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn entries(&self) -> &[HealthReportEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&HealthReportEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// The wire document served on the health endpoint.
    pub fn to_response(&self) -> HealthResponse {
        HealthResponse {
            status: self.status,
            health_checks: self
                .entries
                .iter()
                .map(|e| HealthCheckEntry {
                    component: e.name.clone(),
                    status: e.status,
                    description: e.description.clone(),
                })
                .collect(),
            health_check_duration: format_timespan(self.total_duration),
        }
    }
}

/// Healthy if every status is Healthy, Unhealthy if any is Unhealthy, else Degraded.
pub fn aggregate_status<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    statuses.into_iter().min().unwrap_or(HealthStatus::Healthy)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub health_checks: Vec<HealthCheckEntry>,
    pub health_check_duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheckEntry {
    pub component: String,
    pub status: HealthStatus,
    pub description: Option<String>,
}

/// Format a duration as a constant-format time span: `[d.]hh:mm:ss[.fffffff]`.
pub fn format_timespan(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let days = total_secs / 86_400;
    let hours = (total_secs / 3_600) % 24;
    let minutes = (total_secs / 60) % 60;
    let seconds = total_secs % 60;
    let ticks = duration.subsec_nanos() / 100;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if ticks > 0 {
        out.push_str(&format!(".{:07}", ticks));
    }
    out
}
