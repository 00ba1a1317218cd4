//! Dependency health subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → aggregator.rs (spawn every registered check, per-check deadline)
//!     → check.rs (direct probe: URL GET or process lookup)
//!     → report.rs (worst status wins, timed, serialized as JSON)
//! ```
//!
//! # Design Decisions
//! - Probes bypass retry and circuit breaking; they report what they see
//! - A failing or panicking check is an Unhealthy entry, never an error
//! - Entries keep registration order

pub mod aggregator;
pub mod check;
pub mod report;

pub use aggregator::HealthAggregator;
pub use check::{HealthCheck, ProbeError, ProcessHealthCheck, UrlHealthCheck};
pub use report::{aggregate_status, HealthCheckResult, HealthReport, HealthReportEntry, HealthStatus};
