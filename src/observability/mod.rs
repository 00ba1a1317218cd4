//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → telemetry.rs (request/dependency/health tracking, optional)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape), only with telemetry enabled
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every request span
//! - Telemetry is a capability selected at startup, not scattered conditionals

pub mod logging;
pub mod metrics;
pub mod telemetry;

pub use telemetry::{select_telemetry, MetricsTelemetry, NoOpTelemetry, Telemetry};
