//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path not claimed by an explicit axum route
//!     → pattern.rs (conventional template match, defaults applied)
//!     → values.rs (controller / action / id, case-insensitive)
//!     → http::controllers dispatch
//! ```
//!
//! # Design Decisions
//! - Templates compiled at startup, immutable at runtime
//! - No regex; segment-by-segment comparison
//! - Deterministic: same input always matches the same values

pub mod pattern;
pub mod values;

pub use pattern::{RoutePattern, RoutePatternError};
pub use values::RouteValues;

/// The default conventional route.
pub const DEFAULT_ROUTE: &str = "{controller=Products}/{action=Index}/{id?}";

/// The route status-code pages re-execute through.
pub const ERROR_ROUTE: &str = "Products/Error/{code}";
