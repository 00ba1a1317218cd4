//! Downstream service clients.
//!
//! # Data Flow
//! ```text
//! Controller action
//!     → ecommerce.rs (build the endpoint URI)
//!     → resilience::ResilientExecutor
//!     → upstream::Transport
//! ```

pub mod ecommerce;

pub use ecommerce::{ECommerceService, EndpointError};
