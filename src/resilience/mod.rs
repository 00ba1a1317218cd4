//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → executor.rs (policy entry point)
//!     → circuit_breaker.rs (fail fast while the target's circuit is open)
//!     → timeouts.rs (per-attempt deadline)
//!     → retries.rs (classify outcome, decide on another attempt)
//!     → backoff.rs (2^n seconds plus jitter before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Retry and circuit accounting are separate: one logical call is one circuit event
//! - Circuits are per target (URI authority), shared by all callers
//! - Backoff sleeps are async and hold no lock

pub mod backoff;
pub mod circuit_breaker;
pub mod error;
pub mod executor;
pub mod policy;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerPolicy, CircuitRegistry, CircuitState};
pub use error::ExecutorError;
pub use executor::ResilientExecutor;
pub use policy::Policy;
pub use retries::{RetryPolicy, TransientCause};
