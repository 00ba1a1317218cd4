//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), optional
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (ApplicationSettings__*)
//!     → validation.rs (semantic checks)
//!     → StorefrontConfig (validated, immutable)
//!     → shared by value / Arc with all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    ApplicationSettings, Environment, HealthConfig, HttpClientConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, PolicyKind, ProcessMonitorConfig, ResilienceConfig, StorefrontConfig,
    TimeoutConfig,
};
