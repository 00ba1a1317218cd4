//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the storefront.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the storefront.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Hosting environment; controls diagnostics exposure and HSTS.
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Downstream endpoints and the optional telemetry key.
    #[serde(alias = "ApplicationSettings")]
    pub application_settings: ApplicationSettings,

    /// Retry and circuit breaker policy.
    pub resilience: ResilienceConfig,

    /// Pooled outbound client settings.
    pub http_client: HttpClientConfig,

    /// Health endpoint settings.
    pub health: HealthConfig,

    /// Inbound timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Hosting environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Parse an environment name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// The `ApplicationSettings` section.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApplicationSettings {
    /// Base URI of the products API.
    #[serde(alias = "ProductsApiEndpoint")]
    pub products_api_endpoint: String,

    /// Base URI of the orders API.
    #[serde(alias = "OrdersApiEndpoint")]
    pub orders_api_endpoint: String,

    /// Telemetry instrumentation key. Blank or absent disables telemetry.
    #[serde(alias = "InstrumentationKey")]
    pub instrumentation_key: Option<String>,
}

impl ApplicationSettings {
    /// The instrumentation key, if one is set and not blank.
    pub fn telemetry_key(&self) -> Option<&str> {
        self.instrumentation_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Which policies guard outbound calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Retry,
    CircuitBreaker,
    #[default]
    Composed,
}

/// Retry and circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Policy composition applied to outbound calls.
    pub policy: PolicyKind,

    /// Maximum number of retries after the first attempt.
    pub retry_count: u32,

    /// Exponent base: retry n waits `base^n` units.
    pub backoff_exponent_base: u32,

    /// Length of one backoff unit in milliseconds.
    pub backoff_unit_ms: u64,

    /// Exclusive upper bound of the random jitter in milliseconds.
    pub jitter_max_ms: u64,

    /// Consecutive failed calls before the circuit opens.
    pub failure_threshold: u32,

    /// How long an opened circuit rejects calls, in seconds.
    pub open_duration_secs: u64,

    /// Timeout for a single outbound attempt, in seconds.
    pub attempt_timeout_secs: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Composed,
            retry_count: 5,
            backoff_exponent_base: 2,
            backoff_unit_ms: 1000,
            jitter_max_ms: 100,
            failure_threshold: 5,
            open_duration_secs: 30,
            attempt_timeout_secs: 10,
        }
    }
}

impl ResilienceConfig {
    pub fn open_duration(&self) -> Duration {
        Duration::from_secs(self.open_duration_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// Pooled outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// How long one connection pool lives before it is replaced, in seconds.
    pub handler_lifetime_secs: u64,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Idle pooled connections are closed after this many seconds.
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            handler_lifetime_secs: 300,
            connect_timeout_secs: 5,
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Health endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Path the aggregated report is served on.
    pub path: String,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Additional process liveness checks.
    pub process_monitors: Vec<ProcessMonitorConfig>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            timeout_secs: 5,
            process_monitors: Vec::new(),
        }
    }
}

/// A process that must be running for the instance to be healthy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessMonitorConfig {
    /// Component name shown in the health report.
    pub name: String,

    /// Process name to look for.
    pub process: String,
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Metrics endpoint bind address, used when telemetry is enabled.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
