//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{Environment, StorefrontConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables that override `ApplicationSettings` keys.
pub const PRODUCTS_ENDPOINT_VAR: &str = "ApplicationSettings__ProductsApiEndpoint";
pub const ORDERS_ENDPOINT_VAR: &str = "ApplicationSettings__OrdersApiEndpoint";
pub const INSTRUMENTATION_KEY_VAR: &str = "ApplicationSettings__InstrumentationKey";
pub const ENVIRONMENT_VAR: &str = "STOREFRONT_ENVIRONMENT";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<StorefrontConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    finish(config)
}

/// Build configuration from defaults plus environment overrides.
pub fn load_from_env() -> Result<StorefrontConfig, ConfigError> {
    finish(StorefrontConfig::default())
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<StorefrontConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

fn finish(mut config: StorefrontConfig) -> Result<StorefrontConfig, ConfigError> {
    apply_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `ApplicationSettings__*` style overrides from a variable lookup.
pub fn apply_overrides<F>(config: &mut StorefrontConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let settings = &mut config.application_settings;
    if let Some(value) = lookup(PRODUCTS_ENDPOINT_VAR) {
        settings.products_api_endpoint = value;
    }
    if let Some(value) = lookup(ORDERS_ENDPOINT_VAR) {
        settings.orders_api_endpoint = value;
    }
    if let Some(value) = lookup(INSTRUMENTATION_KEY_VAR) {
        settings.instrumentation_key = Some(value);
    }
    if let Some(value) = lookup(ENVIRONMENT_VAR) {
        match Environment::parse(&value) {
            Some(environment) => config.environment = environment,
            None => tracing::warn!(value = %value, "Ignoring unknown environment name"),
        }
    }
}
