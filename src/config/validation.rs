//! Configuration validation.
//!
//! Serde handles the syntax; this module checks values that would only fail
//! later at runtime. Every problem is reported, not just the first.

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::StorefrontConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending key.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &StorefrontConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_endpoint(
        &mut errors,
        "application_settings.products_api_endpoint",
        &config.application_settings.products_api_endpoint,
    );
    check_endpoint(
        &mut errors,
        "application_settings.orders_api_endpoint",
        &config.application_settings.orders_api_endpoint,
    );

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.application_settings.telemetry_key().is_some() {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let r = &config.resilience;
    if r.backoff_exponent_base < 2 {
        errors.push(ValidationError::new("resilience.backoff_exponent_base", "must be at least 2"));
    }
    check_positive(&mut errors, "resilience.backoff_unit_ms", r.backoff_unit_ms);
    check_positive(&mut errors, "resilience.failure_threshold", u64::from(r.failure_threshold));
    check_positive(&mut errors, "resilience.open_duration_secs", r.open_duration_secs);
    check_positive(&mut errors, "resilience.attempt_timeout_secs", r.attempt_timeout_secs);
    if r.retry_count > 16 {
        errors.push(ValidationError::new("resilience.retry_count", "must not exceed 16"));
    }

    check_positive(&mut errors, "http_client.handler_lifetime_secs", config.http_client.handler_lifetime_secs);
    check_positive(&mut errors, "http_client.connect_timeout_secs", config.http_client.connect_timeout_secs);

    if !config.health.path.starts_with('/') {
        errors.push(ValidationError::new("health.path", "must start with '/'"));
    }
    check_positive(&mut errors, "health.timeout_secs", config.health.timeout_secs);
    for (i, monitor) in config.health.process_monitors.iter().enumerate() {
        if monitor.name.trim().is_empty() || monitor.process.trim().is_empty() {
            errors.push(ValidationError::new(
                &format!("health.process_monitors[{}]", i),
                "name and process must not be empty",
            ));
        }
    }

    check_positive(&mut errors, "timeouts.request_secs", config.timeouts.request_secs);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "is required"));
        return;
    }
    match Url::parse(value) {
        Ok(url) if url.scheme() != "http" => {
            errors.push(ValidationError::new(field, format!("unsupported scheme '{}'", url.scheme())));
        }
        Ok(url) if url.host().is_none() => {
            errors.push(ValidationError::new(field, "must include a host"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URI: {}", e))),
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("'{}' is not a socket address", value)));
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::new(field, "must be greater than zero"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProcessMonitorConfig;

    fn valid() -> StorefrontConfig {
        let mut config = StorefrontConfig::default();
        config.application_settings.products_api_endpoint = "http://127.0.0.1:5001/".into();
        config.application_settings.orders_api_endpoint = "http://127.0.0.1:5002/".into();
        config
    }

    #[test]
    fn test_defaults_with_endpoints_are_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        let mut config = valid();
        config.application_settings.products_api_endpoint = "https://secure.example/".into();
        config.application_settings.orders_api_endpoint = "not a uri".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("https"));
        assert!(errors[1].message.starts_with("invalid URI"));
    }

    #[test]
    fn test_metrics_address_checked_only_with_telemetry() {
        let mut config = valid();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.application_settings.instrumentation_key = Some("key".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }

    #[test]
    fn test_rejects_bad_policy_and_monitors() {
        let mut config = valid();
        config.resilience.backoff_exponent_base = 1;
        config.resilience.open_duration_secs = 0;
        config.health.path = "health".into();
        config.health.process_monitors.push(ProcessMonitorConfig {
            name: "".into(),
            process: "worker".into(),
        });

        let fields: Vec<String> = validate_config(&config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "resilience.backoff_exponent_base",
                "resilience.open_duration_secs",
                "health.path",
                "health.process_monitors[0]",
            ]
        );
    }
}
