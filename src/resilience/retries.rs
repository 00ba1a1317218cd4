//! Retry logic.
//!
//! # Responsibilities
//! - Classify attempt outcomes as success, transient or permanent
//! - Hold the retry cap and backoff schedule
//!
//! # Design Decisions
//! - Connection errors and timeouts are always transient
//! - 5xx and 408 are transient
//! - 404 is also transient for dependency calls (catalog replicas can lag behind writes)
//! - Every other non-2xx status is permanent and never retried

use axum::http::StatusCode;
use std::fmt;
use std::time::Duration;

use crate::config::ResilienceConfig;
use crate::resilience::backoff::ExponentialBackoff;
use crate::upstream::TransportError;

/// How a response status should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Transient,
    Permanent,
}

/// Classify a response status.
pub fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if is_transient_status(status) {
        StatusClass::Transient
    } else {
        StatusClass::Permanent
    }
}

/// Statuses worth retrying.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::NOT_FOUND
}

/// Why a retryable attempt failed.
#[derive(Debug, Clone)]
pub enum TransientCause {
    /// The dependency answered with a retryable status.
    Status(StatusCode),
    /// No response within the attempt timeout.
    Timeout(Duration),
    /// The transport failed before a response arrived.
    Transport(TransportError),
}

impl TransientCause {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransientCause::Timeout(_))
    }
}

impl fmt::Display for TransientCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientCause::Status(status) => write!(f, "status {}", status),
            TransientCause::Timeout(after) => write!(f, "timed out after {:?}", after),
            TransientCause::Transport(e) => write!(f, "{}", e),
        }
    }
}

/// Retry cap plus backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: ExponentialBackoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: ExponentialBackoff) -> Self {
        Self { max_retries, backoff }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(
            config.retry_count,
            ExponentialBackoff::new(
                config.backoff_exponent_base,
                Duration::from_millis(config.backoff_unit_ms),
                Duration::from_millis(config.jitter_max_ms),
            ),
        )
    }

    /// Whether another retry is allowed after `retries_done` retries.
    pub fn can_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, ExponentialBackoff::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), StatusClass::Success);

        assert_eq!(classify_status(StatusCode::NOT_FOUND), StatusClass::Transient);
        assert_eq!(classify_status(StatusCode::REQUEST_TIMEOUT), StatusClass::Transient);
        assert_eq!(classify_status(StatusCode::INTERNAL_SERVER_ERROR), StatusClass::Transient);
        assert_eq!(classify_status(StatusCode::SERVICE_UNAVAILABLE), StatusClass::Transient);

        assert_eq!(classify_status(StatusCode::BAD_REQUEST), StatusClass::Permanent);
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), StatusClass::Permanent);
        assert_eq!(classify_status(StatusCode::CONFLICT), StatusClass::Permanent);
        assert_eq!(classify_status(StatusCode::MOVED_PERMANENTLY), StatusClass::Permanent);
    }

    #[test]
    fn test_retry_cap() {
        let policy = RetryPolicy::from_config(&ResilienceConfig::default());
        assert!(policy.can_retry(0));
        assert!(policy.can_retry(4));
        assert!(!policy.can_retry(5));
        assert_eq!(policy.backoff.base_delay(1), Duration::from_secs(2));
    }
}
