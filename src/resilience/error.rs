//! Final outcomes surfaced by the executor.

use axum::body::Bytes;
use axum::http::StatusCode;
use std::time::Duration;

use crate::resilience::retries::TransientCause;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Retryable failure that outlived the retry budget.
    #[error("{target} failed after {attempts} attempt(s): {cause}")]
    Transient {
        target: String,
        attempts: u32,
        cause: TransientCause,
    },

    /// Rejected by an open circuit; the dependency was not contacted.
    #[error("circuit for {target} is open")]
    CircuitOpen {
        target: String,
        retry_after: Duration,
    },

    /// Non-retryable response.
    #[error("{target} answered {status}")]
    Permanent {
        target: String,
        status: StatusCode,
        body: Bytes,
    },

    #[error("request has no target authority: {0}")]
    InvalidRequest(String),
}

impl ExecutorError {
    pub fn target(&self) -> Option<&str> {
        match self {
            ExecutorError::Transient { target, .. }
            | ExecutorError::CircuitOpen { target, .. }
            | ExecutorError::Permanent { target, .. } => Some(target),
            ExecutorError::InvalidRequest(_) => None,
        }
    }

    /// Status to answer an inbound request with when this call failed.
    pub fn upstream_status(&self) -> StatusCode {
        match self {
            ExecutorError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ExecutorError::Transient { cause, .. } if cause.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ExecutorError::Transient { .. } => StatusCode::BAD_GATEWAY,
            ExecutorError::Permanent { status, .. } => *status,
            ExecutorError::InvalidRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
