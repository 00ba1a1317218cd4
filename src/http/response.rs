//! Error responses.
//!
//! # Responsibilities
//! - Map executor outcomes to inbound status codes
//! - Render the `{"StatusCode", "Message"}` error document
//! - Carry failure detail to the status-code pages without putting it in the body
//!
//! # Design Decisions
//! - Handlers answer failures with an empty body; the status-code pages
//!   middleware owns the body so production never leaks internals
//! - Development adds the full error chain under `Detail`

use std::any::Any;
use std::error::Error as StdError;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::resilience::ExecutorError;

/// Failure detail attached to an empty error response.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Low-cardinality route name for request metrics.
#[derive(Debug, Clone)]
pub struct RouteLabel(pub String);

/// Failures surfaced by controllers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Dependency(#[from] ExecutorError),

    #[error("unhandled error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Dependency(e) => e.upstream_status(),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Dependency(ExecutorError::Permanent { .. }) => {
                tracing::info!(status = %status, error = %self, "Dependency rejected request");
            }
            _ => tracing::error!(status = %status, error = %self, "Request failed"),
        }

        let mut response = status.into_response();
        if let AppError::Dependency(ExecutorError::CircuitOpen { retry_after, .. }) = &self {
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response.extensions_mut().insert(ErrorDetail(error_chain(&self)));
        response
    }
}

/// `error: cause: cause ...`
pub fn error_chain(error: &dyn StdError) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

/// The error document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDocument {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorDocument {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status_code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Error").to_string(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Turns a caught panic into an empty 500 that the status-code pages render.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %message, "Handler panicked");

    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response
        .extensions_mut()
        .insert(ErrorDetail(format!("handler panicked: {message}")));
    response
}
