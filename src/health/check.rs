//! Individual health checks.
//!
//! # Design Decisions
//! - Probes are direct: no retry, no circuit, one bounded attempt
//! - Every failure becomes an Unhealthy result carrying its cause
//! - Checks never return errors to the aggregator

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{StatusCode, Uri};

use crate::health::report::HealthCheckResult;
use crate::resilience::timeouts::{with_deadline, Deadline};
use crate::upstream::{OutboundRequest, Transport, TransportError};

/// A named dependency probe.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> HealthCheckResult;
}

/// Why a probe failed.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("probe returned status {0}")]
    Status(StatusCode),

    #[error("process '{0}' is not running")]
    ProcessNotRunning(String),

    #[error("process enumeration failed: {0}")]
    ProcessEnumeration(String),

    #[error("process enumeration unsupported on this platform")]
    Unsupported,

    #[error("health check panicked")]
    Panicked,
}

impl From<ProbeError> for HealthCheckResult {
    fn from(error: ProbeError) -> Self {
        HealthCheckResult::unhealthy(error.to_string())
    }
}

impl From<Result<(), ProbeError>> for HealthCheckResult {
    fn from(result: Result<(), ProbeError>) -> Self {
        match result {
            Ok(()) => HealthCheckResult::healthy(),
            Err(e) => e.into(),
        }
    }
}

/// GET a URI; any 2xx is healthy.
pub struct UrlHealthCheck {
    uri: Uri,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl UrlHealthCheck {
    pub fn new(uri: Uri, transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            uri,
            transport,
            timeout,
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    async fn probe(&self) -> Result<(), ProbeError> {
        let request = OutboundRequest::get(self.uri.clone());
        match with_deadline(self.timeout, self.transport.send(request)).await {
            Deadline::Completed(Ok(response)) if response.status().is_success() => Ok(()),
            Deadline::Completed(Ok(response)) => Err(ProbeError::Status(response.status())),
            Deadline::Completed(Err(e)) => Err(e.into()),
            Deadline::Elapsed(after) => Err(ProbeError::Timeout(after)),
        }
    }
}

#[async_trait]
impl HealthCheck for UrlHealthCheck {
    async fn check(&self) -> HealthCheckResult {
        let result = self.probe().await;
        if let Err(e) = &result {
            tracing::warn!(uri = %self.uri, error = %e, "Health probe failed");
        }
        result.into()
    }
}

/// Healthy while a process with the given name is running.
pub struct ProcessHealthCheck {
    process: String,
}

impl ProcessHealthCheck {
    pub fn new(process: impl Into<String>) -> Self {
        Self {
            process: process.into(),
        }
    }

    async fn probe(&self) -> Result<(), ProbeError> {
        if is_running(&self.process).await? {
            Ok(())
        } else {
            Err(ProbeError::ProcessNotRunning(self.process.clone()))
        }
    }
}

#[async_trait]
impl HealthCheck for ProcessHealthCheck {
    async fn check(&self) -> HealthCheckResult {
        self.probe().await.into()
    }
}

/// The kernel truncates `comm` to 15 bytes.
#[cfg(target_os = "linux")]
const COMM_LEN: usize = 15;

#[cfg(target_os = "linux")]
async fn is_running(name: &str) -> Result<bool, ProbeError> {
    let wanted: String = name.chars().take(COMM_LEN).collect();
    let mut dir = tokio::fs::read_dir("/proc")
        .await
        .map_err(|e| ProbeError::ProcessEnumeration(e.to_string()))?;

    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| ProbeError::ProcessEnumeration(e.to_string()))?
    {
        let is_pid = entry
            .file_name()
            .to_str()
            .map(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false);
        if !is_pid {
            continue;
        }
        // processes may exit between listing and reading
        if let Ok(comm) = tokio::fs::read_to_string(entry.path().join("comm")).await {
            if comm.trim_end().eq_ignore_ascii_case(&wanted) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[cfg(not(target_os = "linux"))]
async fn is_running(_name: &str) -> Result<bool, ProbeError> {
    Err(ProbeError::Unsupported)
}
