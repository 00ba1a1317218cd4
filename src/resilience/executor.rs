//! Resilient call executor.
//!
//! # Data Flow
//! ```text
//! execute(request)
//!     → circuit check (Open → CircuitOpen, no attempt)
//!     → transport.send under the attempt deadline
//!     → classify: success / transient / permanent
//!     → transient with budget left: sleep backoff, back to the circuit check
//!     → final failure: one failure recorded on the circuit
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::Response;

use crate::observability::metrics;
use crate::observability::telemetry::{NoOpTelemetry, Telemetry};
use crate::resilience::circuit_breaker::{Admission, CircuitBreaker, CircuitRegistry};
use crate::resilience::error::ExecutorError;
use crate::resilience::policy::Policy;
use crate::resilience::retries::{classify_status, RetryPolicy, StatusClass, TransientCause};
use crate::resilience::timeouts::{with_deadline, Deadline};
use crate::upstream::{OutboundRequest, Transport};

enum AttemptOutcome {
    Success(Response<Bytes>),
    Transient(TransientCause),
    Permanent(Response<Bytes>),
}

/// Applies a [`Policy`] to calls made through a [`Transport`].
pub struct ResilientExecutor {
    transport: Arc<dyn Transport>,
    policy: Policy,
    retry: Option<RetryPolicy>,
    circuits: Option<CircuitRegistry>,
    attempt_timeout: Duration,
    telemetry: Arc<dyn Telemetry>,
}

impl ResilientExecutor {
    pub fn new(transport: Arc<dyn Transport>, policy: Policy, attempt_timeout: Duration) -> Self {
        Self {
            transport,
            policy,
            retry: policy.retry(),
            circuits: policy.circuit().map(CircuitRegistry::new),
            attempt_timeout,
            telemetry: Arc::new(NoOpTelemetry),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Circuit registry, absent under a retry-only policy.
    pub fn circuits(&self) -> Option<&CircuitRegistry> {
        self.circuits.as_ref()
    }

    /// Execute `request` under the configured policy.
    pub async fn execute(&self, request: OutboundRequest) -> Result<Response<Bytes>, ExecutorError> {
        let target = request
            .target()
            .ok_or_else(|| ExecutorError::InvalidRequest(request.uri.to_string()))?
            .to_string();
        let circuit = self.circuits.as_ref().map(|registry| registry.get(&target));
        let mut retries = 0u32;

        loop {
            let admission = match circuit.as_deref().map(CircuitBreaker::try_acquire) {
                None => Admission::Normal,
                Some(Ok(admission)) => admission,
                Some(Err(rejected)) => {
                    tracing::debug!(
                        target_service = %target,
                        retry_after = ?rejected.retry_after,
                        "Circuit open, failing fast"
                    );
                    metrics::record_dependency_call(&target, "circuit_open");
                    return Err(ExecutorError::CircuitOpen {
                        target,
                        retry_after: rejected.retry_after,
                    });
                }
            };

            let started = Instant::now();
            let outcome = self.attempt(request.clone()).await;
            self.telemetry.track_dependency(
                &target,
                matches!(outcome, AttemptOutcome::Success(_)),
                started.elapsed(),
            );

            match outcome {
                AttemptOutcome::Success(response) => {
                    if let Some(circuit) = &circuit {
                        circuit.record_success(admission);
                    }
                    return Ok(response);
                }
                AttemptOutcome::Permanent(response) => {
                    if let Some(circuit) = &circuit {
                        circuit.record_failure(admission);
                    }
                    let (parts, body) = response.into_parts();
                    tracing::warn!(target_service = %target, status = %parts.status, "Dependency call failed permanently");
                    return Err(ExecutorError::Permanent {
                        target,
                        status: parts.status,
                        body,
                    });
                }
                AttemptOutcome::Transient(cause) => {
                    // A half-open trial gets exactly one attempt.
                    let retry = self
                        .retry
                        .filter(|policy| admission == Admission::Normal && policy.can_retry(retries));

                    match retry {
                        Some(policy) => {
                            retries += 1;
                            let delay = policy.backoff.next_delay(retries);
                            tracing::info!(
                                target_service = %target,
                                retry = retries,
                                delay = ?delay,
                                cause = %cause,
                                "Retrying dependency call"
                            );
                            metrics::record_retry(&target);
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            if let Some(circuit) = &circuit {
                                circuit.record_failure(admission);
                            }
                            tracing::warn!(
                                target_service = %target,
                                attempts = retries + 1,
                                cause = %cause,
                                "Dependency call failed"
                            );
                            return Err(ExecutorError::Transient {
                                target,
                                attempts: retries + 1,
                                cause,
                            });
                        }
                    }
                }
            }
        }
    }

    async fn attempt(&self, request: OutboundRequest) -> AttemptOutcome {
        match with_deadline(self.attempt_timeout, self.transport.send(request)).await {
            Deadline::Completed(Ok(response)) => match classify_status(response.status()) {
                StatusClass::Success => AttemptOutcome::Success(response),
                StatusClass::Transient => AttemptOutcome::Transient(TransientCause::Status(response.status())),
                StatusClass::Permanent => AttemptOutcome::Permanent(response),
            },
            Deadline::Completed(Err(e)) => AttemptOutcome::Transient(TransientCause::Transport(e)),
            Deadline::Elapsed(after) => AttemptOutcome::Transient(TransientCause::Timeout(after)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::{CircuitBreakerPolicy, CircuitState};
    use crate::resilience::retries::RetryPolicy;
    use crate::upstream::TransportError;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::advance;

    #[derive(Clone, Copy)]
    enum Step {
        Status(u16),
        Refuse,
        Hang,
    }

    struct ScriptedTransport<F> {
        calls: AtomicUsize,
        script: F,
    }

    impl<F> ScriptedTransport<F>
    where
        F: Fn(usize) -> Step + Send + Sync + 'static,
    {
        fn new(script: F) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<F> Transport for ScriptedTransport<F>
    where
        F: Fn(usize) -> Step + Send + Sync + 'static,
    {
        async fn send(&self, _request: OutboundRequest) -> Result<Response<Bytes>, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            match (self.script)(n) {
                Step::Status(code) => Ok(Response::builder()
                    .status(code)
                    .body(Bytes::from_static(b"{}"))
                    .unwrap()),
                Step::Refuse => Err(TransportError::Connect("connection refused".into())),
                Step::Hang => std::future::pending().await,
            }
        }
    }

    fn request() -> OutboundRequest {
        OutboundRequest::get("http://products.local/api/products".parse().unwrap())
    }

    fn executor(transport: Arc<dyn Transport>, policy: Policy) -> ResilientExecutor {
        ResilientExecutor::new(transport, policy, Duration::from_secs(10))
    }

    fn circuit_of(executor: &ResilientExecutor) -> Arc<CircuitBreaker> {
        executor.circuits().unwrap().get("products.local")
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_attempt() {
        let transport = ScriptedTransport::new(|_| Step::Status(200));
        let exec = executor(transport.clone(), Policy::default());

        let response = exec.execute(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success_with_backoff() {
        let transport = ScriptedTransport::new(|n| if n < 2 { Step::Status(503) } else { Step::Status(200) });
        let exec = executor(transport.clone(), Policy::default());

        let start = tokio::time::Instant::now();
        let response = exec.execute(request()).await.unwrap();
        let waited = start.elapsed();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(transport.calls(), 3);
        // 2s + 4s plus at most 2 x 100ms of jitter
        assert!(waited >= Duration::from_secs(6), "waited {:?}", waited);
        assert!(waited < Duration::from_millis(6200), "waited {:?}", waited);
        assert_eq!(circuit_of(&exec).consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_retried_to_the_cap() {
        let transport = ScriptedTransport::new(|_| Step::Status(404));
        let exec = executor(transport.clone(), Policy::default());

        let err = exec.execute(request()).await.unwrap_err();
        match err {
            ExecutorError::Transient { attempts, cause, .. } => {
                assert_eq!(attempts, 6);
                assert!(matches!(cause, TransientCause::Status(StatusCode::NOT_FOUND)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(transport.calls(), 6);
        // six attempts count as one failed call
        assert_eq!(circuit_of(&exec).consecutive_failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_not_retried() {
        let transport = ScriptedTransport::new(|_| Step::Status(400));
        let exec = executor(transport.clone(), Policy::default());

        let err = exec.execute(request()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Permanent { status: StatusCode::BAD_REQUEST, .. }));
        assert_eq!(err.upstream_status(), StatusCode::BAD_REQUEST);
        assert_eq!(transport.calls(), 1);
        assert_eq!(circuit_of(&exec).consecutive_failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_fails_fast_without_transport() {
        let transport = ScriptedTransport::new(|_| Step::Status(500));
        let exec = executor(transport.clone(), Policy::default());

        for _ in 0..5 {
            assert!(exec.execute(request()).await.is_err());
        }
        assert_eq!(circuit_of(&exec).state(), CircuitState::Open);
        let calls_when_opened = transport.calls();
        assert_eq!(calls_when_opened, 30);

        advance(Duration::from_secs(10)).await;
        let err = exec.execute(request()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::CircuitOpen { .. }));
        assert_eq!(err.upstream_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(transport.calls() - calls_when_opened, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_opened_during_backoff_stops_retries() {
        let transport = ScriptedTransport::new(|_| Step::Status(503));
        let exec = Arc::new(executor(transport.clone(), Policy::default()));

        let call = tokio::spawn({
            let exec = exec.clone();
            async move { exec.execute(request()).await }
        });

        // first backoff is 2s plus jitter; the call is asleep at 1s
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.calls(), 1);

        let circuit = circuit_of(&exec);
        for _ in 0..5 {
            let admission = circuit.try_acquire().unwrap();
            circuit.record_failure(admission);
        }
        assert_eq!(circuit.state(), CircuitState::Open);

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, ExecutorError::CircuitOpen { .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_success_closes_circuit() {
        let healthy = Arc::new(AtomicBool::new(false));
        let flag = healthy.clone();
        let transport = ScriptedTransport::new(move |_| {
            if flag.load(Ordering::SeqCst) {
                Step::Status(200)
            } else {
                Step::Refuse
            }
        });
        let exec = executor(transport.clone(), Policy::CircuitBreaker(CircuitBreakerPolicy::default()));

        for _ in 0..5 {
            assert!(exec.execute(request()).await.is_err());
        }
        assert_eq!(transport.calls(), 5);
        assert_eq!(circuit_of(&exec).state(), CircuitState::Open);

        advance(Duration::from_secs(30)).await;
        healthy.store(true, Ordering::SeqCst);

        assert!(exec.execute(request()).await.is_ok());
        assert_eq!(transport.calls(), 6);
        assert_eq!(circuit_of(&exec).state(), CircuitState::Closed);
        assert_eq!(circuit_of(&exec).consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_failure_reopens_without_retry() {
        let transport = ScriptedTransport::new(|_| Step::Status(503));
        let exec = executor(transport.clone(), Policy::default());

        for _ in 0..5 {
            let _ = exec.execute(request()).await;
        }
        let before = transport.calls();
        advance(Duration::from_secs(30)).await;

        let err = exec.execute(request()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Transient { attempts: 1, .. }));
        assert_eq!(transport.calls() - before, 1);
        assert_eq!(circuit_of(&exec).state(), CircuitState::Open);

        advance(Duration::from_secs(29)).await;
        assert!(matches!(
            exec.execute(request()).await,
            Err(ExecutorError::CircuitOpen { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_transient() {
        let transport = ScriptedTransport::new(|n| if n == 0 { Step::Hang } else { Step::Status(200) });
        let retry = RetryPolicy::new(1, crate::resilience::backoff::ExponentialBackoff::default());
        let exec = executor(transport.clone(), Policy::Retry(retry));

        assert!(exec.execute(request()).await.is_ok());
        assert_eq!(transport.calls(), 2);

        let transport = ScriptedTransport::new(|_| Step::Hang);
        let exec = executor(transport.clone(), Policy::CircuitBreaker(CircuitBreakerPolicy::default()));
        let err = exec.execute(request()).await.unwrap_err();
        assert_eq!(err.upstream_status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_only_policy_has_no_circuit() {
        let transport = ScriptedTransport::new(|_| Step::Refuse);
        let retry = RetryPolicy::new(0, crate::resilience::backoff::ExponentialBackoff::default());
        let exec = executor(transport.clone(), Policy::Retry(retry));

        for _ in 0..10 {
            assert!(matches!(
                exec.execute(request()).await,
                Err(ExecutorError::Transient { .. })
            ));
        }
        assert!(exec.circuits().is_none());
        assert_eq!(transport.calls(), 10);
    }

    #[tokio::test]
    async fn test_relative_uri_rejected() {
        let transport = ScriptedTransport::new(|_| Step::Status(200));
        let exec = executor(transport.clone(), Policy::default());

        let err = exec
            .execute(OutboundRequest::get("/api/products".parse().unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidRequest(_)));
        assert_eq!(transport.calls(), 0);
    }
}
