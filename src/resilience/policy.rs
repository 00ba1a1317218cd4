//! Policy selection for outbound calls.

use crate::config::{PolicyKind, ResilienceConfig};
use crate::resilience::circuit_breaker::CircuitBreakerPolicy;
use crate::resilience::retries::RetryPolicy;

/// The policy an executor applies to every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Retry transient failures; no circuit.
    Retry(RetryPolicy),
    /// One attempt per call, guarded by a per-target circuit.
    CircuitBreaker(CircuitBreakerPolicy),
    /// Retries inside, circuit checked before every attempt and fed once per call.
    Composed {
        retry: RetryPolicy,
        circuit: CircuitBreakerPolicy,
    },
}

impl Policy {
    pub fn from_config(config: &ResilienceConfig) -> Self {
        let retry = RetryPolicy::from_config(config);
        let circuit = CircuitBreakerPolicy::from_config(config);
        match config.policy {
            PolicyKind::Retry => Policy::Retry(retry),
            PolicyKind::CircuitBreaker => Policy::CircuitBreaker(circuit),
            PolicyKind::Composed => Policy::Composed { retry, circuit },
        }
    }

    pub fn retry(&self) -> Option<RetryPolicy> {
        match self {
            Policy::Retry(retry) | Policy::Composed { retry, .. } => Some(*retry),
            Policy::CircuitBreaker(_) => None,
        }
    }

    pub fn circuit(&self) -> Option<CircuitBreakerPolicy> {
        match self {
            Policy::CircuitBreaker(circuit) | Policy::Composed { circuit, .. } => Some(*circuit),
            Policy::Retry(_) => None,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::Composed {
            retry: RetryPolicy::default(),
            circuit: CircuitBreakerPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_variants() {
        let mut config = ResilienceConfig::default();
        assert_eq!(Policy::from_config(&config), Policy::default());

        config.policy = PolicyKind::Retry;
        let policy = Policy::from_config(&config);
        assert!(policy.retry().is_some());
        assert!(policy.circuit().is_none());

        config.policy = PolicyKind::CircuitBreaker;
        let policy = Policy::from_config(&config);
        assert!(policy.retry().is_none());
        assert_eq!(policy.circuit().map(|c| c.failure_threshold), Some(5));
    }
}
