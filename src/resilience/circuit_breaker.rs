//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: one trial call tests whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: open_duration elapsed (single CAS winner takes the trial)
//! Half-Open → Closed: trial succeeds
//! Half-Open → Open: trial fails (timer restarts)
//! ```
//!
//! State and the time it was entered share one `AtomicU64`, so every
//! transition is a compare-and-swap on a single word and concurrent callers
//! cannot both win it. The failure counter sits beside it and is only
//! consulted while the word says Closed.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::ResilienceConfig;
use crate::observability::metrics;

const STATE_SHIFT: u32 = 62;
const STAMP_MASK: u64 = (1 << STATE_SHIFT) - 1;

/// Circuit state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_bits(bits: u64) -> Self {
        match bits {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn pack(state: CircuitState, stamp_ms: u64) -> u64 {
    ((state as u64) << STATE_SHIFT) | (stamp_ms & STAMP_MASK)
}

fn unpack(word: u64) -> (CircuitState, u64) {
    (CircuitState::from_bits(word >> STATE_SHIFT), word & STAMP_MASK)
}

const CLOSED: u64 = 0;

/// Thresholds shared by every circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerPolicy {
    pub failure_threshold: u32,
    pub open_duration: Duration,
}

impl CircuitBreakerPolicy {
    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            open_duration: config.open_duration(),
        }
    }
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
        }
    }
}

/// How a call was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed.
    Normal,
    /// The single half-open trial.
    Trial,
}

/// A call refused without contacting the dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    /// Time left until a trial may be attempted. Zero while a trial is in flight.
    pub retry_after: Duration,
}

/// Circuit for one call target.
#[derive(Debug)]
pub struct CircuitBreaker {
    target: String,
    policy: CircuitBreakerPolicy,
    epoch: Instant,
    word: AtomicU64,
    consecutive_failures: AtomicU32,
}

impl CircuitBreaker {
    pub fn new(target: impl Into<String>, policy: CircuitBreakerPolicy) -> Self {
        Self {
            target: target.into(),
            policy,
            epoch: Instant::now(),
            word: AtomicU64::new(CLOSED),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> CircuitState {
        unpack(self.word.load(Ordering::Acquire)).0
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn open_ms(&self) -> u64 {
        self.policy.open_duration.as_millis() as u64
    }

    /// Ask to start a call.
    pub fn try_acquire(&self) -> Result<Admission, Rejected> {
        loop {
            let current = self.word.load(Ordering::Acquire);
            let (state, stamp) = unpack(current);
            let now = self.now_ms();
            let elapsed = now.saturating_sub(stamp);

            match state {
                CircuitState::Closed => return Ok(Admission::Normal),
                CircuitState::Open if elapsed < self.open_ms() => {
                    return Err(Rejected {
                        retry_after: Duration::from_millis(self.open_ms() - elapsed),
                    });
                }
                // A trial that outlived a whole open window was abandoned
                // (its caller went away); let a new caller take it over.
                CircuitState::HalfOpen if elapsed < self.open_ms() => {
                    return Err(Rejected {
                        retry_after: Duration::ZERO,
                    });
                }
                CircuitState::Open | CircuitState::HalfOpen => {
                    let next = pack(CircuitState::HalfOpen, now);
                    if self
                        .word
                        .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.log_transition(state, CircuitState::HalfOpen, "open_duration_elapsed");
                        return Ok(Admission::Trial);
                    }
                }
            }
        }
    }

    /// Report a successful call.
    pub fn record_success(&self, _admission: Admission) {
        self.consecutive_failures.store(0, Ordering::Release);

        loop {
            let current = self.word.load(Ordering::Acquire);
            match unpack(current).0 {
                CircuitState::HalfOpen => {
                    if self
                        .word
                        .compare_exchange(current, CLOSED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.consecutive_failures.store(0, Ordering::Release);
                        self.log_transition(CircuitState::HalfOpen, CircuitState::Closed, "trial_succeeded");
                        return;
                    }
                }
                // A late success from a call admitted before the circuit
                // opened does not close it.
                CircuitState::Closed | CircuitState::Open => return,
            }
        }
    }

    /// Report a failed logical call.
    pub fn record_failure(&self, admission: Admission) {
        match admission {
            Admission::Trial => self.reopen(),
            Admission::Normal => {
                if self.state() != CircuitState::Closed {
                    return;
                }
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures < self.policy.failure_threshold {
                    return;
                }
                let next = pack(CircuitState::Open, self.now_ms());
                if self
                    .word
                    .compare_exchange(CLOSED, next, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    self.consecutive_failures.store(0, Ordering::Release);
                    tracing::warn!(
                        target_service = %self.target,
                        failures,
                        open_secs = self.policy.open_duration.as_secs(),
                        "Circuit opened"
                    );
                    self.log_transition(CircuitState::Closed, CircuitState::Open, "failure_threshold_reached");
                }
            }
        }
    }

    fn reopen(&self) {
        loop {
            let current = self.word.load(Ordering::Acquire);
            if unpack(current).0 != CircuitState::HalfOpen {
                return;
            }
            let next = pack(CircuitState::Open, self.now_ms());
            if self
                .word
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.consecutive_failures.store(0, Ordering::Release);
                self.log_transition(CircuitState::HalfOpen, CircuitState::Open, "trial_failed");
                return;
            }
        }
    }

    fn log_transition(&self, from: CircuitState, to: CircuitState, reason: &'static str) {
        tracing::info!(
            event = "circuit_transition",
            target_service = %self.target,
            from = %from,
            to = %to,
            reason,
            "Circuit state changed"
        );
        metrics::record_circuit_transition(&self.target, to.as_str());
    }
}

/// One circuit per call target, created on first use.
#[derive(Debug)]
pub struct CircuitRegistry {
    policy: CircuitBreakerPolicy,
    circuits: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitRegistry {
    pub fn new(policy: CircuitBreakerPolicy) -> Self {
        Self {
            policy,
            circuits: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &CircuitBreakerPolicy {
        &self.policy
    }

    /// The circuit for `target`.
    pub fn get(&self, target: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.circuits.get(target) {
            return existing.value().clone();
        }
        self.circuits
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(target, self.policy)))
            .value()
            .clone()
    }

    /// Current state of every known circuit, sorted by target.
    pub fn snapshot(&self) -> Vec<(String, CircuitState)> {
        let mut states: Vec<_> = self
            .circuits
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }
}
