//! Circuit breaker state machine types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Coarse circuit state, for snapshots, events, and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through normally.
    Closed,
    /// Calls are rejected without invoking the operation.
    Open,
    /// Probe calls are being admitted to test recovery.
    HalfOpen,
}

impl CircuitState {
    /// Returns the state name as a stable string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The full state of a circuit breaker, including per-state counters.
#[derive(Debug, Clone)]
pub enum BreakerState {
    /// Circuit is closed; calls pass through.
    Closed {
        /// Number of consecutive failures. Any success resets it to zero.
        consecutive_failures: u32,
    },

    /// Circuit is open; calls are rejected.
    Open {
        /// When the circuit was opened.
        opened_at: Instant,
        /// When the next call may be admitted as a probe.
        until: Instant,
    },

    /// Circuit is half-open; a bounded number of probes may be in flight.
    HalfOpen {
        /// Number of successful probes so far.
        successes: u32,
        /// Number of probes currently in flight.
        in_flight: u32,
    },
}

impl BreakerState {
    /// Creates a fresh closed state.
    pub fn closed() -> Self {
        Self::Closed {
            consecutive_failures: 0,
        }
    }

    /// Returns the coarse state tag.
    pub fn tag(&self) -> CircuitState {
        match self {
            Self::Closed { .. } => CircuitState::Closed,
            Self::Open { .. } => CircuitState::Open,
            Self::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Returns `true` if the circuit is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns `true` if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen { .. })
    }

    /// Returns the consecutive failure count while closed.
    pub fn consecutive_failures(&self) -> Option<u32> {
        match self {
            Self::Closed {
                consecutive_failures,
            } => Some(*consecutive_failures),
            _ => None,
        }
    }
}

impl Default for BreakerState {
    fn default() -> Self {
        Self::closed()
    }
}

/// Counters and timestamps describing a breaker's history.
///
/// Mutated only under the breaker's lock; observers receive copies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreakerMetrics {
    /// Total number of admission requests, including rejected ones.
    pub total_calls: u64,
    /// Number of attempts reported as successes.
    pub successes: u64,
    /// Number of attempts reported as failures.
    pub failures: u64,
    /// Number of calls rejected because the circuit was open.
    pub rejected: u64,
    /// Number of times the circuit has opened.
    pub times_opened: u64,
    /// Number of times the circuit has closed from half-open.
    pub times_closed: u64,
    /// When the last failure was recorded.
    pub last_failure_at: Option<DateTime<Utc>>,
    /// When the state last changed.
    pub last_transition_at: Option<DateTime<Utc>>,
}

impl BreakerMetrics {
    /// Creates empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful attempt.
    pub fn record_success(&mut self) {
        self.total_calls += 1;
        self.successes += 1;
    }

    /// Records a failed attempt.
    pub fn record_failure(&mut self) {
        self.total_calls += 1;
        self.failures += 1;
        self.last_failure_at = Some(Utc::now());
    }

    /// Records a rejected call.
    pub fn record_rejected(&mut self) {
        self.total_calls += 1;
        self.rejected += 1;
    }

    /// Records a state transition.
    pub fn record_transition(&mut self) {
        self.last_transition_at = Some(Utc::now());
    }

    /// Returns the fraction of attempts that succeeded, in `[0, 1]`.
    pub fn success_rate(&self) -> f64 {
        let attempts = self.successes + self.failures;
        if attempts == 0 {
            return 1.0;
        }
        self.successes as f64 / attempts as f64
    }
}
