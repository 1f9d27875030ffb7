//! Circuit breaker implementation.

use crate::circuit_breaker::config::BreakerConfig;
use crate::circuit_breaker::state::{BreakerMetrics, BreakerState, CircuitState};
use crate::core::{Attempt, AttemptHook, AttemptOutcome, ResourceName};
use crate::events;

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Why a call was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    /// Time until the next probe may be admitted, if known. `None` while
    /// half-open with all probe slots taken.
    pub retry_in: Option<Duration>,
}

/// A circuit breaker for one named resource.
///
/// The breaker fails fast once a resource has been unreliable, so callers
/// stop wasting time and quota on a dependency expected to fail.
///
/// # States
///
/// - **Closed**: normal operation. Consecutive failures are counted; any
///   success resets the count.
/// - **Open**: all calls are rejected without invoking the operation. Once
///   the open duration elapses, the next call is admitted as a probe and
///   the state moves to half-open before that probe executes.
/// - **Half-open**: a bounded number of probes (one by default) may be in
///   flight; additional callers are rejected as if open until a probe
///   resolves. Enough probe successes close the circuit; any probe failure
///   reopens it and restarts the open timer.
///
/// The breaker never inspects errors. Callers report each attempt through
/// [`record_success`](CircuitBreaker::record_success) and
/// [`record_failure`](CircuitBreaker::record_failure); what counts as a
/// failure is the retry policy's concern.
///
/// All state lives under one exclusive per-resource lock; breakers for
/// different resources never contend. The lock is held only for the state
/// check or update, never across the external call itself.
#[derive(Debug)]
pub struct CircuitBreaker {
    resource: ResourceName,
    config: BreakerConfig,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    state: BreakerState,
    metrics: BreakerMetrics,
}

impl CircuitBreaker {
    /// Creates a breaker for `resource` with the given configuration.
    pub fn new(resource: impl Into<ResourceName>, config: BreakerConfig) -> Self {
        Self {
            resource: resource.into(),
            config,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Creates a breaker with default configuration.
    pub fn with_defaults(resource: impl Into<ResourceName>) -> Self {
        Self::new(resource, BreakerConfig::default())
    }

    /// Returns the resource this breaker guards.
    pub fn resource(&self) -> &ResourceName {
        &self.resource
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> BreakerState {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .state
            .clone()
    }

    /// Returns a copy of the current metrics.
    pub fn metrics(&self) -> BreakerMetrics {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .metrics
            .clone()
    }

    /// Returns the consecutive failure count, zero outside the closed state.
    pub fn consecutive_failures(&self) -> u32 {
        self.state().consecutive_failures().unwrap_or(0)
    }

    /// Asks whether a call may proceed.
    ///
    /// While open, this performs the lazy open-to-half-open transition once
    /// the open duration has elapsed; the admitted caller is the probe and
    /// must report its outcome via `record_success` or `record_failure`,
    /// otherwise the probe slot stays occupied.
    pub fn try_acquire(&self) -> Result<(), Rejection> {
        let mut transition = None;
        let result = {
            let mut guard = self
                .inner
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let inner = &mut *guard;
            let now = Instant::now();

            match inner.state.clone() {
                BreakerState::Closed { .. } => Ok(()),

                BreakerState::Open { until, .. } => {
                    if now >= until {
                        inner.state = BreakerState::HalfOpen {
                            successes: 0,
                            in_flight: 1,
                        };
                        inner.metrics.record_transition();
                        transition = Some((CircuitState::Open, CircuitState::HalfOpen));
                        Ok(())
                    } else {
                        inner.metrics.record_rejected();
                        Err(Rejection {
                            retry_in: Some(until - now),
                        })
                    }
                }

                BreakerState::HalfOpen {
                    successes,
                    in_flight,
                } => {
                    if in_flight < self.config.half_open_max_probes {
                        inner.state = BreakerState::HalfOpen {
                            successes,
                            in_flight: in_flight + 1,
                        };
                        Ok(())
                    } else {
                        inner.metrics.record_rejected();
                        Err(Rejection { retry_in: None })
                    }
                }
            }
        };

        if let Some((from, to)) = transition {
            tracing::info!(
                resource = %self.resource,
                "circuit half-open, admitting probe"
            );
            events::emit_circuit_transition(&self.resource, from, to, 0);
        }

        result
    }

    /// Records a successful attempt.
    pub fn record_success(&self) {
        let mut closed_from_half_open = false;
        {
            let mut guard = self
                .inner
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let inner = &mut *guard;
            inner.metrics.record_success();

            match inner.state.clone() {
                BreakerState::Closed { .. } => {
                    // Any success resets the consecutive failure count
                    inner.state = BreakerState::closed();
                }

                BreakerState::HalfOpen {
                    successes,
                    in_flight,
                } => {
                    let successes = successes + 1;
                    if successes >= self.config.half_open_success_threshold {
                        inner.state = BreakerState::closed();
                        inner.metrics.times_closed += 1;
                        inner.metrics.record_transition();
                        closed_from_half_open = true;
                    } else {
                        inner.state = BreakerState::HalfOpen {
                            successes,
                            in_flight: in_flight.saturating_sub(1),
                        };
                    }
                }

                BreakerState::Open { .. } => {
                    // A straggler reporting after the circuit re-opened;
                    // the metrics entry is enough.
                }
            }
        }

        if closed_from_half_open {
            tracing::info!(resource = %self.resource, "circuit recovered, now closed");
            events::emit_circuit_transition(
                &self.resource,
                CircuitState::HalfOpen,
                CircuitState::Closed,
                0,
            );
        }
    }

    /// Records a failed attempt.
    pub fn record_failure(&self) {
        let mut opened_from = None;
        let mut failures_seen = 0;
        {
            let mut guard = self
                .inner
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let inner = &mut *guard;
            inner.metrics.record_failure();
            let now = Instant::now();

            match inner.state.clone() {
                BreakerState::Closed {
                    consecutive_failures,
                } => {
                    let consecutive_failures = consecutive_failures + 1;
                    failures_seen = consecutive_failures;
                    if consecutive_failures >= self.config.failure_threshold {
                        inner.state = BreakerState::Open {
                            opened_at: now,
                            until: now + self.config.open_duration,
                        };
                        inner.metrics.times_opened += 1;
                        inner.metrics.record_transition();
                        opened_from = Some(CircuitState::Closed);
                    } else {
                        inner.state = BreakerState::Closed {
                            consecutive_failures,
                        };
                    }
                }

                BreakerState::HalfOpen { .. } => {
                    // Any probe failure reopens and restarts the timer
                    inner.state = BreakerState::Open {
                        opened_at: now,
                        until: now + self.config.open_duration,
                    };
                    inner.metrics.times_opened += 1;
                    inner.metrics.record_transition();
                    opened_from = Some(CircuitState::HalfOpen);
                }

                BreakerState::Open { .. } => {
                    // Already open; the metrics entry is enough.
                }
            }
        }

        match opened_from {
            Some(from) => {
                tracing::error!(
                    resource = %self.resource,
                    open_for = ?self.config.open_duration,
                    "circuit tripped open"
                );
                events::emit_circuit_transition(&self.resource, from, CircuitState::Open, failures_seen);
            }
            None if failures_seen > 0 => {
                tracing::warn!(
                    resource = %self.resource,
                    failures = failures_seen,
                    threshold = self.config.failure_threshold,
                    "call failed"
                );
            }
            None => {}
        }
    }

    /// Forces the circuit open, restarting the open timer.
    pub fn force_open(&self) {
        let now = Instant::now();
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.state = BreakerState::Open {
            opened_at: now,
            until: now + self.config.open_duration,
        };
        inner.metrics.times_opened += 1;
        inner.metrics.record_transition();
    }

    /// Forces the circuit closed, resetting the failure count.
    pub fn force_close(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.state = BreakerState::closed();
        inner.metrics.record_transition();
    }

    /// Resets state and metrics to their initial values.
    pub fn reset(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *inner = Inner::default();
    }
}

/// An [`AttemptHook`] that feeds attempt outcomes into a breaker.
///
/// Bridges a standalone [`RetryPolicy`](crate::retry::RetryPolicy) run to
/// a breaker's tally: successes call `record_success`, failures and
/// deadline-cancelled attempts call `record_failure`.
#[derive(Debug, Clone)]
pub struct BreakerHook {
    breaker: Arc<CircuitBreaker>,
}

impl BreakerHook {
    /// Creates a hook feeding the given breaker.
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self { breaker }
    }
}

#[async_trait]
impl AttemptHook for BreakerHook {
    async fn on_attempt(&self, attempt: &Attempt) {
        match attempt.outcome {
            AttemptOutcome::Succeeded => self.breaker.record_success(),
            AttemptOutcome::Failed { .. } | AttemptOutcome::TimedOut => {
                self.breaker.record_failure()
            }
        }
    }
}
