//! Retry policy configuration and execution.

use crate::core::ConfigError;
#[cfg(feature = "tokio-runtime")]
use crate::core::{Attempt, AttemptHook};

use serde::{Deserialize, Serialize};
#[cfg(feature = "tokio-runtime")]
use std::future::Future;
use std::time::Duration;
#[cfg(feature = "tokio-runtime")]
use std::time::Instant;
use thiserror::Error;

/// Why a retried operation ultimately failed.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed with a retryable error on every permitted
    /// attempt.
    #[error("operation failed after {attempts} attempts")]
    Exhausted {
        /// Number of attempts performed.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: E,
    },

    /// The operation failed with an error classified as fatal; no further
    /// attempts were made.
    #[error("operation failed with a non-retryable error on attempt {attempt}")]
    Fatal {
        /// The attempt that produced the fatal error.
        attempt: u32,
        /// The fatal error.
        #[source]
        source: E,
    },

    /// The deadline elapsed before the operation could succeed. No attempt
    /// starts after the deadline, and an in-flight attempt is cancelled
    /// when it is reached.
    #[error("deadline exceeded after {attempts} attempts")]
    DeadlineExceeded {
        /// Number of attempts performed before the deadline.
        attempts: u32,
    },
}

/// Bounded retry with exponential backoff and jitter.
///
/// The delay before attempt `n + 1` is `min(max_delay, base_delay * 2^n)`
/// (with a configurable multiplier in place of 2), plus a random jitter in
/// `[0, delay / 2)` so that independent processes retrying the same
/// dependency do not synchronize into retry storms.
///
/// The policy knows nothing about circuit breakers; every attempt's
/// outcome is reported through an [`AttemptHook`] so the caller can feed
/// whatever tally it keeps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Upper bound on the computed delay, before jitter.
    pub max_delay: Duration,

    /// Multiplier applied per failed attempt.
    pub backoff_multiplier: f64,

    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that performs exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Validates the policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::NotPositive {
                field: "max_attempts",
            });
        }
        if self.backoff_multiplier < 1.0 {
            return Err(ConfigError::inconsistent(
                "backoff_multiplier must be at least 1.0",
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(ConfigError::inconsistent(
                "max_delay must not be smaller than base_delay",
            ));
        }
        Ok(())
    }

    /// Returns the capped delay after `failed_attempts` attempts have
    /// failed (1-based), without jitter.
    pub fn backoff_delay(&self, failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }
        let exp = self
            .backoff_multiplier
            .powi(failed_attempts.saturating_sub(1).min(i32::MAX as u32) as i32);
        let millis = (self.base_delay.as_millis() as f64 * exp)
            .min(self.max_delay.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }

    /// Applies random jitter in `[0, delay / 2)` to a computed delay.
    pub fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let bound = delay.as_millis() as f64 / 2.0;
        let jitter = rand::random::<f64>() * bound;
        delay + Duration::from_millis(jitter as u64)
    }

    /// Runs `operation` under this policy.
    ///
    /// The operation is re-invoked until it succeeds, fails with an error
    /// `is_retryable` classifies as fatal, or `max_attempts` is reached.
    #[cfg(feature = "tokio-runtime")]
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_observed(operation, is_retryable, &crate::core::NoOpHook, None)
            .await
    }

    /// Runs `operation` under this policy, reporting every attempt's
    /// outcome to `hook` and honoring an optional deadline.
    ///
    /// Backoff sleeps suspend only the calling task. When a deadline is
    /// given, no attempt begins after it, a backoff that would cross it is
    /// abandoned, and an in-flight attempt is cancelled once it is
    /// reached; all three cases return [`RetryError::DeadlineExceeded`].
    #[cfg(feature = "tokio-runtime")]
    pub async fn run_observed<T, E, F, Fut>(
        &self,
        mut operation: F,
        is_retryable: impl Fn(&E) -> bool,
        hook: &dyn AttemptHook,
        deadline: Option<Instant>,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(RetryError::DeadlineExceeded { attempts: attempt });
                }
            }
            attempt += 1;

            let result = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match tokio::time::timeout(remaining, operation()).await {
                        Ok(result) => result,
                        Err(_) => {
                            hook.on_attempt(&Attempt::timed_out(attempt)).await;
                            return Err(RetryError::DeadlineExceeded { attempts: attempt });
                        }
                    }
                }
                None => operation().await,
            };

            match result {
                Ok(value) => {
                    hook.on_attempt(&Attempt::succeeded(attempt)).await;
                    return Ok(value);
                }
                Err(error) => {
                    let retryable = is_retryable(&error);
                    hook.on_attempt(&Attempt::failed(attempt, retryable)).await;

                    if !retryable {
                        return Err(RetryError::Fatal {
                            attempt,
                            source: error,
                        });
                    }
                    if attempt >= self.max_attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            source: error,
                        });
                    }

                    let delay = self.jittered(self.backoff_delay(attempt));
                    if let Some(deadline) = deadline {
                        if Instant::now() + delay >= deadline {
                            return Err(RetryError::DeadlineExceeded { attempts: attempt });
                        }
                    }
                    tracing::debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
