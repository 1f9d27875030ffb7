//! Per-attempt records and the attempt observation seam.

use async_trait::async_trait;

/// The outcome of a single attempt at an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt returned a value.
    Succeeded,
    /// The attempt returned an error.
    Failed {
        /// Whether the error was classified as retryable.
        retryable: bool,
    },
    /// The attempt was cut off by the call deadline before resolving.
    TimedOut,
}

impl AttemptOutcome {
    /// Returns `true` if the attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// One try of an operation under a retry policy.
///
/// Ephemeral: exists only for the duration of one retried call, so hooks
/// can observe what happened without the policy knowing who is listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt index.
    pub index: u32,
    /// What happened.
    pub outcome: AttemptOutcome,
}

impl Attempt {
    /// Creates a record for a successful attempt.
    pub fn succeeded(index: u32) -> Self {
        Self {
            index,
            outcome: AttemptOutcome::Succeeded,
        }
    }

    /// Creates a record for a failed attempt.
    pub fn failed(index: u32, retryable: bool) -> Self {
        Self {
            index,
            outcome: AttemptOutcome::Failed { retryable },
        }
    }

    /// Creates a record for an attempt cancelled by the deadline.
    pub fn timed_out(index: u32) -> Self {
        Self {
            index,
            outcome: AttemptOutcome::TimedOut,
        }
    }
}

/// Observer notified of every attempt's outcome as it resolves.
///
/// The retry policy reports each attempt upward through this trait; it has
/// no idea what the listener does with the information. The usual listener
/// feeds a circuit breaker (see
/// [`BreakerHook`](crate::circuit_breaker::BreakerHook)), but metrics sinks or
/// custom logging work equally well.
#[async_trait]
pub trait AttemptHook: Send + Sync {
    /// Called once per attempt, after the attempt resolves.
    async fn on_attempt(&self, attempt: &Attempt);
}

/// A hook that ignores every attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHook;

#[async_trait]
impl AttemptHook for NoOpHook {
    async fn on_attempt(&self, _attempt: &Attempt) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_constructors() {
        let a = Attempt::succeeded(1);
        assert!(a.outcome.is_success());
        assert_eq!(a.index, 1);

        let a = Attempt::failed(2, true);
        assert_eq!(a.outcome, AttemptOutcome::Failed { retryable: true });

        let a = Attempt::timed_out(3);
        assert_eq!(a.outcome, AttemptOutcome::TimedOut);
        assert!(!a.outcome.is_success());
    }
}
