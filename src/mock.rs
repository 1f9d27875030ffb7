//! Mock service for testing.
//!
//! This module provides a configurable fake operation source that can be
//! used in tests to simulate flaky, slow, or dead external services
//! without touching the network.

use crate::core::Retryable;

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// The scripted outcome of one mock invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    /// Return `Ok` with the invocation index.
    Succeed,
    /// Return a retryable error.
    FailRetryable,
    /// Return a fatal error.
    FailFatal,
    /// Never resolve (sleeps far longer than any sane deadline).
    Hang,
}

/// Error returned by a [`MockService`] invocation.
#[derive(Debug, Clone, Error)]
#[error("mock service '{service}' failed (retryable: {retryable})")]
pub struct MockError {
    /// Name of the failing service.
    pub service: String,
    /// Whether the failure is classified as retryable.
    pub retryable: bool,
}

impl Retryable for MockError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// A fake external service with scripted outcomes.
///
/// Outcomes are consumed front-to-back from a script; once the script is
/// exhausted, every further invocation uses the default outcome. An atomic
/// counter records how many invocations actually ran, which is how tests
/// assert that a breaker or limiter really did short-circuit.
///
/// # Examples
///
/// ```rust
/// use callguard::mock::MockService;
///
/// // Fails twice, then succeeds forever
/// let service = MockService::new("gemini").fail_times(2);
/// ```
#[derive(Debug)]
pub struct MockService {
    name: String,
    script: Mutex<VecDeque<MockOutcome>>,
    default_outcome: MockOutcome,
    latency: Option<Duration>,
    invocations: AtomicU64,
}

impl MockService {
    /// Creates a service that always succeeds.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            default_outcome: MockOutcome::Succeed,
            latency: None,
            invocations: AtomicU64::new(0),
        }
    }

    /// Creates a service that always fails with a retryable error.
    pub fn always_failing(name: impl Into<String>) -> Self {
        Self {
            default_outcome: MockOutcome::FailRetryable,
            ..Self::new(name)
        }
    }

    /// Sets the outcome used once the script is exhausted.
    pub fn with_default_outcome(mut self, outcome: MockOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Prepends `count` retryable failures to the script.
    pub fn fail_times(self, count: usize) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            for _ in 0..count {
                script.push_back(MockOutcome::FailRetryable);
            }
        }
        self
    }

    /// Replaces the script with an explicit outcome sequence.
    pub fn with_script(self, outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            script.clear();
            script.extend(outcomes);
        }
        self
    }

    /// Sets a simulated latency per invocation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of invocations that actually ran.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Performs one invocation, consuming the next scripted outcome.
    ///
    /// Returns the 1-based invocation index on success.
    #[cfg(feature = "tokio-runtime")]
    pub async fn invoke(&self) -> Result<u64, MockError> {
        let index = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;

        let outcome = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(self.default_outcome);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match outcome {
            MockOutcome::Succeed => Ok(index),
            MockOutcome::FailRetryable => Err(MockError {
                service: self.name.clone(),
                retryable: true,
            }),
            MockOutcome::FailFatal => Err(MockError {
                service: self.name.clone(),
                retryable: false,
            }),
            MockOutcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(index)
            }
        }
    }
}

impl fmt::Display for MockService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock service '{}'", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_default_succeeds() {
        let service = MockService::new("gemini");
        assert_eq!(service.invoke().await.unwrap(), 1);
        assert_eq!(service.invoke().await.unwrap(), 2);
        assert_eq!(service.invocations(), 2);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_script_consumed_in_order() {
        let service = MockService::new("gemini").with_script([
            MockOutcome::FailRetryable,
            MockOutcome::FailFatal,
            MockOutcome::Succeed,
        ]);

        let err = service.invoke().await.unwrap_err();
        assert!(err.is_retryable());

        let err = service.invoke().await.unwrap_err();
        assert!(!err.is_retryable());

        assert!(service.invoke().await.is_ok());
        // Script exhausted: back to the default outcome
        assert!(service.invoke().await.is_ok());
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_fail_times_then_recovers() {
        let service = MockService::new("newsapi").fail_times(2);
        assert!(service.invoke().await.is_err());
        assert!(service.invoke().await.is_err());
        assert!(service.invoke().await.is_ok());
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_always_failing() {
        let service = MockService::always_failing("whatsapp");
        for _ in 0..5 {
            assert!(service.invoke().await.is_err());
        }
        assert_eq!(service.invocations(), 5);
    }
}
