//! Per-resource resilience policy.

use crate::circuit_breaker::BreakerConfig;
use crate::core::ConfigError;
use crate::limiter::RateLimitConfig;
use crate::retry::RetryPolicy;

use serde::{Deserialize, Serialize};

/// The full resilience policy for one resource: rate limit, breaker
/// thresholds, and retry behavior.
///
/// A resource with no rate limit configuration is unlimited; breaker and
/// retry behavior always apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePolicy {
    /// Rate limit, or `None` for unlimited.
    pub rate_limit: Option<RateLimitConfig>,

    /// Circuit breaker thresholds and timings.
    pub breaker: BreakerConfig,

    /// Retry attempts and backoff bounds.
    pub retry: RetryPolicy,

    /// When `true`, a denied rate-limit admission waits out the window
    /// (bounded by the call deadline, or by one window span without one)
    /// instead of failing immediately with `RateLimited`.
    pub queue_on_rate_limit: bool,
}

impl Default for ResourcePolicy {
    fn default() -> Self {
        Self {
            rate_limit: None,
            breaker: BreakerConfig::default(),
            retry: RetryPolicy::default(),
            queue_on_rate_limit: false,
        }
    }
}

impl ResourcePolicy {
    /// Creates a policy with default values and no rate limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rate limit.
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Sets the breaker configuration.
    pub fn with_breaker(mut self, config: BreakerConfig) -> Self {
        self.breaker = config;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enables or disables waiting out a full rate window.
    pub fn with_queue_on_rate_limit(mut self, queue: bool) -> Self {
        self.queue_on_rate_limit = queue;
        self
    }

    /// Validates every part of the policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(rate_limit) = &self.rate_limit {
            rate_limit.validate()?;
        }
        self.breaker.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_policy_validates() {
        assert!(ResourcePolicy::default().validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let policy = ResourcePolicy::new()
            .with_rate_limit(RateLimitConfig::per_minute(60))
            .with_breaker(BreakerConfig::new().with_failure_threshold(5))
            .with_retry(RetryPolicy::new().with_max_attempts(2))
            .with_queue_on_rate_limit(true);

        assert_eq!(policy.rate_limit.unwrap().max_calls, 60);
        assert_eq!(policy.breaker.failure_threshold, 5);
        assert_eq!(policy.retry.max_attempts, 2);
        assert!(policy.queue_on_rate_limit);
    }

    #[test]
    fn test_validate_propagates_nested_errors() {
        let policy = ResourcePolicy::new()
            .with_rate_limit(RateLimitConfig::new(0, Duration::from_secs(60)));
        assert!(policy.validate().is_err());

        let policy = ResourcePolicy::new()
            .with_breaker(BreakerConfig::new().with_failure_threshold(0));
        assert!(policy.validate().is_err());

        let policy = ResourcePolicy::new().with_retry(RetryPolicy::new().with_max_attempts(0));
        assert!(policy.validate().is_err());
    }
}
