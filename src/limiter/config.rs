//! Rate limiter configuration.

use crate::core::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a sliding-window rate limit.
///
/// A resource configured with `max_calls` and `window` never admits more
/// than `max_calls` calls within any window of that duration. Resources
/// without a configuration are implicitly unlimited; absence of
/// configuration is not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum calls admitted within the rolling window.
    pub max_calls: u32,

    /// Duration of the rolling window.
    pub window: Duration,
}

impl RateLimitConfig {
    /// Creates a rate limit of `max_calls` per `window`.
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self { max_calls, window }
    }

    /// Creates a per-minute rate limit.
    pub fn per_minute(max_calls: u32) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }

    /// Creates a per-day rate limit, as used by free-tier API quotas.
    pub fn per_day(max_calls: u32) -> Self {
        Self::new(max_calls, Duration::from_secs(86_400))
    }

    /// Sets the maximum call count.
    pub fn with_max_calls(mut self, max_calls: u32) -> Self {
        self.max_calls = max_calls;
        self
    }

    /// Sets the window duration.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_calls == 0 {
            return Err(ConfigError::NotPositive { field: "max_calls" });
        }
        if self.window.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "window" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let config = RateLimitConfig::per_minute(60);
        assert_eq!(config.max_calls, 60);
        assert_eq!(config.window, Duration::from_secs(60));

        let config = RateLimitConfig::per_day(100);
        assert_eq!(config.window, Duration::from_secs(86_400));
    }

    #[test]
    fn test_validate_rejects_zero_calls() {
        let config = RateLimitConfig::new(0, Duration::from_secs(10));
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "max_calls" })
        );
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = RateLimitConfig::new(5, Duration::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration { field: "window" })
        );
    }

    #[test]
    fn test_builder() {
        let config = RateLimitConfig::per_minute(10).with_max_calls(20);
        assert_eq!(config.max_calls, 20);
        assert!(config.validate().is_ok());
    }
}
