//! Circuit breaker configuration.

use crate::core::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a circuit breaker.
///
/// The defaults mirror a small-scale automation workload (trip after three
/// consecutive failures, probe after a minute); they are starting points,
/// not recommendations. Tune per dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open before the next call is admitted
    /// as a probe.
    pub open_duration: Duration,

    /// Probe successes required in half-open to close the circuit.
    pub half_open_success_threshold: u32,

    /// Maximum number of probes in flight while half-open.
    pub half_open_max_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_duration: Duration::from_secs(60),
            half_open_success_threshold: 1,
            half_open_max_probes: 1,
        }
    }
}

impl BreakerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the open duration.
    pub fn with_open_duration(mut self, duration: Duration) -> Self {
        self.open_duration = duration;
        self
    }

    /// Sets the half-open success threshold.
    pub fn with_half_open_success_threshold(mut self, threshold: u32) -> Self {
        self.half_open_success_threshold = threshold;
        self
    }

    /// Sets the maximum number of in-flight half-open probes.
    pub fn with_half_open_max_probes(mut self, max: u32) -> Self {
        self.half_open_max_probes = max;
        self
    }

    /// Creates a configuration that trips early and recovers cautiously.
    ///
    /// Lower failure threshold, longer open period, and several probe
    /// successes required before trusting the dependency again.
    pub fn cautious() -> Self {
        Self {
            failure_threshold: 2,
            open_duration: Duration::from_secs(120),
            half_open_success_threshold: 3,
            half_open_max_probes: 1,
        }
    }

    /// Creates a configuration that tolerates flaky dependencies.
    ///
    /// Higher failure threshold, short open period, and more concurrent
    /// probes so recovery is detected quickly.
    pub fn tolerant() -> Self {
        Self {
            failure_threshold: 10,
            open_duration: Duration::from_secs(10),
            half_open_success_threshold: 2,
            half_open_max_probes: 3,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::NotPositive {
                field: "failure_threshold",
            });
        }
        if self.open_duration.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "open_duration",
            });
        }
        if self.half_open_success_threshold == 0 {
            return Err(ConfigError::NotPositive {
                field: "half_open_success_threshold",
            });
        }
        if self.half_open_max_probes == 0 {
            return Err(ConfigError::NotPositive {
                field: "half_open_max_probes",
            });
        }
        Ok(())
    }
}
