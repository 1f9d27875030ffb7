//! Error types for the callguard library.
//!
//! This module provides structured, typed errors for all failure scenarios.
//! The library never panics; all errors are returned as `Result` values.
//! Admission denials (rate limit, open circuit) are regular results here,
//! not exceptional control flow.

use crate::core::resource::ResourceName;
use std::time::Duration;
use thiserror::Error;

/// The error type returned by a resilient call.
///
/// Every failure path is tagged with the stage that produced it, so a
/// caller can tell "this dependency is down" (`CircuitOpen`) from "we are
/// calling it too fast" (`RateLimited`) from "it genuinely failed"
/// (`RetriesExhausted` / `NonRetryable`).
///
/// `E` is the error type of the wrapped operation; it is carried as the
/// source of the variants where the operation actually ran.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// The rate limiter denied admission for this resource.
    #[error("rate limit exceeded for resource '{resource}'")]
    RateLimited {
        /// Resource whose window is full.
        resource: ResourceName,
        /// Time until the oldest in-window entry expires, if known.
        wait_hint: Option<Duration>,
    },

    /// The circuit breaker is open for this resource; the operation was
    /// never invoked.
    #[error("circuit open for resource '{resource}'")]
    CircuitOpen {
        /// Resource with the open circuit.
        resource: ResourceName,
        /// Time until the next probe may be admitted, if known.
        retry_in: Option<Duration>,
    },

    /// The operation failed on every permitted attempt.
    #[error("operation on resource '{resource}' failed after {attempts} attempts")]
    RetriesExhausted {
        /// Resource the operation targeted.
        resource: ResourceName,
        /// Number of attempts performed.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: E,
    },

    /// The operation failed with an error classified as fatal; no further
    /// attempts were made.
    #[error("operation on resource '{resource}' failed with a non-retryable error")]
    NonRetryable {
        /// Resource the operation targeted.
        resource: ResourceName,
        /// The fatal error.
        #[source]
        source: E,
    },

    /// The deadline elapsed while waiting for admission, during backoff,
    /// or while an attempt was in flight.
    #[error("deadline exceeded for resource '{resource}' after {elapsed:?}")]
    Timeout {
        /// Resource the call targeted.
        resource: ResourceName,
        /// Wall time spent on the call before giving up.
        elapsed: Duration,
    },
}

impl<E> CallError<E> {
    /// Returns the stage that produced this error, as a stable string.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::NonRetryable { .. } => "non_retryable",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Returns the resource this error is associated with.
    pub fn resource(&self) -> &ResourceName {
        match self {
            Self::RateLimited { resource, .. }
            | Self::CircuitOpen { resource, .. }
            | Self::RetriesExhausted { resource, .. }
            | Self::NonRetryable { resource, .. }
            | Self::Timeout { resource, .. } => resource,
        }
    }

    /// Returns `true` if admission was denied by the rate limiter.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns `true` if the circuit breaker short-circuited the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Returns `true` if the deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the wrapped operation was invoked at least once.
    pub fn operation_ran(&self) -> bool {
        matches!(
            self,
            Self::RetriesExhausted { .. } | Self::NonRetryable { .. } | Self::Timeout { .. }
        )
    }
}

/// Error raised for invalid configuration values.
///
/// Configuration problems are programming misuse and surface at
/// construction time; they are never produced by normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A numeric field that must be positive was zero.
    #[error("{field} must be positive")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A duration field that must be non-zero was zero.
    #[error("{field} must be a non-zero duration")]
    ZeroDuration {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Two fields are mutually inconsistent.
    #[error("invalid configuration: {reason}")]
    Inconsistent {
        /// Description of the inconsistency.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an `Inconsistent` error.
    pub fn inconsistent(reason: impl Into<String>) -> Self {
        Self::Inconsistent {
            reason: reason.into(),
        }
    }
}

/// Classification of operation errors into retryable and fatal.
///
/// Implemented by the error type of a wrapped operation so the caller can
/// decide whether another attempt is worthwhile. Transient conditions
/// (timeouts, connection resets, upstream 5xx) are retryable; malformed
/// requests or failed authentication are not.
pub trait Retryable {
    /// Returns `true` if another attempt at the failed operation could
    /// plausibly succeed.
    fn is_retryable(&self) -> bool;
}
