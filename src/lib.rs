//! # Callguard
//!
//! Per-resource rate limiting, circuit breaking, and retry with backoff
//! for programs that call unreliable external services.
//!
//! ## Overview
//!
//! Callguard wraps any fallible operation in a resilience layer keyed by
//! resource name, allowing you to:
//!
//! - Bound how often each external API is called within a rolling window
//! - Fail fast once a dependency has been unreliable, and probe it for
//!   recovery instead of hammering it
//! - Retry transient failures with capped, jittered exponential backoff
//! - Bound whole calls with a deadline that cancels in-flight work
//! - Snapshot every resource's health for dashboards without touching
//!   any lock the callers use
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use callguard::{RateLimitConfig, ResilientCaller, ResourcePolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let caller = ResilientCaller::builder()
//!         .resource(
//!             "gemini",
//!             ResourcePolicy::new().with_rate_limit(RateLimitConfig::per_minute(60)),
//!         )
//!         .build()?;
//!
//!     // Any fallible async operation; its error type says what is
//!     // retryable via the `Retryable` trait.
//!     let summary = caller
//!         .call("gemini", || client.summarize(&articles))
//!         .await?;
//!
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes tokio runtime support
//! - `tokio-runtime` - Async entry points (the caller, retry execution,
//!   blocking admission) via tokio
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: resource names, error taxonomy, attempt records
//! - **Limiter**: sliding-window admission per resource
//! - **Circuit breaker**: per-resource failure state machine
//! - **Retry**: bounded attempts with backoff and jitter
//! - **Caller**: the registry and composition the rest of a program uses
//! - **Snapshot / Events**: read-only copies and structured records for
//!   observability consumers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod caller;
pub mod circuit_breaker;
pub mod core;
pub mod events;
pub mod limiter;
pub mod mock;
pub mod retry;
pub mod snapshot;

// Re-export commonly used types at the crate root
pub use crate::core::{
    Attempt, AttemptHook, AttemptOutcome, CallError, ConfigError, NoOpHook, ResourceName,
    Retryable,
};

pub use crate::caller::{ResilientCaller, ResilientCallerBuilder, ResourcePolicy};
pub use crate::circuit_breaker::{BreakerConfig, BreakerMetrics, CircuitBreaker, CircuitState};
pub use crate::limiter::{Admission, RateLimitConfig, RateLimiter};
pub use crate::retry::{RetryError, RetryPolicy};
pub use crate::snapshot::{HealthReport, ResourceSnapshot};

/// Prelude module for convenient imports.
///
/// ```rust
/// use callguard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::caller::{ResilientCaller, ResourcePolicy};
    pub use crate::circuit_breaker::{BreakerConfig, CircuitBreaker, CircuitState};
    pub use crate::core::{CallError, ConfigError, ResourceName, Retryable};
    pub use crate::limiter::{Admission, RateLimitConfig, RateLimiter};
    pub use crate::retry::{RetryError, RetryPolicy};
    pub use crate::snapshot::{HealthReport, ResourceSnapshot};
}
