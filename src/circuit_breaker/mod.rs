//! Circuit breaking for unreliable dependencies.
//!
//! The circuit breaker pattern prevents cascading failures by temporarily
//! rejecting calls to a failing resource and periodically probing it to
//! detect recovery.
//!
//! ## States
//!
//! - **Closed**: normal operation; calls pass through.
//! - **Open**: the resource is failing; calls are rejected immediately.
//! - **Half-open**: probing the resource to see if it has recovered.
//!
//! ## Usage
//!
//! ```rust
//! use callguard::circuit_breaker::{BreakerConfig, CircuitBreaker};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(
//!     "newsapi",
//!     BreakerConfig::new()
//!         .with_failure_threshold(3)
//!         .with_open_duration(Duration::from_secs(60)),
//! );
//!
//! if breaker.try_acquire().is_ok() {
//!     // ... invoke the operation, then report what happened:
//!     breaker.record_success();
//! }
//! ```

mod breaker;
mod config;
mod state;

pub use breaker::{BreakerHook, CircuitBreaker, Rejection};
pub use config::BreakerConfig;
pub use state::{BreakerMetrics, BreakerState, CircuitState};
