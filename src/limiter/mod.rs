//! Sliding-window rate limiting for outbound calls.
//!
//! Each named resource gets its own limiter bounding how many calls are
//! admitted within a rolling window. Checks are cheap and lazy: expired
//! entries are purged inline on each admission decision, never by a
//! background task.
//!
//! ## Usage
//!
//! ```rust
//! use callguard::limiter::{RateLimitConfig, RateLimiter};
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new(RateLimitConfig::new(5, Duration::from_secs(10)));
//!
//! assert!(limiter.acquire_one().is_granted());
//! ```

mod config;
mod window;

pub use config::RateLimitConfig;
pub use window::{Admission, RateLimiter};
