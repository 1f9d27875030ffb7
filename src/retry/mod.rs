//! Bounded retry with exponential backoff and jitter.
//!
//! A [`RetryPolicy`] re-invokes a fallible operation until it succeeds,
//! fails with a fatal error, or runs out of attempts, sleeping an
//! exponentially growing (capped, jittered) delay between attempts. The
//! policy is independent of circuit breakers and rate limiters; attempt
//! outcomes are reported through the [`AttemptHook`](crate::core::AttemptHook)
//! seam so composition stays the caller's responsibility.

mod policy;

pub use policy::{RetryError, RetryPolicy};
