//! Composition of limiter, breaker, and retry behind one call contract.
//!
//! The [`ResilientCaller`] is the piece the rest of a program talks to: it
//! owns a [`ResourceRegistry`] of per-resource state and runs any fallible
//! operation under that resource's rate limit, circuit breaker, and retry
//! policy. Collaborators decide what to do with a classified failure:
//! skip one news source, drop a delivery, or abort the run.

mod policy;
mod registry;
mod resilient_caller;

pub use policy::ResourcePolicy;
pub use registry::ResourceRegistry;
pub use resilient_caller::{ResilientCaller, ResilientCallerBuilder};
