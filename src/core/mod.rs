//! Core types and traits for the callguard library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`resource`] - The `ResourceName` key all per-resource state hangs off
//! - [`error`] - Structured error types and the `Retryable` classification
//! - [`attempt`] - Per-attempt records and the `AttemptHook` observer seam

pub mod attempt;
pub mod error;
pub mod resource;

// Re-export commonly used types at the core level
pub use attempt::{Attempt, AttemptHook, AttemptOutcome, NoOpHook};
pub use error::{CallError, ConfigError, Retryable};
pub use resource::ResourceName;
