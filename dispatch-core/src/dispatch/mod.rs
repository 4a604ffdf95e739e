//! # Dispatch Engine
//!
//! - [`attempt`] - one submit-and-confirm cycle, classified
//! - [`policy`] - pure retry decisions from attempt history
//! - [`scheduler`] - sequential or concurrent batch execution

pub mod attempt;
pub mod policy;
pub mod scheduler;

pub use attempt::{AttemptKind, AttemptResult, DispatchAttempt};
pub use policy::{NextAction, RetryConfig, RetryPolicy};
pub use scheduler::{BatchScheduler, DispatchMode};
