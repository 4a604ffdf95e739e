//! # Core Error Types
//!
//! Centralized error definitions for the dispatch-core crate.
//! Attempt-level network failures are classified into values by the
//! dispatcher; only construction and batch-input errors reach the caller.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for dispatch-core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    Request(RequestError),

    #[error("Batch rejected: {0}")]
    Batch(BatchError),

    #[error(transparent)]
    Network(NetworkError),

    #[error(transparent)]
    Signing(SigningError),
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<RequestError> for CoreError {
    fn from(e: RequestError) -> Self {
        CoreError::Request(e)
    }
}

impl From<BatchError> for CoreError {
    fn from(e: BatchError) -> Self {
        CoreError::Batch(e)
    }
}

impl From<NetworkError> for CoreError {
    fn from(e: NetworkError) -> Self {
        CoreError::Network(e)
    }
}

impl From<SigningError> for CoreError {
    fn from(e: SigningError) -> Self {
        CoreError::Signing(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors raised while building transfer requests
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Transfer amount must be greater than zero (request #{index})")]
    ZeroAmount { index: u32 },

    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: f64, reason: String },

    #[error("No signing identities supplied")]
    NoSigners,

    #[error("No recipients supplied")]
    NoRecipients,

    #[error("Batch too large: {count} requests exceeds the limit of {max}")]
    TooManyRequests { count: usize, max: usize },
}

/// Programmer errors in the input handed to the batch scheduler.
///
/// These are reported before any request is dispatched and are distinct
/// from per-request failures, which live in the run report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    #[error("Duplicate sequence index {index} in batch")]
    DuplicateIndex { index: u32 },

    #[error("Invalid retry policy: {reason}")]
    InvalidPolicy { reason: String },

    #[error("max_in_flight must be at least 1")]
    ZeroConcurrency,
}

/// Network errors as reported by a [`crate::traits::NetworkClient`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// The endpoint throttled the caller (HTTP 429 or an RPC rate-limit code).
    #[error("Rate limited by endpoint{}", fmt_retry_after(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// The request can never succeed as submitted.
    #[error("Invalid transfer: {reason}")]
    Invalid { reason: String },

    /// Timeouts, connectivity problems and unknown RPC faults.
    #[error("Transient network failure: {reason}")]
    Transient { reason: String },
}

fn fmt_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(": retry after {}ms", d.as_millis()),
        None => String::new(),
    }
}

/// Failure of the external signer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SigningError {
    #[error("Signer '{identity}' rejected the transfer: {reason}")]
    Rejected { identity: String, reason: String },

    #[error("Signing key unavailable for '{identity}'")]
    KeyUnavailable { identity: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_display() {
        let plain = NetworkError::RateLimited { retry_after: None };
        assert_eq!(plain.to_string(), "Rate limited by endpoint");

        let hinted = NetworkError::RateLimited {
            retry_after: Some(Duration::from_millis(2500)),
        };
        assert_eq!(
            hinted.to_string(),
            "Rate limited by endpoint: retry after 2500ms"
        );
    }

    #[test]
    fn test_core_error_wraps_batch() {
        let err: CoreError = BatchError::DuplicateIndex { index: 3 }.into();
        assert_eq!(
            err.to_string(),
            "Batch rejected: Duplicate sequence index 3 in batch"
        );
    }
}
