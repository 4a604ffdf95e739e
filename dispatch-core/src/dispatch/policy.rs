//! Retry policy - decides what to do after a failed attempt.
//!
//! The policy is a pure function of the attempt history for a single
//! request, so the same history always yields the same action.
//!
//! - **Rate limited**: exponential backoff from `rate_limit_base_delay_ms`,
//!   doubling for each consecutive rate-limited attempt
//! - **Transient**: fixed `transient_delay_ms`, no escalation
//! - **Fatal**: never retried

use super::attempt::AttemptResult;
use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per request, first attempt included
    pub max_retries: u32,
    /// Wait before the first retry after a rate limit; doubles on each consecutive one
    pub rate_limit_base_delay_ms: u64,
    /// Fixed wait after a transient error
    pub transient_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            rate_limit_base_delay_ms: 1000,
            transient_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_rate_limit_base_delay(mut self, delay_ms: u64) -> Self {
        self.rate_limit_base_delay_ms = delay_ms;
        self
    }

    pub fn with_transient_delay(mut self, delay_ms: u64) -> Self {
        self.transient_delay_ms = delay_ms;
        self
    }

    /// Creates a config with a single attempt (fail fast)
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.max_retries == 0 {
            return Err(BatchError::InvalidPolicy {
                reason: "max_retries must allow at least one attempt".to_string(),
            });
        }
        Ok(())
    }
}

/// What the scheduler should do next for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Decides the next action from the ordered attempt history of one request.
    ///
    /// An empty history means nothing has been tried yet and yields an
    /// immediate retry. A history ending in `Success` yields `GiveUp`, since
    /// there is nothing left to do.
    pub fn next_action(&self, history: &[AttemptResult]) -> NextAction {
        let Some(last) = history.last() else {
            return NextAction::Retry(Duration::ZERO);
        };

        if history.iter().any(AttemptResult::is_fatal) {
            return NextAction::GiveUp;
        }
        if history.len() >= self.config.max_retries as usize {
            return NextAction::GiveUp;
        }

        match last {
            AttemptResult::Success { .. } | AttemptResult::FatalError { .. } => NextAction::GiveUp,
            AttemptResult::RateLimited { retry_after } => {
                let backoff = self.rate_limit_backoff(consecutive_rate_limits(history));
                let wait = match retry_after {
                    Some(hint) => backoff.max(*hint),
                    None => backoff,
                };
                NextAction::Retry(wait)
            }
            AttemptResult::TransientError { .. } => {
                NextAction::Retry(Duration::from_millis(self.config.transient_delay_ms))
            }
        }
    }

    /// Backoff for the n-th consecutive rate limit (n starts at 1).
    fn rate_limit_backoff(&self, n: u32) -> Duration {
        let exponent = n.saturating_sub(1).min(63);
        let factor = 1u64 << exponent;
        Duration::from_millis(self.config.rate_limit_base_delay_ms.saturating_mul(factor))
    }
}

fn consecutive_rate_limits(history: &[AttemptResult]) -> u32 {
    history
        .iter()
        .rev()
        .take_while(|r| matches!(r, AttemptResult::RateLimited { .. }))
        .count() as u32
}
