//! # Batch Planning
//!
//! Caller-side construction of the request sequence: every signing key sends
//! `transactions_per_address` rounds, each round visiting every recipient in
//! order. Sequence indices follow that order.

use crate::config::BatchConfig;
use crate::error::RequestError;
use crate::request::TransferRequest;
use crate::traits::{AddressSource, KeySource};
use std::time::Duration;

/// Base units in one whole coin
pub const BASE_UNITS_PER_COIN: u64 = 1_000_000_000;

/// Largest number of requests a single plan may expand to
pub const MAX_PLAN_REQUESTS: usize = 1_000_000;

/// Converts a whole-coin amount into base units, rounding to the nearest unit.
pub fn coins_to_base_units(amount: f64) -> Result<u64, RequestError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(RequestError::InvalidAmount {
            amount,
            reason: "must be a positive number".to_string(),
        });
    }

    let units = (amount * BASE_UNITS_PER_COIN as f64).round();
    if units < 1.0 {
        return Err(RequestError::InvalidAmount {
            amount,
            reason: "smaller than one base unit".to_string(),
        });
    }
    if units >= u64::MAX as f64 {
        return Err(RequestError::InvalidAmount {
            amount,
            reason: "too large".to_string(),
        });
    }

    Ok(units as u64)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    amount: u64,
    transactions_per_address: u32,
    delay: Duration,
}

impl BatchPlan {
    /// `amount` is in base units.
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            transactions_per_address: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &BatchConfig) -> Result<Self, RequestError> {
        Ok(Self::new(coins_to_base_units(config.amount)?)
            .with_transactions_per_address(config.transactions_per_address)
            .with_delay(Duration::from_secs(config.delay_seconds)))
    }

    pub fn with_transactions_per_address(mut self, count: u32) -> Self {
        self.transactions_per_address = count;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn build(
        &self,
        keys: &dyn KeySource,
        addresses: &dyn AddressSource,
    ) -> Result<Vec<TransferRequest>, RequestError> {
        let signers = keys.signers();
        if signers.is_empty() {
            return Err(RequestError::NoSigners);
        }
        let recipients = addresses.recipients();
        if recipients.is_empty() {
            return Err(RequestError::NoRecipients);
        }

        let count = signers
            .len()
            .checked_mul(self.transactions_per_address as usize)
            .and_then(|n| n.checked_mul(recipients.len()))
            .unwrap_or(usize::MAX);
        if count > MAX_PLAN_REQUESTS {
            return Err(RequestError::TooManyRequests {
                count,
                max: MAX_PLAN_REQUESTS,
            });
        }

        let mut requests = Vec::with_capacity(count);
        let mut index: u32 = 0;
        for signer in &signers {
            for _ in 0..self.transactions_per_address {
                for recipient in &recipients {
                    let request =
                        TransferRequest::new(signer.clone(), recipient.clone(), self.amount, index)?
                            .with_delay(self.delay);
                    requests.push(request);
                    index += 1;
                }
            }
        }

        Ok(requests)
    }
}
