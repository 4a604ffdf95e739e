//! # Transfer Requests
//!
//! Data entities handed to the dispatcher and passed to the network layer.

use crate::error::RequestError;
use crate::traits::TransferSigner;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Network-issued identifier for a finalized transfer (signature or tx hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationId(pub String);

impl ConfirmationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfirmationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One desired transfer. Immutable once built.
#[derive(Clone)]
pub struct TransferRequest {
    sender: Arc<dyn TransferSigner>,
    recipient: String,
    amount: u64,
    sequence_index: u32,
    inter_request_delay: Duration,
}

impl TransferRequest {
    /// Creates a request. `amount` is in base units and must be non-zero.
    pub fn new(
        sender: Arc<dyn TransferSigner>,
        recipient: impl Into<String>,
        amount: u64,
        sequence_index: u32,
    ) -> Result<Self, RequestError> {
        if amount == 0 {
            return Err(RequestError::ZeroAmount {
                index: sequence_index,
            });
        }

        Ok(Self {
            sender,
            recipient: recipient.into(),
            amount,
            sequence_index,
            inter_request_delay: Duration::ZERO,
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = delay;
        self
    }

    pub fn sender(&self) -> &Arc<dyn TransferSigner> {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn sequence_index(&self) -> u32 {
        self.sequence_index
    }

    pub fn inter_request_delay(&self) -> Duration {
        self.inter_request_delay
    }

    /// Unsigned view of this request for the signer.
    pub fn draft(&self) -> TransferDraft {
        TransferDraft {
            sender: self.sender.identity().to_string(),
            recipient: self.recipient.clone(),
            amount: self.amount,
        }
    }
}

// Only the signer identity is printed; the signer may hold key material.
impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("sender", &self.sender.identity())
            .field("recipient", &self.recipient)
            .field("amount", &self.amount)
            .field("sequence_index", &self.sequence_index)
            .field("inter_request_delay", &self.inter_request_delay)
            .finish()
    }
}

/// The unsigned `{sender, recipient, amount}` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

/// A draft plus the signer's opaque payload, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub draft: TransferDraft,
    pub payload: Vec<u8>,
}
