use crate::error::{NetworkError, SigningError};
use crate::request::{ConfirmationId, SignedTransfer, TransferDraft};
use async_trait::async_trait;
use std::sync::Arc;

/// Remote ledger endpoint that accepts signed transfers.
///
/// Implementations must be safe to share across concurrently running
/// dispatches; calls are expected to be stateless.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Submits the transfer once and waits for network confirmation.
    async fn submit(&self, transfer: &SignedTransfer) -> Result<ConfirmationId, NetworkError>;
}

#[async_trait]
impl<T: NetworkClient + ?Sized> NetworkClient for Arc<T> {
    async fn submit(&self, transfer: &SignedTransfer) -> Result<ConfirmationId, NetworkError> {
        (**self).submit(transfer).await
    }
}

/// Opaque signing identity supplied by the caller.
pub trait TransferSigner: Send + Sync {
    /// Public identity (address) used in drafts and logs
    fn identity(&self) -> &str;

    fn sign(&self, draft: &TransferDraft) -> Result<SignedTransfer, SigningError>;
}

/// Supplies signing identities
pub trait KeySource: Send + Sync {
    fn signers(&self) -> Vec<Arc<dyn TransferSigner>>;
}

/// Supplies recipient identifiers, already validated by the network layer
pub trait AddressSource: Send + Sync {
    fn recipients(&self) -> Vec<String>;
}

impl KeySource for Vec<Arc<dyn TransferSigner>> {
    fn signers(&self) -> Vec<Arc<dyn TransferSigner>> {
        self.clone()
    }
}

impl AddressSource for Vec<String> {
    fn recipients(&self) -> Vec<String> {
        self.clone()
    }
}

/// Signer that never touches key material: the payload is the draft itself.
///
/// Useful for dry runs and simulations against a scripted network.
#[derive(Debug, Clone)]
pub struct StaticSigner {
    identity: String,
}

impl StaticSigner {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

impl TransferSigner for StaticSigner {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn sign(&self, draft: &TransferDraft) -> Result<SignedTransfer, SigningError> {
        if draft.sender != self.identity {
            return Err(SigningError::Rejected {
                identity: self.identity.clone(),
                reason: format!("draft is for sender '{}'", draft.sender),
            });
        }

        let payload = format!("{}:{}:{}", draft.sender, draft.recipient, draft.amount);
        Ok(SignedTransfer {
            draft: draft.clone(),
            payload: payload.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_signer_rejects_foreign_draft() {
        let signer = StaticSigner::new("alice");
        let draft = TransferDraft {
            sender: "mallory".to_string(),
            recipient: "bob".to_string(),
            amount: 5,
        };

        assert_eq!(
            signer.sign(&draft).unwrap_err(),
            SigningError::Rejected {
                identity: "alice".to_string(),
                reason: "draft is for sender 'mallory'".to_string(),
            }
        );

        let own = TransferDraft {
            sender: "alice".to_string(),
            ..draft
        };
        assert_eq!(signer.sign(&own).unwrap().payload, b"alice:bob:5".to_vec());
    }
}
