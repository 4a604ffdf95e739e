#![allow(dead_code)]

use async_trait::async_trait;
use dispatch_core::{
    ConfirmationId, NetworkClient, NetworkError, SignedTransfer, StaticSigner, TransferRequest,
    TransferSigner,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Network double that replays a per-recipient script of responses.
///
/// Once a recipient's script runs out every further submission confirms,
/// unless the recipient was marked with [`ScriptedClient::panic_on`].
#[derive(Default)]
pub struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<Result<(), NetworkError>>>>,
    panics: Mutex<HashSet<String>>,
    latencies: Mutex<HashMap<String, Duration>>,
    submissions: Mutex<Vec<(String, Instant)>>,
    confirmations: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, recipient: &str, responses: Vec<Result<(), NetworkError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(recipient.to_string(), responses.into());
        self
    }

    pub fn always(self, recipient: &str, error: NetworkError, times: usize) -> Self {
        let responses = (0..times).map(|_| Err(error.clone())).collect();
        self.script(recipient, responses)
    }

    /// Panics on the first submission for `recipient` after its script runs out
    pub fn panic_on(self, recipient: &str) -> Self {
        self.panics.lock().unwrap().insert(recipient.to_string());
        self
    }

    pub fn latency(self, recipient: &str, latency: Duration) -> Self {
        self.latencies
            .lock()
            .unwrap()
            .insert(recipient.to_string(), latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, recipient: &str) -> usize {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == recipient)
            .count()
    }

    /// Submission instants for one recipient, in call order
    pub fn submit_times(&self, recipient: &str) -> Vec<Instant> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == recipient)
            .map(|(_, t)| *t)
            .collect()
    }

    /// Recipients in the order their submissions were confirmed
    pub fn confirmation_order(&self) -> Vec<String> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkClient for ScriptedClient {
    async fn submit(&self, transfer: &SignedTransfer) -> Result<ConfirmationId, NetworkError> {
        let recipient = transfer.draft.recipient.clone();
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.submissions
            .lock()
            .unwrap()
            .push((recipient.clone(), Instant::now()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = self
            .latencies
            .lock()
            .unwrap()
            .get(&recipient)
            .copied()
            .unwrap_or(Duration::ZERO);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&recipient)
            .and_then(|script| script.pop_front());

        let marked = self.panics.lock().unwrap().contains(&recipient);
        if scripted.is_none() && marked {
            panic!("client bug");
        }

        match scripted {
            Some(Err(e)) => Err(e),
            _ => {
                self.confirmations.lock().unwrap().push(recipient.clone());
                Ok(ConfirmationId::new(format!("sig-{}-{}", recipient, n)))
            }
        }
    }
}

pub fn signer() -> Arc<dyn TransferSigner> {
    Arc::new(StaticSigner::new("sender"))
}

pub fn request(index: u32, recipient: &str, delay: Duration) -> TransferRequest {
    TransferRequest::new(signer(), recipient, 1_000, index)
        .unwrap()
        .with_delay(delay)
}

pub fn rate_limited() -> NetworkError {
    NetworkError::RateLimited { retry_after: None }
}

pub fn transient() -> NetworkError {
    NetworkError::Transient {
        reason: "request timed out".to_string(),
    }
}

pub fn invalid() -> NetworkError {
    NetworkError::Invalid {
        reason: "insufficient funds".to_string(),
    }
}
