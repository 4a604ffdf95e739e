use crate::error::NetworkError;
use crate::metrics::DispatchMetrics;
use crate::request::{ConfirmationId, TransferRequest};
use crate::traits::NetworkClient;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Classified result of a single submit-and-confirm cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Success { confirmation_id: ConfirmationId },
    RateLimited { retry_after: Option<Duration> },
    TransientError { detail: String },
    FatalError { detail: String },
}

impl AttemptResult {
    pub fn is_fatal(&self) -> bool {
        matches!(self, AttemptResult::FatalError { .. })
    }

    pub fn kind(&self) -> AttemptKind {
        match self {
            AttemptResult::Success { .. } => AttemptKind::Success,
            AttemptResult::RateLimited { .. } => AttemptKind::RateLimited,
            AttemptResult::TransientError { .. } => AttemptKind::Transient,
            AttemptResult::FatalError { .. } => AttemptKind::Fatal,
        }
    }

    /// Human readable failure detail, `None` for a success
    pub fn detail(&self) -> Option<String> {
        match self {
            AttemptResult::Success { .. } => None,
            AttemptResult::RateLimited { .. } => Some("rate limited by network".to_string()),
            AttemptResult::TransientError { detail } | AttemptResult::FatalError { detail } => {
                Some(detail.clone())
            }
        }
    }
}

impl From<NetworkError> for AttemptResult {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::RateLimited { retry_after } => AttemptResult::RateLimited { retry_after },
            NetworkError::Invalid { .. } => AttemptResult::FatalError {
                detail: err.to_string(),
            },
            NetworkError::Transient { .. } => AttemptResult::TransientError {
                detail: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptKind {
    Success,
    RateLimited,
    Transient,
    Fatal,
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptKind::Success => "success",
            AttemptKind::RateLimited => "rate_limited",
            AttemptKind::Transient => "transient",
            AttemptKind::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Executes exactly one submission per call. Never retries.
pub struct DispatchAttempt<C> {
    client: Arc<C>,
    metrics: Option<Arc<DispatchMetrics>>,
}

impl<C> Clone for DispatchAttempt<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            metrics: self.metrics.clone(),
        }
    }
}

impl<C: NetworkClient> DispatchAttempt<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn attempt(&self, request: &TransferRequest) -> AttemptResult {
        // Signing failures are fatal and never reach the network.
        let signed = match request.sender().sign(&request.draft()) {
            Ok(signed) => signed,
            Err(e) => {
                let result = AttemptResult::FatalError {
                    detail: e.to_string(),
                };
                self.record(&result, None);
                return result;
            }
        };

        let started = Instant::now();
        let result = match self.client.submit(&signed).await {
            Ok(confirmation_id) => AttemptResult::Success { confirmation_id },
            Err(e) => AttemptResult::from(e),
        };
        let latency = started.elapsed();

        debug!(
            "Request #{} to {} attempt -> {} ({}ms)",
            request.sequence_index(),
            request.recipient(),
            result.kind(),
            latency.as_millis()
        );
        self.record(&result, Some(latency));
        result
    }

    fn record(&self, result: &AttemptResult, latency: Option<Duration>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_attempt(result.kind(), latency);
        }
    }
}
