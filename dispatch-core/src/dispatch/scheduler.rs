use super::attempt::{AttemptResult, DispatchAttempt};
use super::policy::{NextAction, RetryConfig, RetryPolicy};
use crate::error::{BatchError, CoreError};
use crate::metrics::DispatchMetrics;
use crate::plan::BatchPlan;
use crate::report::{DispatchOutcome, ReportEntry, RunReport};
use crate::request::TransferRequest;
use crate::traits::{AddressSource, KeySource, NetworkClient};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument};

/// How a batch is fanned out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DispatchMode {
    /// One request at a time, sleeping each request's delay after it completes
    #[default]
    Sequential,
    /// Launch every request without waiting for the previous one, staggering
    /// launches by each request's delay
    Concurrent {
        #[serde(default)]
        max_in_flight: Option<usize>,
    },
}

impl DispatchMode {
    pub fn concurrent() -> Self {
        DispatchMode::Concurrent {
            max_in_flight: None,
        }
    }

    pub fn bounded(max_in_flight: usize) -> Self {
        DispatchMode::Concurrent {
            max_in_flight: Some(max_in_flight),
        }
    }
}

/// Drives a batch of transfer requests through retry-governed dispatch.
pub struct BatchScheduler<C> {
    client: Arc<C>,
    metrics: Option<Arc<DispatchMetrics>>,
    cancel: CancellationToken,
}

impl<C: NetworkClient + 'static> BatchScheduler<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            metrics: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Token checked before every attempt and raced against every sleep.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Dispatches every request and returns once each has a terminal outcome.
    ///
    /// Per-request failures are recorded in the report; an `Err` is only
    /// returned for malformed input, before anything is submitted.
    pub async fn run(
        &self,
        requests: Vec<TransferRequest>,
        mode: DispatchMode,
        policy: &RetryConfig,
    ) -> Result<RunReport, BatchError> {
        validate(&requests, mode, policy)?;
        if requests.is_empty() {
            return Ok(RunReport::default());
        }

        let dispatcher = RequestDispatcher {
            attempt: self.attempt(),
            policy: RetryPolicy::new(*policy),
            cancel: self.cancel.clone(),
            metrics: self.metrics.clone(),
        };

        let start_time = Instant::now();
        info!("Dispatching {} transfers ({:?})", requests.len(), mode);

        let entries = match mode {
            DispatchMode::Sequential => self.run_sequential(&dispatcher, requests).await,
            DispatchMode::Concurrent { max_in_flight } => {
                self.run_concurrent(&dispatcher, requests, max_in_flight)
                    .await
            }
        };

        let report = RunReport::from_entries(entries);
        log_summary(&report, start_time.elapsed());
        Ok(report)
    }

    /// Builds the requests described by `plan` and dispatches them.
    pub async fn run_plan(
        &self,
        plan: &BatchPlan,
        keys: &dyn KeySource,
        addresses: &dyn AddressSource,
        mode: DispatchMode,
        policy: &RetryConfig,
    ) -> Result<RunReport, CoreError> {
        let requests = plan.build(keys, addresses)?;
        Ok(self.run(requests, mode, policy).await?)
    }

    fn attempt(&self) -> DispatchAttempt<C> {
        let attempt = DispatchAttempt::new(Arc::clone(&self.client));
        match &self.metrics {
            Some(metrics) => attempt.with_metrics(Arc::clone(metrics)),
            None => attempt,
        }
    }

    async fn run_sequential(
        &self,
        dispatcher: &RequestDispatcher<C>,
        requests: Vec<TransferRequest>,
    ) -> Vec<ReportEntry> {
        let total = requests.len();
        let mut entries = Vec::with_capacity(total);

        for (pos, request) in requests.into_iter().enumerate() {
            let task = dispatcher.spawn(&request, None);
            let outcome = dispatcher.join(&request, task).await;
            let delay = request.inter_request_delay();
            entries.push(ReportEntry { request, outcome });

            // A cancelled pause is picked up by the next dispatch.
            if pos + 1 < total {
                pause(delay, &self.cancel).await;
            }
        }

        entries
    }

    async fn run_concurrent(
        &self,
        dispatcher: &RequestDispatcher<C>,
        requests: Vec<TransferRequest>,
        max_in_flight: Option<usize>,
    ) -> Vec<ReportEntry> {
        let total = requests.len();
        let limiter = max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = Vec::with_capacity(total);

        for (pos, request) in requests.iter().enumerate() {
            // On cancellation the task runs without a permit and resolves
            // immediately as cancelled.
            let permit = match &limiter {
                Some(sem) => tokio::select! {
                    _ = self.cancel.cancelled() => None,
                    permit = Arc::clone(sem).acquire_owned() => permit.ok(),
                },
                None => None,
            };

            tasks.push(dispatcher.spawn(request, permit));

            if pos + 1 < total {
                pause(request.inter_request_delay(), &self.cancel).await;
            }
        }

        let mut entries = Vec::with_capacity(total);
        for (request, task) in requests.into_iter().zip(tasks) {
            let outcome = dispatcher.join(&request, task).await;
            entries.push(ReportEntry { request, outcome });
        }

        entries
    }
}

/// Per-request retry loop, shared by both modes.
struct RequestDispatcher<C> {
    attempt: DispatchAttempt<C>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    metrics: Option<Arc<DispatchMetrics>>,
}

impl<C> Clone for RequestDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            attempt: self.attempt.clone(),
            policy: self.policy,
            cancel: self.cancel.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

/// A spawned dispatch. `attempts` is readable even if the task panics.
struct DispatchTask {
    handle: JoinHandle<DispatchOutcome>,
    attempts: Arc<AtomicU32>,
}

impl<C: NetworkClient + 'static> RequestDispatcher<C> {
    fn spawn(
        &self,
        request: &TransferRequest,
        permit: Option<OwnedSemaphorePermit>,
    ) -> DispatchTask {
        let attempts = Arc::new(AtomicU32::new(0));
        let task_attempts = Arc::clone(&attempts);
        let task_dispatcher = self.clone();
        let task_request = request.clone();
        let handle = tokio::spawn(
            async move {
                let _permit = permit;
                task_dispatcher
                    .dispatch(&task_request, &task_attempts)
                    .await
            }
            .instrument(request_span(request)),
        );

        DispatchTask { handle, attempts }
    }

    /// Waits for a spawned dispatch. A panicked or aborted task becomes `Failed`.
    async fn join(&self, request: &TransferRequest, task: DispatchTask) -> DispatchOutcome {
        match task.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Dispatch task for request #{} panicked or failed to join: {:?}",
                    request.sequence_index(),
                    e
                );
                let outcome = DispatchOutcome::Failed {
                    reason: format!("dispatch task aborted: {}", e),
                    attempts_made: task.attempts.load(Ordering::SeqCst),
                };
                log_outcome(request, &outcome);
                self.record(&outcome);
                outcome
            }
        }
    }
}

impl<C: NetworkClient> RequestDispatcher<C> {
    async fn dispatch(&self, request: &TransferRequest, attempts: &AtomicU32) -> DispatchOutcome {
        let outcome = self.retry_loop(request, attempts).await;
        log_outcome(request, &outcome);
        self.record(&outcome);
        outcome
    }

    async fn retry_loop(&self, request: &TransferRequest, attempts: &AtomicU32) -> DispatchOutcome {
        let mut history: Vec<AttemptResult> = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                return cancelled(history.len());
            }

            attempts.fetch_add(1, Ordering::SeqCst);
            let result = self.attempt.attempt(request).await;
            if let AttemptResult::Success { confirmation_id } = result {
                return DispatchOutcome::Confirmed {
                    confirmation_id,
                    attempts_made: history.len() as u32 + 1,
                };
            }
            history.push(result);

            match self.policy.next_action(&history) {
                NextAction::Retry(delay) => {
                    debug!(
                        "Request #{} attempt {}/{} failed. Retrying in {:?}",
                        request.sequence_index(),
                        history.len(),
                        self.policy.config().max_retries,
                        delay
                    );
                    if !pause(delay, &self.cancel).await {
                        return cancelled(history.len());
                    }
                }
                NextAction::GiveUp => {
                    let reason = history
                        .last()
                        .and_then(AttemptResult::detail)
                        .unwrap_or_else(|| "unknown failure".to_string());
                    return DispatchOutcome::Failed {
                        reason,
                        attempts_made: history.len() as u32,
                    };
                }
            }
        }
    }

    fn record(&self, outcome: &DispatchOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(outcome.is_confirmed());
        }
    }
}

fn validate(
    requests: &[TransferRequest],
    mode: DispatchMode,
    policy: &RetryConfig,
) -> Result<(), BatchError> {
    policy.validate()?;

    if let DispatchMode::Concurrent {
        max_in_flight: Some(0),
    } = mode
    {
        return Err(BatchError::ZeroConcurrency);
    }

    let mut seen = HashSet::with_capacity(requests.len());
    for request in requests {
        if !seen.insert(request.sequence_index()) {
            return Err(BatchError::DuplicateIndex {
                index: request.sequence_index(),
            });
        }
    }

    Ok(())
}

/// Sleeps for `delay` unless cancelled first. Returns `false` on cancellation.
async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

fn cancelled(attempts: usize) -> DispatchOutcome {
    let reason = if attempts == 0 {
        "cancelled before dispatch".to_string()
    } else {
        format!("cancelled after {} attempts", attempts)
    };
    DispatchOutcome::Failed {
        reason,
        attempts_made: attempts as u32,
    }
}

fn request_span(request: &TransferRequest) -> tracing::Span {
    tracing::info_span!(
        "dispatch",
        request = format!("{:03}", request.sequence_index())
    )
}

fn log_outcome(request: &TransferRequest, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Confirmed {
            confirmation_id,
            attempts_made,
        } => info!(
            target: "dispatch_result",
            "[#{:03}] Confirmed {} -> {} | {} | attempts: {}",
            request.sequence_index(),
            request.amount(),
            request.recipient(),
            confirmation_id,
            attempts_made
        ),
        DispatchOutcome::Failed {
            reason,
            attempts_made,
        } => info!(
            target: "dispatch_result",
            "[#{:03}] Failed {} -> {} | {} | attempts: {}",
            request.sequence_index(),
            request.amount(),
            request.recipient(),
            reason,
            attempts_made
        ),
    }
}

fn log_summary(report: &RunReport, elapsed: Duration) {
    info!(
        target: "dispatch_result",
        "Run complete in {:.1}s | {}",
        elapsed.as_secs_f64(),
        report.summary()
    );

    for entry in report.failures() {
        if let DispatchOutcome::Failed {
            reason,
            attempts_made,
        } = &entry.outcome
        {
            info!(
                target: "dispatch_result",
                "  #{:03} to {} Failed after {} attempts: {}",
                entry.request.sequence_index(),
                entry.request.recipient(),
                attempts_made,
                reason
            );
        }
    }
}
