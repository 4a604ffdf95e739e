use crate::dispatch::AttemptKind;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_ms: u64,
    pub requests: RequestMetrics,
    pub attempts: AttemptMetrics,
    pub rpc: RpcMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    pub total: u64,
    pub confirmed: u64,
    pub failed: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptMetrics {
    pub total: u64,
    pub success: u64,
    pub rate_limited: u64,
    pub transient: u64,
    pub fatal: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcMetrics {
    pub total_calls: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

/// Lock-free counters shared by every dispatch of a run
#[derive(Debug)]
pub struct DispatchMetrics {
    requests_confirmed: AtomicU64,
    requests_failed: AtomicU64,
    attempts_success: AtomicU64,
    attempts_rate_limited: AtomicU64,
    attempts_transient: AtomicU64,
    attempts_fatal: AtomicU64,
    rpc_calls: AtomicU64,
    rpc_latency_sum_ms: AtomicU64,
    rpc_min_latency_ms: AtomicU64,
    rpc_max_latency_ms: AtomicU64,
    start_time: Instant,
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self {
            requests_confirmed: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            attempts_success: AtomicU64::new(0),
            attempts_rate_limited: AtomicU64::new(0),
            attempts_transient: AtomicU64::new(0),
            attempts_fatal: AtomicU64::new(0),
            rpc_calls: AtomicU64::new(0),
            rpc_latency_sum_ms: AtomicU64::new(0),
            rpc_min_latency_ms: AtomicU64::new(u64::MAX),
            rpc_max_latency_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl DispatchMetrics {
    /// `latency` is `None` when the attempt never reached the network.
    pub fn record_attempt(&self, kind: AttemptKind, latency: Option<Duration>) {
        let counter = match kind {
            AttemptKind::Success => &self.attempts_success,
            AttemptKind::RateLimited => &self.attempts_rate_limited,
            AttemptKind::Transient => &self.attempts_transient,
            AttemptKind::Fatal => &self.attempts_fatal,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = latency {
            let latency_ms = latency.as_millis() as u64;
            self.rpc_calls.fetch_add(1, Ordering::SeqCst);
            self.rpc_latency_sum_ms
                .fetch_add(latency_ms, Ordering::SeqCst);
            self.rpc_min_latency_ms
                .fetch_min(latency_ms, Ordering::SeqCst);
            self.rpc_max_latency_ms
                .fetch_max(latency_ms, Ordering::SeqCst);
        }
    }

    pub fn record_outcome(&self, confirmed: bool) {
        if confirmed {
            self.requests_confirmed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.requests_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let confirmed = self.requests_confirmed.load(Ordering::SeqCst);
        let failed = self.requests_failed.load(Ordering::SeqCst);
        let total_requests = confirmed + failed;

        let success = self.attempts_success.load(Ordering::SeqCst);
        let rate_limited = self.attempts_rate_limited.load(Ordering::SeqCst);
        let transient = self.attempts_transient.load(Ordering::SeqCst);
        let fatal = self.attempts_fatal.load(Ordering::SeqCst);

        let rpc_calls = self.rpc_calls.load(Ordering::SeqCst);
        let rpc_latency = self.rpc_latency_sum_ms.load(Ordering::SeqCst);
        let min_rpc = self.rpc_min_latency_ms.load(Ordering::SeqCst);
        let max_rpc = self.rpc_max_latency_ms.load(Ordering::SeqCst);

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            uptime_ms: self.uptime().as_millis() as u64,
            requests: RequestMetrics {
                total: total_requests,
                confirmed,
                failed,
                success_rate: if total_requests > 0 {
                    confirmed as f64 / total_requests as f64 * 100.0
                } else {
                    0.0
                },
            },
            attempts: AttemptMetrics {
                total: success + rate_limited + transient + fatal,
                success,
                rate_limited,
                transient,
                fatal,
            },
            rpc: RpcMetrics {
                total_calls: rpc_calls,
                avg_latency_ms: if rpc_calls > 0 {
                    rpc_latency as f64 / rpc_calls as f64
                } else {
                    0.0
                },
                min_latency_ms: if min_rpc == u64::MAX { 0 } else { min_rpc },
                max_latency_ms: max_rpc,
            },
        }
    }

    pub fn to_json(&self) -> String {
        let snapshot = self.snapshot();
        serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
