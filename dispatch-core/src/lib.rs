//! # Dispatch Core - Reliable Transfer Dispatch
//!
//! This crate submits batches of value transfers to a remote ledger network,
//! classifying failures, retrying with backoff and fanning requests out
//! sequentially or concurrently.
//!
//! ## Modules
//!
//! - [`config`] - TOML configuration for clusters, policy and batches
//! - [`dispatch`] - Attempt classification, retry policy and batch scheduler
//! - [`error`] - Typed error handling with thiserror
//! - [`metrics`] - Attempt and outcome counters
//! - [`plan`] - Expanding keys and addresses into transfer requests
//! - [`report`] - Per-request outcomes of a run
//! - [`request`] - Transfer request entities
//! - [`traits`] - Network, signer and source interfaces
//!
//! Callers are expected not to resubmit transfers that were already
//! confirmed; the engine does not deduplicate.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod plan;
pub mod report;
pub mod request;
pub mod traits;
pub(crate) mod utils;

pub use config::{BatchConfig, Cluster, DispatchConfig, NetworkConfig};
pub use dispatch::{
    AttemptKind, AttemptResult, BatchScheduler, DispatchAttempt, DispatchMode, NextAction,
    RetryConfig, RetryPolicy,
};
pub use error::{BatchError, ConfigError, CoreError, NetworkError, RequestError, SigningError};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use plan::{coins_to_base_units, BatchPlan, BASE_UNITS_PER_COIN, MAX_PLAN_REQUESTS};
pub use report::{DispatchOutcome, RecordStatus, ReportEntry, ReportRecord, RunReport, RunSummary};
pub use request::{ConfirmationId, SignedTransfer, TransferDraft, TransferRequest};
pub use traits::{AddressSource, KeySource, NetworkClient, StaticSigner, TransferSigner};

pub use utils::{setup_logger, setup_logger_in, RESULT_TARGET};
