use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use dispatch_core::{
    BatchPlan, BatchScheduler, ConfirmationId, DispatchConfig, DispatchMetrics, DispatchMode,
    NetworkClient, NetworkError, SignedTransfer, StaticSigner, TransferSigner,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Sequential,
    Concurrent,
}

/// Runs a synthetic batch against an in-process network to try out
/// policy and scheduler settings.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML config; defaults apply when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Number of recipients in the batch
    #[arg(short, long, default_value_t = 10)]
    requests: usize,

    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Bound on in-flight requests; needs concurrent mode from `--mode` or the config
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Answer every N-th submission with a rate limit (0 disables)
    #[arg(long, default_value_t = 0)]
    rate_limit_every: u64,

    /// Recipient position that is always rejected as invalid
    #[arg(long)]
    fatal_index: Option<usize>,

    /// Simulated confirmation latency
    #[arg(long, default_value_t = 50)]
    latency_ms: u64,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "logs")]
    log_dir: String,
}

/// Network stand-in with deterministic failure injection
struct SimulatedNetwork {
    submissions: AtomicU64,
    rate_limit_every: u64,
    fatal_recipient: Option<String>,
    latency: Duration,
}

#[async_trait]
impl NetworkClient for SimulatedNetwork {
    async fn submit(&self, transfer: &SignedTransfer) -> Result<ConfirmationId, NetworkError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.latency).await;

        if self.fatal_recipient.as_deref() == Some(transfer.draft.recipient.as_str()) {
            return Err(NetworkError::Invalid {
                reason: "recipient rejected by simulator".to_string(),
            });
        }
        if self.rate_limit_every > 0 && n % self.rate_limit_every == 0 {
            return Err(NetworkError::RateLimited { retry_after: None });
        }

        Ok(ConfirmationId::new(format!("sim-{:06}", n)))
    }
}

/// Applies the command-line overrides on top of the configured mode.
fn resolve_mode(
    configured: DispatchMode,
    mode: Option<ModeArg>,
    max_in_flight: Option<usize>,
) -> Result<DispatchMode> {
    let base = match mode {
        Some(ModeArg::Sequential) => DispatchMode::Sequential,
        Some(ModeArg::Concurrent) => DispatchMode::concurrent(),
        None => configured,
    };

    match (base, max_in_flight) {
        (DispatchMode::Sequential, Some(_)) => {
            bail!("--max-in-flight requires concurrent mode")
        }
        (DispatchMode::Concurrent { .. }, Some(n)) => Ok(DispatchMode::bounded(n)),
        (base, None) => Ok(base),
    }
}

fn recipient(i: usize) -> String {
    format!("sim-recipient-{:03}", i)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = dispatch_core::setup_logger_in(&args.log_dir)?;

    let mut config = match &args.config {
        Some(path) => DispatchConfig::from_path(path)?,
        None => DispatchConfig::default(),
    };

    config.scheduler = resolve_mode(config.scheduler, args.mode, args.max_in_flight)?;
    config.validate()?;
    info!(
        "Simulating {} transfers against {} ({:?})",
        args.requests,
        config.network.endpoint(),
        config.scheduler
    );

    let signers: Vec<Arc<dyn TransferSigner>> = vec![Arc::new(StaticSigner::new("sim-sender"))];
    let recipients: Vec<String> = (0..args.requests).map(recipient).collect();
    let plan = BatchPlan::from_config(&config.batch)?;

    let network = Arc::new(SimulatedNetwork {
        submissions: AtomicU64::new(0),
        rate_limit_every: args.rate_limit_every,
        fatal_recipient: args.fatal_index.map(recipient),
        latency: Duration::from_millis(args.latency_ms),
    });
    let metrics = Arc::new(DispatchMetrics::default());
    let scheduler = BatchScheduler::new(network).with_metrics(Arc::clone(&metrics));

    let token = scheduler.cancellation_token();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("🛑 Received Ctrl+C. Cancelling outstanding transfers...");
                token.cancel();
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
            }
        }
    });

    let report = scheduler
        .run_plan(
            &plan,
            &signers,
            &recipients,
            config.scheduler,
            &config.policy,
        )
        .await?;

    if args.json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    }
    println!("{}", report.summary());
    println!("{}", metrics.to_json());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_in_flight_applies_to_configured_concurrency() {
        let mode = resolve_mode(DispatchMode::concurrent(), None, Some(4)).unwrap();
        assert_eq!(mode, DispatchMode::bounded(4));

        let kept = resolve_mode(DispatchMode::bounded(8), None, None).unwrap();
        assert_eq!(kept, DispatchMode::bounded(8));
    }

    #[test]
    fn test_mode_flag_overrides_config() {
        let configured = DispatchMode::bounded(8);
        let mode = resolve_mode(configured, Some(ModeArg::Concurrent), None).unwrap();
        assert_eq!(mode, DispatchMode::concurrent());

        let mode = resolve_mode(configured, Some(ModeArg::Sequential), None).unwrap();
        assert_eq!(mode, DispatchMode::Sequential);
    }

    #[test]
    fn test_max_in_flight_rejected_for_sequential() {
        let err = resolve_mode(DispatchMode::Sequential, None, Some(2)).unwrap_err();
        assert!(err.to_string().contains("requires concurrent mode"));
    }
}
