//! Configuration loader for dispatch runs

use crate::dispatch::{DispatchMode, RetryConfig};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Public ledger clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Mainnet,
    Testnet,
    #[default]
    Devnet,
}

impl Cluster {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::Mainnet => "https://api.mainnet-beta.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Devnet => "https://api.devnet.solana.com",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub cluster: Cluster,
    /// Overrides the cluster's public endpoint
    pub rpc_url: Option<String>,
}

impl NetworkConfig {
    pub fn endpoint(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.cluster.rpc_url())
    }
}

/// How the caller expands keys and addresses into requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Amount per transfer in whole coins
    pub amount: f64,
    /// Transfers per (key, address) pair
    pub transactions_per_address: u32,
    /// Pause after each transfer
    pub delay_seconds: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            amount: 0.001,
            transactions_per_address: 1,
            delay_seconds: 0,
        }
    }
}

/// Configuration for a dispatch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub network: NetworkConfig,
    pub policy: RetryConfig,
    pub scheduler: DispatchMode,
    pub batch: BatchConfig,
}

impl DispatchConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```ignore
    /// let config = DispatchConfig::from_path("config/dispatch.toml")?;
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.network.rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidRpcUrl { url: url.clone() });
            }
        }

        if self.policy.max_retries == 0 {
            return Err(invalid("policy.max_retries", "must be at least 1"));
        }

        if let DispatchMode::Concurrent {
            max_in_flight: Some(0),
        } = self.scheduler
        {
            return Err(invalid("scheduler.max_in_flight", "must be at least 1"));
        }

        if !self.batch.amount.is_finite() || self.batch.amount <= 0.0 {
            return Err(invalid("batch.amount", "must be a positive number"));
        }

        if self.batch.transactions_per_address == 0 {
            return Err(invalid("batch.transactions_per_address", "must be at least 1"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
