//! Ledger connection configuration

use std::path::Path;
use std::time::Duration;

use keyscan_core::RecoveryOptions;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Environment variable overriding [`LedgerConfig::rpc_url`]
pub const ENV_RPC_URL: &str = "KEYSCAN_RPC_URL";

/// Environment variable overriding [`LedgerConfig::request_timeout_secs`]
pub const ENV_TIMEOUT_SECS: &str = "KEYSCAN_TIMEOUT_SECS";

/// Public mainnet JSON-RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://s1.ripple.com:51234/";

/// Where recent transactions are read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    /// Transactions of the last validated ledger
    #[default]
    Ledger,
    /// The deprecated `tx_history` method; may be disabled on a node
    TxHistory,
}

/// Ledger client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the node
    pub rpc_url: String,

    /// Timeout for a single request (seconds)
    pub request_timeout_secs: u64,

    /// How many recent transactions to inspect per account
    pub latest_tx_limit: u32,

    /// Upper bound on concurrent per-account lookups
    pub max_concurrent_requests: usize,

    /// Source of recent transactions for scans
    pub history_source: HistorySource,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            request_timeout_secs: 30,
            latest_tx_limit: 2,
            max_concurrent_requests: 4,
            history_source: HistorySource::Ledger,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `KEYSCAN_*` environment overrides
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = secs.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_TIMEOUT_SECS} is not a number: {secs}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check that the values are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "rpc_url must be an http(s) URL, got {:?}",
                self.rpc_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.latest_tx_limit == 0 {
            return Err(ConfigError::Invalid(
                "latest_tx_limit must be positive".to_string(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_requests must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn recovery_options(&self) -> RecoveryOptions {
        RecoveryOptions {
            max_concurrent: self.max_concurrent_requests,
        }
    }
}
