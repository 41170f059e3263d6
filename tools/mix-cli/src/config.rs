//! Configuration loaded from a TOML file.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use chain_sol::address_to_bytes;
use mix_core::{Commitment, ExecutionOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Deployed routing program (base58)
    pub program_id: String,

    /// Commitment for balance reads and confirmation
    #[serde(default)]
    pub commitment: Commitment,

    #[serde(default)]
    pub preflight_commitment: Commitment,

    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Cluster name for explorer links (`mainnet-beta`, `devnet`, `testnet`)
    #[serde(default)]
    pub explorer_cluster: Option<String>,
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}
fn default_confirm_timeout_secs() -> u64 { 60 }
fn default_poll_interval_ms() -> u64 { 500 }
fn default_request_timeout_secs() -> u64 { 30 }

impl MixConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: MixConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.program_id()?;
        if self.confirm_timeout_secs == 0 {
            bail!("confirm_timeout_secs must be positive");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be positive");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn program_id(&self) -> anyhow::Result<[u8; 32]> {
        address_to_bytes(&self.program_id).context("invalid program_id")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn to_execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            commitment: self.commitment,
            preflight_commitment: self.preflight_commitment,
            confirm_timeout: Duration::from_secs(self.confirm_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Solscan link for a landed transaction, if a cluster is configured.
    pub fn explorer_url(&self, signature: &str) -> Option<String> {
        self.explorer_cluster.as_deref().map(|cluster| match cluster {
            "mainnet-beta" | "mainnet" => format!("https://solscan.io/tx/{signature}"),
            other => format!("https://solscan.io/tx/{signature}?cluster={other}"),
        })
    }
}
