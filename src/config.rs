//! Minter configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file yields a
//! devnet configuration.

use crate::constants::{
    AR_SOL_HOLDER_ID, DEFAULT_ARWEAVE_GATEWAY, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_REBROADCAST_INTERVAL_MS, DEFAULT_STORAGE_FEE_LAMPORTS, DEFAULT_TIMEOUT_MS,
};
use crate::error::{Result, TxMintError};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentLevel, pubkey::Pubkey};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinterConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Websocket endpoint for signature subscriptions
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Pinning service endpoint
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Prefix for resolved content links
    #[serde(default = "default_arweave_gateway")]
    pub arweave_gateway: String,

    /// Commitment for RPC reads
    #[serde(default = "default_confirmed")]
    pub rpc_commitment: String,

    /// Commitment for blockhash queries
    #[serde(default = "default_finalized")]
    pub blockhash_commitment: String,

    /// Commitment a signature must reach to count as confirmed
    #[serde(default = "default_processed")]
    pub signature_commitment: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_rebroadcast_interval_ms")]
    pub rebroadcast_interval_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Poll signature statuses alongside the subscription
    #[serde(default = "default_true")]
    pub query_status: bool,

    /// Account that receives the storage fee
    #[serde(default = "default_storage_holder")]
    pub storage_holder: String,

    #[serde(default = "default_storage_fee_lamports")]
    pub storage_fee_lamports: u64,

    /// Reject creator lists whose shares do not sum to 100
    #[serde(default)]
    pub enforce_creator_shares: bool,

    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_ws_url() -> String { "wss://api.devnet.solana.com".to_string() }
fn default_upload_url() -> String {
    "https://us-central1-principal-lane-200702.cloudfunctions.net/uploadFile2".to_string()
}
fn default_arweave_gateway() -> String { DEFAULT_ARWEAVE_GATEWAY.to_string() }
fn default_confirmed() -> String { "confirmed".to_string() }
fn default_finalized() -> String { "finalized".to_string() }
fn default_processed() -> String { "processed".to_string() }
fn default_timeout_ms() -> u64 { DEFAULT_TIMEOUT_MS }
fn default_rebroadcast_interval_ms() -> u64 { DEFAULT_REBROADCAST_INTERVAL_MS }
fn default_poll_interval_ms() -> u64 { DEFAULT_POLL_INTERVAL_MS }
fn default_true() -> bool { true }
fn default_storage_holder() -> String { AR_SOL_HOLDER_ID.to_string() }
fn default_storage_fee_lamports() -> u64 { DEFAULT_STORAGE_FEE_LAMPORTS }
fn default_upload_timeout_secs() -> u64 { 60 }

impl Default for MinterConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            ws_url: default_ws_url(),
            upload_url: default_upload_url(),
            arweave_gateway: default_arweave_gateway(),
            rpc_commitment: default_confirmed(),
            blockhash_commitment: default_finalized(),
            signature_commitment: default_processed(),
            timeout_ms: default_timeout_ms(),
            rebroadcast_interval_ms: default_rebroadcast_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            query_status: default_true(),
            storage_holder: default_storage_holder(),
            storage_fee_lamports: default_storage_fee_lamports(),
            enforce_creator_shares: false,
            upload_timeout_secs: default_upload_timeout_secs(),
        }
    }
}

fn parse_commitment(field: &str, value: &str) -> Result<CommitmentLevel> {
    CommitmentLevel::from_str(value)
        .map_err(|_| TxMintError::ConfigError(format!("{}: unknown commitment '{}'", field, value)))
}

impl MinterConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TxMintError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| TxMintError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.ws_url.is_empty() {
            return Err(TxMintError::ConfigError(
                "rpc_url and ws_url must be set".to_string(),
            ));
        }
        if self.upload_url.is_empty() {
            return Err(TxMintError::ConfigError("upload_url must be set".to_string()));
        }
        if !self.arweave_gateway.ends_with('/') {
            return Err(TxMintError::ConfigError(
                "arweave_gateway must end with '/'".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(TxMintError::ConfigError("timeout_ms must be positive".to_string()));
        }
        if self.rebroadcast_interval_ms == 0 || self.poll_interval_ms == 0 {
            return Err(TxMintError::ConfigError(
                "rebroadcast and poll intervals must be positive".to_string(),
            ));
        }
        self.rpc_commitment()?;
        self.blockhash_commitment()?;
        self.signature_commitment()?;
        self.storage_holder()?;
        Ok(())
    }

    pub fn rpc_commitment(&self) -> Result<CommitmentLevel> {
        parse_commitment("rpc_commitment", &self.rpc_commitment)
    }

    pub fn blockhash_commitment(&self) -> Result<CommitmentLevel> {
        parse_commitment("blockhash_commitment", &self.blockhash_commitment)
    }

    pub fn signature_commitment(&self) -> Result<CommitmentLevel> {
        parse_commitment("signature_commitment", &self.signature_commitment)
    }

    pub fn storage_holder(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.storage_holder)
            .map_err(|e| TxMintError::ConfigError(format!("storage_holder: {}", e)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn rebroadcast_interval(&self) -> Duration {
        Duration::from_millis(self.rebroadcast_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}
