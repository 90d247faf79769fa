//! Ledger capability consumed by the confirm engine and the minter

use crate::error::Result;
use crate::pda::AddressDeriver;
use async_trait::async_trait;
use solana_sdk::{commitment_config::CommitmentLevel, hash::Hash, signature::Signature};
use tokio::sync::oneshot;

/// Push notification that a signature reached the requested commitment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureNotification {
    pub slot: u64,
    pub err: Option<String>,
}

/// Polled status of one signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the block is rooted
    pub confirmations: Option<u64>,
    pub err: Option<String>,
}

/// A registered signature listener. The receiver fires at most once.
#[derive(Debug)]
pub struct SignatureSubscription {
    pub id: u64,
    pub receiver: oneshot::Receiver<SignatureNotification>,
}

#[async_trait]
pub trait LedgerClient: AddressDeriver + Send + Sync {
    /// Submit serialized transaction bytes and return the transaction id
    async fn send_raw_transaction(&self, raw: &[u8], skip_preflight: bool) -> Result<Signature>;

    async fn on_signature(
        &self,
        signature: &Signature,
        commitment: CommitmentLevel,
    ) -> Result<SignatureSubscription>;

    async fn remove_signature_listener(&self, id: u64) -> Result<()>;

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    async fn get_recent_blockhash(&self, commitment: CommitmentLevel) -> Result<Hash>;
}
