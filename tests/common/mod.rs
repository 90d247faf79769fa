//! In-memory collaborators for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use solana_sdk::{commitment_config::CommitmentLevel, hash::Hash, pubkey::Pubkey, signature::Signature};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use txmint::error::{Result, TxMintError};
use txmint::ledger::{
    LedgerClient, SignatureNotification, SignatureStatus, SignatureSubscription,
};
use txmint::pda::AddressDeriver;
use txmint::transaction::CompiledTransaction;
use txmint::upload::{UploadFile, UploadMessage, UploadResponse, UploadService, UploadTags};
use txmint::wallet::WalletSigner;

pub const SLOT: u64 = 4242;

#[derive(Debug, Clone)]
pub enum SubscriptionPlan {
    /// Registered but never fires
    Never,
    /// Fires after the delay with no error
    After(Duration),
    /// Fires after the delay carrying a transaction error
    FailAfter(Duration, String),
    /// Registration itself fails
    Unavailable,
    /// Registration never completes
    Hang,
}

#[derive(Debug, Clone)]
pub enum PollPlan {
    /// Signature is never seen
    Never,
    /// Confirmed from the nth query on (1-based)
    ConfirmAfter(usize),
    /// Reports an error from the nth query on
    FailAfter(usize),
    /// Every query errors
    Error,
}

pub struct MockLedger {
    subscription: SubscriptionPlan,
    poll: PollPlan,
    reject_send: bool,
    removal_delay: Option<Duration>,
    next_id: AtomicU64,
    pub sends: AtomicUsize,
    pub status_queries: AtomicUsize,
    pub raw_transactions: Mutex<Vec<Vec<u8>>>,
    pub registered_listeners: Mutex<Vec<u64>>,
    pub removed_listeners: Mutex<Vec<u64>>,
}

impl MockLedger {
    pub fn new(subscription: SubscriptionPlan, poll: PollPlan) -> Self {
        Self {
            subscription,
            poll,
            reject_send: false,
            removal_delay: None,
            next_id: AtomicU64::new(1),
            sends: AtomicUsize::new(0),
            status_queries: AtomicUsize::new(0),
            raw_transactions: Mutex::new(Vec::new()),
            registered_listeners: Mutex::new(Vec::new()),
            removed_listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting_sends(mut self) -> Self {
        self.reject_send = true;
        self
    }

    /// Listener removal takes this long to return
    pub fn slow_removal(mut self, delay: Duration) -> Self {
        self.removal_delay = Some(delay);
        self
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    /// Distinct transactions submitted, in order
    pub fn distinct_transactions(&self) -> Vec<CompiledTransaction> {
        let mut seen: Vec<Vec<u8>> = Vec::new();
        for raw in self.raw_transactions.lock().unwrap().iter() {
            if !seen.contains(raw) {
                seen.push(raw.clone());
            }
        }
        seen.iter()
            .map(|raw| CompiledTransaction::deserialize(raw).unwrap())
            .collect()
    }
}

impl AddressDeriver for MockLedger {}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn send_raw_transaction(&self, raw: &[u8], _skip_preflight: bool) -> Result<Signature> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.reject_send {
            return Err(TxMintError::RpcError("node unavailable".to_string()));
        }
        self.raw_transactions.lock().unwrap().push(raw.to_vec());
        let transaction = CompiledTransaction::deserialize(raw)?;
        transaction
            .signature()
            .copied()
            .ok_or_else(|| TxMintError::InvalidTransaction("unsigned".to_string()))
    }

    async fn on_signature(
        &self,
        _signature: &Signature,
        _commitment: CommitmentLevel,
    ) -> Result<SignatureSubscription> {
        let (sender, receiver) = oneshot::channel();
        let fire = match &self.subscription {
            SubscriptionPlan::Unavailable => {
                return Err(TxMintError::RpcError("websocket down".to_string()))
            }
            SubscriptionPlan::Hang => return std::future::pending().await,
            SubscriptionPlan::Never => None,
            SubscriptionPlan::After(delay) => Some((*delay, None)),
            SubscriptionPlan::FailAfter(delay, error) => Some((*delay, Some(error.clone()))),
        };

        match fire {
            Some((delay, err)) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = sender.send(SignatureNotification { slot: SLOT, err });
                });
            }
            // Keep the sender alive so the receiver stays pending.
            None => std::mem::forget(sender),
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.registered_listeners.lock().unwrap().push(id);
        Ok(SignatureSubscription { id, receiver })
    }

    async fn remove_signature_listener(&self, id: u64) -> Result<()> {
        if let Some(delay) = self.removal_delay {
            tokio::time::sleep(delay).await;
        }
        self.removed_listeners.lock().unwrap().push(id);
        Ok(())
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>> {
        let n = self.status_queries.fetch_add(1, Ordering::SeqCst) + 1;
        let status = match self.poll {
            PollPlan::Never => None,
            PollPlan::Error => return Err(TxMintError::RpcError("rate limited".to_string())),
            PollPlan::ConfirmAfter(k) if n >= k => Some(SignatureStatus {
                slot: SLOT,
                confirmations: Some(1),
                err: None,
            }),
            PollPlan::FailAfter(k) if n >= k => Some(SignatureStatus {
                slot: SLOT,
                confirmations: Some(0),
                err: Some("InstructionError(0, Custom(1))".to_string()),
            }),
            _ => Some(SignatureStatus {
                slot: SLOT,
                confirmations: Some(0),
                err: None,
            }),
        };
        Ok(signatures.iter().map(|_| status.clone()).collect())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, _data_len: usize) -> Result<u64> {
        Ok(1_461_600)
    }

    async fn get_recent_blockhash(&self, _commitment: CommitmentLevel) -> Result<Hash> {
        Ok(Hash::new_unique())
    }
}

#[derive(Debug, Clone)]
pub enum UploadPlan {
    Manifest(String),
    NoManifest,
    Error,
}

#[derive(Debug, Clone)]
pub struct UploadCall {
    pub filenames: Vec<String>,
    pub tags: UploadTags,
    pub transaction: String,
}

pub struct MockUploader {
    plan: UploadPlan,
    pub calls: Mutex<Vec<UploadCall>>,
}

impl MockUploader {
    pub fn new(plan: UploadPlan) -> Self {
        Self {
            plan,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl UploadService for MockUploader {
    async fn upload(
        &self,
        files: &[UploadFile],
        tags: &UploadTags,
        transaction: &str,
    ) -> Result<UploadResponse> {
        self.calls.lock().unwrap().push(UploadCall {
            filenames: files.iter().map(|f| f.name.clone()).collect(),
            tags: tags.clone(),
            transaction: transaction.to_string(),
        });

        let mut messages: Vec<UploadMessage> = files
            .iter()
            .map(|f| UploadMessage {
                filename: f.name.clone(),
                transaction_id: Some(format!("{}-id", f.name)),
            })
            .collect();
        match &self.plan {
            UploadPlan::Manifest(id) => messages.push(UploadMessage {
                filename: "manifest.json".to_string(),
                transaction_id: Some(id.clone()),
            }),
            UploadPlan::NoManifest => {}
            UploadPlan::Error => {
                return Err(TxMintError::UploadServiceError("502 Bad Gateway".to_string()))
            }
        }
        Ok(UploadResponse { messages })
    }
}

/// A wallet whose user always rejects the signing prompt
pub struct FailingWallet(pub Pubkey);

#[async_trait]
impl WalletSigner for FailingWallet {
    fn pubkey(&self) -> Pubkey {
        self.0
    }

    async fn sign_transaction(&self, _: CompiledTransaction) -> Result<CompiledTransaction> {
        Err(TxMintError::SigningError("User rejected the request".to_string()))
    }
}
