//! Durable broadcast and signature confirmation
//!
//! A signed transaction is submitted once, then re-sent on a fixed interval
//! until it resolves. Three observers race to resolve it: a push
//! subscription, an optional status poll loop, and a hard timer. The first
//! to finish wins and the rest are cancelled with it.

use crate::config::MinterConfig;
use crate::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_REBROADCAST_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::error::{Result, TxMintError};
use crate::ledger::{LedgerClient, SignatureNotification};
use crate::transaction::CompiledTransaction;
use solana_sdk::{commitment_config::CommitmentLevel, signature::Signature};
use std::convert::Infallible;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Per-call confirmation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub timeout: Duration,
    pub commitment: CommitmentLevel,
    /// Poll signature statuses alongside the subscription
    pub query_status: bool,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            commitment: CommitmentLevel::Processed,
            query_status: true,
        }
    }
}

impl ConfirmOptions {
    pub fn from_config(config: &MinterConfig) -> Result<Self> {
        Ok(Self {
            timeout: config.timeout(),
            commitment: config.signature_commitment()?,
            query_status: config.query_status,
        })
    }
}

/// A submitted transaction awaiting resolution
#[derive(Debug, Clone)]
pub struct PendingBroadcast {
    pub raw: Vec<u8>,
    pub signature: Signature,
    pub submitted_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed { signature: Signature, slot: u64 },
    Failed { signature: Signature, error: String },
    TimedOut { signature: Signature, elapsed: Duration },
}

/// A transaction the ledger accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedTransaction {
    pub signature: Signature,
    pub slot: u64,
}

impl ConfirmationOutcome {
    pub fn signature(&self) -> &Signature {
        match self {
            ConfirmationOutcome::Confirmed { signature, .. }
            | ConfirmationOutcome::Failed { signature, .. }
            | ConfirmationOutcome::TimedOut { signature, .. } => signature,
        }
    }

    pub fn into_result(self) -> Result<ConfirmedTransaction> {
        match self {
            ConfirmationOutcome::Confirmed { signature, slot } => {
                Ok(ConfirmedTransaction { signature, slot })
            }
            ConfirmationOutcome::Failed { signature, error } => Err(TxMintError::BroadcastFailed {
                signature: signature.to_string(),
                error,
            }),
            ConfirmationOutcome::TimedOut { signature, elapsed } => {
                Err(TxMintError::ConfirmationTimedOut {
                    signature: signature.to_string(),
                    elapsed_ms: elapsed.as_millis() as u64,
                })
            }
        }
    }
}

/// Removes a signature listener when the race ends, however it ends.
///
/// Removal is spawned so a slow ledger cannot delay the outcome.
struct SubscriptionGuard {
    ledger: Arc<dyn LedgerClient>,
    id: Option<u64>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        let ledger = Arc::clone(&self.ledger);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = ledger.remove_signature_listener(id).await {
                        debug!(id, error = %e, "Failed to remove signature listener");
                    }
                });
            }
            Err(_) => warn!(id, "No runtime to remove signature listener"),
        }
    }
}

pub struct BroadcastEngine {
    ledger: Arc<dyn LedgerClient>,
    rebroadcast_interval: Duration,
    poll_interval: Duration,
}

impl BroadcastEngine {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self::with_intervals(
            ledger,
            Duration::from_millis(DEFAULT_REBROADCAST_INTERVAL_MS),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    pub fn with_intervals(
        ledger: Arc<dyn LedgerClient>,
        rebroadcast_interval: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            rebroadcast_interval,
            poll_interval,
        }
    }

    pub fn from_config(ledger: Arc<dyn LedgerClient>, config: &MinterConfig) -> Self {
        Self::with_intervals(ledger, config.rebroadcast_interval(), config.poll_interval())
    }

    /// Submit a signed transaction and drive it to a resolution.
    ///
    /// Only the initial submission can fail outright; every later problem
    /// is reported through the outcome.
    pub async fn send_signed_transaction(
        &self,
        transaction: &CompiledTransaction,
        options: &ConfirmOptions,
    ) -> Result<ConfirmationOutcome> {
        let raw = transaction.serialize()?;
        let signature = self
            .ledger
            .send_raw_transaction(&raw, true)
            .await
            .map_err(|e| match e {
                TxMintError::RpcError(_) => e,
                other => TxMintError::RpcError(other.to_string()),
            })?;

        let pending_tx = PendingBroadcast {
            raw,
            signature,
            submitted_at: Instant::now(),
        };
        info!(%signature, size = pending_tx.raw.len(), "Transaction submitted");

        let deadline = pending_tx.submitted_at + options.timeout;
        let outcome = tokio::select! {
            outcome = self.await_signature_confirmation(&pending_tx, options) => outcome,
            never = self.rebroadcast(&pending_tx, deadline) => match never {},
        };

        let elapsed_ms = pending_tx.submitted_at.elapsed().as_millis() as u64;
        match &outcome {
            ConfirmationOutcome::Confirmed { slot, .. } => {
                info!(%signature, slot, elapsed_ms, "Transaction confirmed")
            }
            ConfirmationOutcome::Failed { error, .. } => {
                warn!(%signature, %error, elapsed_ms, "Transaction failed")
            }
            ConfirmationOutcome::TimedOut { .. } => {
                warn!(%signature, elapsed_ms, "Timed out awaiting confirmation")
            }
        }
        Ok(outcome)
    }

    /// Re-send the same bytes until the deadline. Never resolves.
    async fn rebroadcast(&self, pending_tx: &PendingBroadcast, deadline: Instant) -> Infallible {
        let mut ticker = interval_at(
            pending_tx.submitted_at + self.rebroadcast_interval,
            self.rebroadcast_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if ticker.tick().await >= deadline {
                break;
            }
            if let Err(e) = self.ledger.send_raw_transaction(&pending_tx.raw, true).await {
                debug!(signature = %pending_tx.signature, error = %e, "Rebroadcast failed");
            }
        }
        pending().await
    }

    /// Race the subscription, the poll loop and the timer.
    pub async fn await_signature_confirmation(
        &self,
        pending_tx: &PendingBroadcast,
        options: &ConfirmOptions,
    ) -> ConfirmationOutcome {
        let signature = pending_tx.signature;
        let timer = sleep_until(pending_tx.submitted_at + options.timeout);

        // Registration runs inside the race so a stalled setup cannot hold
        // off the poll loop or the timer.
        let ledger = Arc::clone(&self.ledger);
        let commitment = options.commitment;
        let notified = async move {
            let subscription = match ledger.on_signature(&signature, commitment).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    warn!(%signature, error = %e, "Signature subscription unavailable, relying on polling");
                    return pending::<SignatureNotification>().await;
                }
            };
            let _guard = SubscriptionGuard {
                ledger,
                id: Some(subscription.id),
            };
            match subscription.receiver.await {
                Ok(notification) => notification,
                Err(_) => pending().await,
            }
        };

        tokio::select! {
            biased;
            notification = notified => match notification.err {
                Some(error) => ConfirmationOutcome::Failed { signature, error },
                None => ConfirmationOutcome::Confirmed { signature, slot: notification.slot },
            },
            outcome = self.poll_status(signature, options.query_status) => outcome,
            _ = timer => ConfirmationOutcome::TimedOut {
                signature,
                elapsed: pending_tx.submitted_at.elapsed(),
            },
        }
    }

    async fn poll_status(&self, signature: Signature, enabled: bool) -> ConfirmationOutcome {
        if !enabled {
            return pending().await;
        }
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let statuses = match self.ledger.get_signature_statuses(&[signature]).await {
                Ok(statuses) => statuses,
                Err(e) => {
                    debug!(%signature, error = %e, "Status query failed");
                    continue;
                }
            };

            match statuses.into_iter().next().flatten() {
                Some(status) if status.err.is_some() => {
                    return ConfirmationOutcome::Failed {
                        signature,
                        error: status.err.unwrap_or_default(),
                    };
                }
                Some(status) if status.confirmations.unwrap_or(0) > 0 => {
                    return ConfirmationOutcome::Confirmed {
                        signature,
                        slot: status.slot,
                    };
                }
                Some(status) => trace!(%signature, slot = status.slot, "Awaiting confirmations"),
                None => trace!(%signature, "Signature not yet seen"),
            }
        }
    }
}
