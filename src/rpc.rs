//! `LedgerClient` over the JSON-RPC and websocket endpoints

use crate::error::{Result, TxMintError};
use crate::ledger::{LedgerClient, SignatureNotification, SignatureStatus, SignatureSubscription};
use crate::pda::AddressDeriver;
use async_trait::async_trait;
use futures_util::StreamExt;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_pubsub_client::nonblocking::pubsub_client::PubsubClient;
use solana_rpc_client_api::{
    config::{RpcSendTransactionConfig, RpcSignatureSubscribeConfig},
    response::RpcSignatureResult,
};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    signature::Signature,
    transaction::Transaction,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

/// A shared connection that is opened lazily and reopened after it breaks
struct ConnectionSlot<T> {
    current: Mutex<Option<Arc<T>>>,
}

impl<T> ConnectionSlot<T> {
    fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    async fn get_or_connect<F, Fut>(&self, connect: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut current = self.current.lock().await;
        if let Some(connection) = current.as_ref() {
            return Ok(Arc::clone(connection));
        }
        let connection = Arc::new(connect().await?);
        *current = Some(Arc::clone(&connection));
        Ok(connection)
    }

    /// Forget `broken` so the next caller reconnects. A newer connection
    /// already in the slot is left alone.
    async fn invalidate(&self, broken: &Arc<T>) {
        let mut current = self.current.lock().await;
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, broken)) {
            *current = None;
        }
    }
}

pub struct RpcLedgerClient {
    rpc: RpcClient,
    ws_url: String,
    pubsub: ConnectionSlot<PubsubClient>,
    listeners: Mutex<HashMap<u64, oneshot::Sender<()>>>,
    next_listener: AtomicU64,
}

impl RpcLedgerClient {
    pub fn new(rpc_url: impl Into<String>, ws_url: impl Into<String>, commitment: CommitmentLevel) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url.into(), CommitmentConfig { commitment }),
            ws_url: ws_url.into(),
            pubsub: ConnectionSlot::new(),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Websocket connection, opened on first subscription and reopened
    /// after a subscribe failure
    async fn pubsub(&self) -> Result<Arc<PubsubClient>> {
        self.pubsub
            .get_or_connect(|| async {
                debug!(url = %self.ws_url, "Opening websocket connection");
                PubsubClient::new(&self.ws_url)
                    .await
                    .map_err(|e| TxMintError::RpcError(format!("Websocket connect failed: {}", e)))
            })
            .await
    }
}

fn rpc_error(err: impl std::fmt::Display) -> TxMintError {
    TxMintError::RpcError(err.to_string())
}

impl AddressDeriver for RpcLedgerClient {}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn send_raw_transaction(&self, raw: &[u8], skip_preflight: bool) -> Result<Signature> {
        let transaction: Transaction = bincode::deserialize(raw)
            .map_err(|e| TxMintError::DeserializationError(e.to_string()))?;
        let config = RpcSendTransactionConfig {
            skip_preflight,
            ..RpcSendTransactionConfig::default()
        };
        self.rpc
            .send_transaction_with_config(&transaction, config)
            .await
            .map_err(rpc_error)
    }

    async fn on_signature(
        &self,
        signature: &Signature,
        commitment: CommitmentLevel,
    ) -> Result<SignatureSubscription> {
        let client = self.pubsub().await?;
        let connection = Arc::clone(&client);
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let signature = *signature;
        let (ready_tx, ready_rx) = oneshot::channel::<std::result::Result<(), String>>();
        let (notify_tx, notify_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let config = RpcSignatureSubscribeConfig {
                commitment: Some(CommitmentConfig { commitment }),
                enable_received_notification: Some(false),
            };
            let (mut stream, unsubscribe) =
                match client.signature_subscribe(&signature, Some(config)).await {
                    Ok(subscription) => {
                        let _ = ready_tx.send(Ok(()));
                        subscription
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

            let processed = async {
                while let Some(response) = stream.next().await {
                    if let RpcSignatureResult::ProcessedSignature(result) = response.value {
                        return Some(SignatureNotification {
                            slot: response.context.slot,
                            err: result.err.map(|e| e.to_string()),
                        });
                    }
                }
                None
            };

            tokio::select! {
                notification = processed => {
                    if let Some(notification) = notification {
                        let _ = notify_tx.send(notification);
                    }
                }
                _ = cancel_rx => {}
            }
            unsubscribe().await;
            debug!(%signature, "Signature subscription closed");
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.listeners.lock().await.insert(id, cancel_tx);
                Ok(SignatureSubscription {
                    id,
                    receiver: notify_rx,
                })
            }
            Ok(Err(e)) => {
                self.pubsub.invalidate(&connection).await;
                Err(TxMintError::RpcError(format!("Subscribe failed: {}", e)))
            }
            Err(_) => {
                self.pubsub.invalidate(&connection).await;
                Err(TxMintError::RpcError(
                    "Subscription task ended before subscribing".to_string(),
                ))
            }
        }
    }

    async fn remove_signature_listener(&self, id: u64) -> Result<()> {
        match self.listeners.lock().await.remove(&id) {
            Some(cancel) => {
                let _ = cancel.send(());
            }
            None => warn!(id, "Unknown signature listener"),
        }
        Ok(())
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>> {
        let response = self
            .rpc
            .get_signature_statuses(signatures)
            .await
            .map_err(rpc_error)?;
        Ok(response
            .value
            .into_iter()
            .map(|status| {
                status.map(|s| SignatureStatus {
                    slot: s.slot,
                    confirmations: s.confirmations.map(|c| c as u64),
                    err: s.err.map(|e| e.to_string()),
                })
            })
            .collect())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.rpc
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(rpc_error)
    }

    async fn get_recent_blockhash(&self, commitment: CommitmentLevel) -> Result<Hash> {
        self.rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig { commitment })
            .await
            .map(|(hash, _)| hash)
            .map_err(rpc_error)
    }
}
