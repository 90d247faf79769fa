//! Wallet capability

use crate::error::{Result, TxMintError};
use crate::transaction::CompiledTransaction;
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::Path;

/// The signing side of the user's wallet.
///
/// `sign_transaction` receives a transaction whose other signers have
/// already signed and must return it with the wallet's slot filled.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    async fn sign_transaction(&self, transaction: CompiledTransaction)
        -> Result<CompiledTransaction>;
}

/// Wallet backed by an in-process keypair
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Load a keypair file: a JSON array of 64 bytes
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TxMintError::ConfigError(format!("Cannot read keypair {}: {}", path.display(), e))
        })?;
        let bytes: Vec<u8> = serde_json::from_str(&contents).map_err(|e| {
            TxMintError::ConfigError(format!("Malformed keypair {}: {}", path.display(), e))
        })?;
        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| TxMintError::ConfigError(format!("Invalid keypair: {}", e)))?;
        Ok(Self::new(keypair))
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(
        &self,
        mut transaction: CompiledTransaction,
    ) -> Result<CompiledTransaction> {
        transaction.partial_sign(&[&self.keypair])?;
        Ok(transaction)
    }
}
