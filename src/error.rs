//! Error types for TxMint

use std::fmt;
use thiserror::Error;

/// Stage of a mint that an error escaped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintPhase {
    /// Mint account, token account and placeholder metadata.
    Create,
    /// Off-chain content upload.
    Upload,
    /// Metadata update, mint-to and master edition.
    Finalize,
}

impl fmt::Display for MintPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintPhase::Create => write!(f, "create"),
            MintPhase::Upload => write!(f, "upload"),
            MintPhase::Finalize => write!(f, "finalize"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TxMintError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Buffer too small: needed {needed} bytes, got {available}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
    },

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid instruction data: {0}")]
    InvalidInstruction(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Invalid creators: {0}")]
    InvalidCreators(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Transaction {signature} failed: {error}")]
    BroadcastFailed {
        signature: String,
        error: String,
    },

    #[error("Timed out after {elapsed_ms}ms awaiting confirmation of {signature}")]
    ConfirmationTimedOut {
        signature: String,
        elapsed_ms: u64,
    },

    #[error("Upload service error: {0}")]
    UploadServiceError(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{phase} phase failed: {source}")]
    Phase {
        phase: MintPhase,
        #[source]
        source: Box<TxMintError>,
    },
}

impl TxMintError {
    /// Attach the mint phase an error escaped from.
    pub fn in_phase(self, phase: MintPhase) -> Self {
        TxMintError::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// The innermost error, with phase wrappers removed.
    pub fn root_cause(&self) -> &TxMintError {
        match self {
            TxMintError::Phase { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Phase the error was raised in, if it was wrapped by the minter.
    pub fn phase(&self) -> Option<MintPhase> {
        match self {
            TxMintError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Whether the transaction may still land and the caller could re-check it.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self.root_cause(), TxMintError::ConfirmationTimedOut { .. })
    }
}

impl From<std::io::Error> for TxMintError {
    fn from(err: std::io::Error) -> Self {
        TxMintError::SerializationError(err.to_string())
    }
}

impl From<bs58::decode::Error> for TxMintError {
    fn from(err: bs58::decode::Error) -> Self {
        TxMintError::InvalidPublicKey(err.to_string())
    }
}

impl From<serde_json::Error> for TxMintError {
    fn from(err: serde_json::Error) -> Self {
        TxMintError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TxMintError>;
