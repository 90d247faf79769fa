//! TxMint - NFT minting over Solana
//!
//! Builds token-metadata instructions with a hand-rolled codec, assembles
//! them into signed legacy transactions, and drives each one to a resolution
//! with durable re-broadcast raced against a subscription, a status poll and
//! a hard timeout.

pub mod assembler;
pub mod broadcast;
pub mod builders;
pub mod config;
pub mod constants;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod logging;
pub mod minter;
pub mod pda;
pub mod rpc;
pub mod schema;
pub mod serialization;
pub mod transaction;
pub mod upload;
pub mod wallet;

pub use broadcast::{BroadcastEngine, ConfirmOptions, ConfirmationOutcome};
pub use config::MinterConfig;
pub use error::{MintPhase, Result, TxMintError};
pub use minter::{Finalization, MintResult, Minter, NftMetadata};
pub use transaction::{CompiledTransaction, TransactionBuilder};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::assembler::assemble;
    pub use crate::broadcast::{
        BroadcastEngine, ConfirmOptions, ConfirmationOutcome, ConfirmedTransaction,
    };
    pub use crate::config::MinterConfig;
    pub use crate::error::{MintPhase, TxMintError};
    pub use crate::instruction::{AccountMeta, InstructionEncoder, RawInstruction};
    pub use crate::ledger::{LedgerClient, SignatureNotification, SignatureStatus};
    pub use crate::minter::{CreatorInput, Finalization, MintResult, Minter, NftMetadata};
    pub use crate::rpc::RpcLedgerClient;
    pub use crate::transaction::{CompiledTransaction, TransactionBuilder};
    pub use crate::upload::{HttpUploadService, UploadFile, UploadService};
    pub use crate::wallet::{KeypairWallet, WalletSigner};
}
