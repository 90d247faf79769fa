//! Program identifiers and protocol constants

use solana_sdk::{pubkey, pubkey::Pubkey};

/// Token-metadata program
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Associated-token-account program
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Memo program, used to record file hashes with the storage payment
pub const MEMO_PROGRAM_ID: Pubkey = pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

/// Account that receives the storage fee for uploaded files
pub const AR_SOL_HOLDER_ID: Pubkey = pubkey!("HvwC9QSAzvGXhhVrgPmauVwFWcYZhne3hVot9EbHuFTm");

pub const METADATA_PREFIX: &str = "metadata";
pub const EDITION: &str = "edition";

/// Editions tracked by one edition-marker account (31 bytes * 8 bits)
pub const EDITION_MARKER_BIT_SIZE: u64 = 248;
pub const EDITION_MARKER_LEDGER_LEN: usize = 31;

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_URI_LENGTH: usize = 200;
pub const MAX_CREATOR_LIMIT: usize = 5;
pub const MAX_SELLER_FEE_BASIS_POINTS: u16 = 10_000;

/// Phase-1 metadata points at this many spaces until the manifest is pinned
pub const PLACEHOLDER_URI_LEN: usize = 64;

/// Manifest entry in the upload response that carries the content link
pub const RESERVED_TXN_MANIFEST: &str = "manifest.json";
/// Generated metadata document uploaded with the user's files
pub const RESERVED_METADATA: &str = "metadata.json";

pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_REBROADCAST_INTERVAL_MS: u64 = 500;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_STORAGE_FEE_LAMPORTS: u64 = 100_000_000;
pub const DEFAULT_ARWEAVE_GATEWAY: &str = "https://arweave.net/";
