//! Seed assembly for program-derived addresses
//!
//! Derivation itself (the bump search for an off-curve address) belongs to
//! the ledger client. This module only fixes the seed order for each account.

use crate::constants::{
    ASSOCIATED_TOKEN_PROGRAM_ID, EDITION, EDITION_MARKER_BIT_SIZE, METADATA_PREFIX,
    METADATA_PROGRAM_ID,
};
use solana_sdk::pubkey::Pubkey;

/// Capability to derive a program address and its bump from seeds
pub trait AddressDeriver {
    fn find_program_address(&self, seeds: &[&[u8]], program_id: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(seeds, program_id)
    }
}

/// Derives addresses in-process
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDeriver;

impl AddressDeriver for LocalDeriver {}

fn derive<D: AddressDeriver + ?Sized>(
    deriver: &D,
    seeds: &[Vec<u8>],
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    let seeds: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
    deriver.find_program_address(&seeds, program_id)
}

/// `["metadata", metadata_program, mint]`
pub fn metadata_seeds(mint: &Pubkey) -> Vec<Vec<u8>> {
    vec![
        METADATA_PREFIX.as_bytes().to_vec(),
        METADATA_PROGRAM_ID.to_bytes().to_vec(),
        mint.to_bytes().to_vec(),
    ]
}

/// `["metadata", metadata_program, mint, "edition"]`
pub fn edition_seeds(mint: &Pubkey) -> Vec<Vec<u8>> {
    let mut seeds = metadata_seeds(mint);
    seeds.push(EDITION.as_bytes().to_vec());
    seeds
}

/// Edition seeds followed by the decimal marker number covering `edition`
pub fn edition_marker_seeds(mint: &Pubkey, edition: u64) -> Vec<Vec<u8>> {
    let mut seeds = edition_seeds(mint);
    seeds.push((edition / EDITION_MARKER_BIT_SIZE).to_string().into_bytes());
    seeds
}

/// `[wallet, token_program, mint]`
pub fn associated_token_seeds(wallet: &Pubkey, mint: &Pubkey) -> Vec<Vec<u8>> {
    vec![
        wallet.to_bytes().to_vec(),
        spl_token::id().to_bytes().to_vec(),
        mint.to_bytes().to_vec(),
    ]
}

pub fn find_metadata_account<D: AddressDeriver + ?Sized>(deriver: &D, mint: &Pubkey) -> Pubkey {
    derive(deriver, &metadata_seeds(mint), &METADATA_PROGRAM_ID).0
}

/// Master edition and edition accounts share one derivation.
pub fn find_edition_account<D: AddressDeriver + ?Sized>(deriver: &D, mint: &Pubkey) -> Pubkey {
    derive(deriver, &edition_seeds(mint), &METADATA_PROGRAM_ID).0
}

pub fn find_edition_marker_account<D: AddressDeriver + ?Sized>(
    deriver: &D,
    mint: &Pubkey,
    edition: u64,
) -> Pubkey {
    derive(deriver, &edition_marker_seeds(mint, edition), &METADATA_PROGRAM_ID).0
}

pub fn find_associated_token_account<D: AddressDeriver + ?Sized>(
    deriver: &D,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Pubkey {
    derive(
        deriver,
        &associated_token_seeds(wallet, mint),
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_order() {
        let mint = Pubkey::new_unique();
        let seeds = edition_seeds(&mint);
        assert_eq!(seeds.len(), 4);
        assert_eq!(seeds[0], b"metadata".to_vec());
        assert_eq!(seeds[1], METADATA_PROGRAM_ID.to_bytes().to_vec());
        assert_eq!(seeds[2], mint.to_bytes().to_vec());
        assert_eq!(seeds[3], b"edition".to_vec());

        let marker = edition_marker_seeds(&mint, 500);
        assert_eq!(marker[4], b"2".to_vec());
    }

    #[test]
    fn test_metadata_account_matches_direct_derivation() {
        let mint = Pubkey::new_unique();
        let expected = Pubkey::find_program_address(
            &[b"metadata", METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
            &METADATA_PROGRAM_ID,
        )
        .0;
        assert_eq!(find_metadata_account(&LocalDeriver, &mint), expected);
        assert_ne!(find_edition_account(&LocalDeriver, &mint), expected);
    }

    #[test]
    fn test_associated_token_account_matches_spl_layout() {
        let wallet = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let expected = Pubkey::find_program_address(
            &[wallet.as_ref(), spl_token::id().as_ref(), mint.as_ref()],
            &ASSOCIATED_TOKEN_PROGRAM_ID,
        )
        .0;
        assert_eq!(
            find_associated_token_account(&LocalDeriver, &wallet, &mint),
            expected
        );
    }

    #[test]
    fn test_edition_marker_account_groups_editions() {
        let mint = Pubkey::new_unique();
        let expected = Pubkey::find_program_address(
            &[
                b"metadata",
                METADATA_PROGRAM_ID.as_ref(),
                mint.as_ref(),
                b"edition",
                b"2",
            ],
            &METADATA_PROGRAM_ID,
        )
        .0;
        assert_eq!(find_edition_marker_account(&LocalDeriver, &mint, 500), expected);

        let first = find_edition_marker_account(&LocalDeriver, &mint, 0);
        assert_eq!(find_edition_marker_account(&LocalDeriver, &mint, 247), first);
        assert_ne!(find_edition_marker_account(&LocalDeriver, &mint, 248), first);
    }

    #[test]
    fn test_derivation_is_off_curve() {
        let mint = Pubkey::new_unique();
        assert!(!find_metadata_account(&LocalDeriver, &mint).is_on_curve());
    }
}
