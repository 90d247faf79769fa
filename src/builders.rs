//! Instruction builders for the minting flow
//!
//! Each builder appends to a caller-owned instruction list and returns the
//! address it allocates or derives. Nothing here touches the network.
//!
//! Account tables (`s` signer, `w` writable):
//!
//! | instruction | accounts |
//! |---|---|
//! | create associated account | payer s w, associated account w, wallet, mint, system program, token program, rent |
//! | create metadata | metadata w, mint, mint authority s, payer s, update authority, system program, rent |
//! | update metadata | metadata w, update authority s |
//! | create master edition | edition w, mint w, update authority s, mint authority s, payer s, metadata, token program, system program, rent |

use crate::constants::{ASSOCIATED_TOKEN_PROGRAM_ID, MEMO_PROGRAM_ID, METADATA_PROGRAM_ID};
use crate::error::{Result, TxMintError};
use crate::instruction::{InstructionEncoder, RawInstruction};
use crate::pda::{find_edition_account, find_metadata_account, AddressDeriver};
use crate::schema::{CreateMasterEditionArgs, CreateMetadataArgs, Data, UpdateMetadataArgs};
use crate::serialization::ByteSerialize;
use crate::upload::UploadFile;
use solana_sdk::{
    program_pack::Pack,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction, system_program, sysvar,
};
use spl_token::state::Mint;

fn token_instruction(
    result: std::result::Result<solana_sdk::instruction::Instruction, solana_sdk::program_error::ProgramError>,
) -> Result<RawInstruction> {
    result
        .map(|ix| RawInstruction::from_sdk_instruction(&ix))
        .map_err(|e| TxMintError::InvalidInstruction(e.to_string()))
}

/// Allocate a mint account owned by the token program and initialize it.
///
/// The fresh mint keypair is pushed onto `signers`; the transaction cannot be
/// submitted without its signature.
pub fn create_mint(
    instructions: &mut Vec<RawInstruction>,
    signers: &mut Vec<Keypair>,
    payer: &Pubkey,
    mint_rent: u64,
    decimals: u8,
    owner: &Pubkey,
    freeze_authority: Option<&Pubkey>,
) -> Result<Pubkey> {
    let mint = Keypair::new();
    let mint_key = mint.pubkey();

    let create = system_instruction::create_account(
        payer,
        &mint_key,
        mint_rent,
        Mint::LEN as u64,
        &spl_token::id(),
    );
    instructions.push(RawInstruction::from_sdk_instruction(&create));
    instructions.push(token_instruction(spl_token::instruction::initialize_mint(
        &spl_token::id(),
        &mint_key,
        owner,
        freeze_authority,
        decimals,
    ))?);

    signers.push(mint);
    Ok(mint_key)
}

pub fn create_associated_token_account(
    instructions: &mut Vec<RawInstruction>,
    associated_account: &Pubkey,
    payer: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
) {
    instructions.push(
        InstructionEncoder::new(ASSOCIATED_TOKEN_PROGRAM_ID)
            .signer(*payer, true)
            .writable(*associated_account, false)
            .readonly(*wallet)
            .readonly(*mint)
            .readonly(system_program::id())
            .readonly(spl_token::id())
            .readonly(sysvar::rent::id())
            .build(),
    );
}

/// Create the metadata account for `mint`. Returns the derived metadata address.
pub fn create_metadata<D: AddressDeriver + ?Sized>(
    instructions: &mut Vec<RawInstruction>,
    deriver: &D,
    data: Data,
    update_authority: &Pubkey,
    mint: &Pubkey,
    mint_authority: &Pubkey,
    payer: &Pubkey,
) -> Result<Pubkey> {
    data.validate()?;
    let metadata_account = find_metadata_account(deriver, mint);
    let payload = CreateMetadataArgs {
        data,
        is_mutable: true,
    }
    .to_bytes()?;

    instructions.push(
        InstructionEncoder::new(METADATA_PROGRAM_ID)
            .writable(metadata_account, false)
            .readonly(*mint)
            .signer(*mint_authority, false)
            .signer(*payer, false)
            .readonly(*update_authority)
            .readonly(system_program::id())
            .readonly(sysvar::rent::id())
            .data(payload)
            .build(),
    );
    Ok(metadata_account)
}

/// Update an existing metadata account. Derives the account from `mint` when
/// `metadata_account` is not supplied.
#[allow(clippy::too_many_arguments)]
pub fn update_metadata<D: AddressDeriver + ?Sized>(
    instructions: &mut Vec<RawInstruction>,
    deriver: &D,
    data: Option<Data>,
    new_update_authority: Option<String>,
    primary_sale_happened: Option<bool>,
    mint: &Pubkey,
    update_authority: &Pubkey,
    metadata_account: Option<Pubkey>,
) -> Result<Pubkey> {
    if let Some(data) = &data {
        data.validate()?;
    }
    let metadata_account =
        metadata_account.unwrap_or_else(|| find_metadata_account(deriver, mint));
    let payload = UpdateMetadataArgs {
        data,
        update_authority: new_update_authority,
        primary_sale_happened,
    }
    .to_bytes()?;

    instructions.push(
        InstructionEncoder::new(METADATA_PROGRAM_ID)
            .writable(metadata_account, false)
            .signer(*update_authority, false)
            .data(payload)
            .build(),
    );
    Ok(metadata_account)
}

/// Register `mint` as a master edition. Returns the edition address.
pub fn create_master_edition<D: AddressDeriver + ?Sized>(
    instructions: &mut Vec<RawInstruction>,
    deriver: &D,
    max_supply: Option<u64>,
    mint: &Pubkey,
    update_authority: &Pubkey,
    mint_authority: &Pubkey,
    payer: &Pubkey,
) -> Result<Pubkey> {
    let metadata_account = find_metadata_account(deriver, mint);
    let edition_account = find_edition_account(deriver, mint);
    let payload = CreateMasterEditionArgs { max_supply }.to_bytes()?;

    instructions.push(
        InstructionEncoder::new(METADATA_PROGRAM_ID)
            .writable(edition_account, false)
            .writable(*mint, false)
            .signer(*update_authority, false)
            .signer(*mint_authority, false)
            .signer(*payer, false)
            .readonly(metadata_account)
            .readonly(spl_token::id())
            .readonly(system_program::id())
            .readonly(sysvar::rent::id())
            .data(payload)
            .build(),
    );
    Ok(edition_account)
}

pub fn mint_to(
    instructions: &mut Vec<RawInstruction>,
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<()> {
    instructions.push(token_instruction(spl_token::instruction::mint_to(
        &spl_token::id(),
        mint,
        destination,
        authority,
        &[],
        amount,
    ))?);
    Ok(())
}

/// Pay the storage fee and record each file's SHA-256 in a memo.
pub fn pay_for_files(
    instructions: &mut Vec<RawInstruction>,
    wallet: &Pubkey,
    files: &[UploadFile],
    storage_holder: &Pubkey,
    fee_lamports: u64,
) {
    let transfer = system_instruction::transfer(wallet, storage_holder, fee_lamports);
    instructions.push(RawInstruction::from_sdk_instruction(&transfer));

    for file in files {
        instructions.push(
            InstructionEncoder::new(MEMO_PROGRAM_ID)
                .data(file.sha256_hex().into_bytes())
                .build(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::AccountMeta;
    use crate::pda::{find_associated_token_account, LocalDeriver};
    use crate::schema::Creator;
    use crate::serialization::ByteDeserialize;

    fn data(uri: &str) -> Data {
        Data {
            name: "Sunrise".to_string(),
            symbol: "SUN".to_string(),
            uri: uri.to_string(),
            seller_fee_basis_points: 250,
            creators: Some(vec![Creator {
                address: Pubkey::new_unique().to_string(),
                verified: false,
                share: 100,
            }]),
        }
    }

    fn flags(ix: &RawInstruction) -> Vec<(bool, bool)> {
        ix.accounts.iter().map(|a| (a.is_signer, a.is_writable)).collect()
    }

    #[test]
    fn test_create_mint_adds_signer() {
        let payer = Pubkey::new_unique();
        let mut instructions = Vec::new();
        let mut signers = Vec::new();

        let mint = create_mint(
            &mut instructions,
            &mut signers,
            &payer,
            1_461_600,
            0,
            &payer,
            Some(&payer),
        )
        .unwrap();

        assert_eq!(instructions.len(), 2);
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].pubkey(), mint);
        assert_eq!(instructions[0].program_id, system_program::id());
        assert_eq!(instructions[0].accounts[1], AccountMeta::new(mint, true, true));
        assert_eq!(instructions[1].program_id, spl_token::id());
        assert_eq!(instructions[1].accounts[0].pubkey, mint);
    }

    #[test]
    fn test_associated_account_order() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ata = find_associated_token_account(&LocalDeriver, &payer, &mint);
        let mut instructions = Vec::new();

        create_associated_token_account(&mut instructions, &ata, &payer, &payer, &mint);

        let ix = &instructions[0];
        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert!(ix.data.is_empty());
        let keys: Vec<Pubkey> = ix.accounts.iter().map(|a| a.pubkey).collect();
        assert_eq!(
            keys,
            vec![
                payer,
                ata,
                payer,
                mint,
                system_program::id(),
                spl_token::id(),
                sysvar::rent::id()
            ]
        );
        assert_eq!(
            flags(ix),
            vec![
                (true, true),
                (false, true),
                (false, false),
                (false, false),
                (false, false),
                (false, false),
                (false, false)
            ]
        );
    }

    #[test]
    fn test_create_metadata_order_and_payload() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let mut instructions = Vec::new();

        let metadata = create_metadata(
            &mut instructions,
            &LocalDeriver,
            data(&" ".repeat(64)),
            &payer,
            &mint,
            &payer,
            &payer,
        )
        .unwrap();

        let ix = &instructions[0];
        assert_eq!(ix.program_id, METADATA_PROGRAM_ID);
        assert_eq!(metadata, find_metadata_account(&LocalDeriver, &mint));
        let keys: Vec<Pubkey> = ix.accounts.iter().map(|a| a.pubkey).collect();
        assert_eq!(
            keys,
            vec![
                metadata,
                mint,
                payer,
                payer,
                payer,
                system_program::id(),
                sysvar::rent::id()
            ]
        );
        assert_eq!(
            flags(ix),
            vec![
                (false, true),
                (false, false),
                (true, false),
                (true, false),
                (false, false),
                (false, false),
                (false, false)
            ]
        );

        let args = CreateMetadataArgs::from_bytes(&ix.data).unwrap();
        assert!(args.is_mutable);
        assert_eq!(args.data.uri.len(), 64);
    }

    #[test]
    fn test_create_metadata_rejects_bad_data_before_push() {
        let payer = Pubkey::new_unique();
        let mut bad = data("uri");
        bad.creators = Some(vec![]);
        let mut instructions = Vec::new();

        let result = create_metadata(
            &mut instructions,
            &LocalDeriver,
            bad,
            &payer,
            &Pubkey::new_unique(),
            &payer,
            &payer,
        );
        assert!(matches!(result, Err(TxMintError::InvalidCreators(_))));
        assert!(instructions.is_empty());
    }

    #[test]
    fn test_update_metadata_order() {
        let authority = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let known = Pubkey::new_unique();
        let mut instructions = Vec::new();

        let account = update_metadata(
            &mut instructions,
            &LocalDeriver,
            Some(data("https://arweave.net/abc")),
            None,
            None,
            &mint,
            &authority,
            Some(known),
        )
        .unwrap();

        assert_eq!(account, known);
        let ix = &instructions[0];
        assert_eq!(ix.accounts[0], AccountMeta::new(known, false, true));
        assert_eq!(ix.accounts[1], AccountMeta::new(authority, true, false));
        assert_eq!(ix.discriminator(), Some(1));

        let args = UpdateMetadataArgs::from_bytes(&ix.data).unwrap();
        assert_eq!(args.data.unwrap().uri, "https://arweave.net/abc");
        assert_eq!(args.update_authority, None);
    }

    #[test]
    fn test_update_metadata_derives_account() {
        let mint = Pubkey::new_unique();
        let mut instructions = Vec::new();
        let account = update_metadata(
            &mut instructions,
            &LocalDeriver,
            None,
            None,
            Some(true),
            &mint,
            &Pubkey::new_unique(),
            None,
        )
        .unwrap();
        assert_eq!(account, find_metadata_account(&LocalDeriver, &mint));
    }

    #[test]
    fn test_master_edition_order() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let mut instructions = Vec::new();

        let edition = create_master_edition(
            &mut instructions,
            &LocalDeriver,
            Some(1),
            &mint,
            &payer,
            &payer,
            &payer,
        )
        .unwrap();

        let ix = &instructions[0];
        let keys: Vec<Pubkey> = ix.accounts.iter().map(|a| a.pubkey).collect();
        assert_eq!(
            keys,
            vec![
                edition,
                mint,
                payer,
                payer,
                payer,
                find_metadata_account(&LocalDeriver, &mint),
                spl_token::id(),
                system_program::id(),
                sysvar::rent::id()
            ]
        );
        assert_eq!(
            flags(ix),
            vec![
                (false, true),
                (false, true),
                (true, false),
                (true, false),
                (true, false),
                (false, false),
                (false, false),
                (false, false),
                (false, false)
            ]
        );
        assert_eq!(
            CreateMasterEditionArgs::from_bytes(&ix.data).unwrap().max_supply,
            Some(1)
        );
    }

    #[test]
    fn test_mint_to_accounts() {
        let mint = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let mut instructions = Vec::new();

        mint_to(&mut instructions, &mint, &destination, &authority, 1).unwrap();

        let ix = &instructions[0];
        assert_eq!(ix.program_id, spl_token::id());
        assert_eq!(ix.accounts[0], AccountMeta::new(mint, false, true));
        assert_eq!(ix.accounts[1], AccountMeta::new(destination, false, true));
        assert_eq!(ix.accounts[2], AccountMeta::new(authority, true, false));
    }

    #[test]
    fn test_pay_for_files_memos() {
        let wallet = Pubkey::new_unique();
        let holder = Pubkey::new_unique();
        let files = vec![
            UploadFile::new("a.png", b"abc".to_vec()),
            UploadFile::new("metadata.json", b"{}".to_vec()),
        ];
        let mut instructions = Vec::new();

        pay_for_files(&mut instructions, &wallet, &files, &holder, 100_000_000);

        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].program_id, system_program::id());
        assert_eq!(instructions[1].program_id, MEMO_PROGRAM_ID);
        assert!(instructions[1].accounts.is_empty());
        assert_eq!(
            instructions[1].data,
            b"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_vec()
        );
    }
}
