mod common;

use common::{FailingWallet, MockLedger, MockUploader, PollPlan, SubscriptionPlan, UploadPlan};
use serde_json::json;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_program,
};
use std::sync::Arc;
use std::time::Duration;
use txmint::constants::{MEMO_PROGRAM_ID, METADATA_PROGRAM_ID};
use txmint::minter::{Finalization, Minter, NftMetadata};
use txmint::schema::{
    CREATE_MASTER_EDITION_INSTRUCTION, CREATE_METADATA_INSTRUCTION, UPDATE_METADATA_INSTRUCTION,
};
use txmint::transaction::CompiledTransaction;
use txmint::upload::UploadFile;
use txmint::wallet::{KeypairWallet, WalletSigner};
use txmint::{MintPhase, MinterConfig, TxMintError};

fn metadata(creator: &Pubkey, share: u32) -> NftMetadata {
    serde_json::from_value(json!({
        "name": "Sunrise",
        "symbol": "SUN",
        "description": "First light over the harbour",
        "sellerFeeBasisPoints": 500,
        "image": "sunrise.png",
        "properties": { "files": [{ "uri": "sunrise.png", "type": "image/png" }] },
        "creators": [{ "address": creator.to_string(), "share": share }]
    }))
    .unwrap()
}

fn image() -> Vec<UploadFile> {
    vec![UploadFile::new("sunrise.png", vec![0x89, 0x50, 0x4e, 0x47]).with_content_type("image/png")]
}

fn metadata_discriminators(tx: &CompiledTransaction) -> Vec<u8> {
    tx.message
        .instructions
        .iter()
        .filter(|ix| tx.message.account_keys[ix.program_id_index as usize] == METADATA_PROGRAM_ID)
        .filter_map(|ix| ix.data.first().copied())
        .collect()
}

fn programs(tx: &CompiledTransaction) -> Vec<Pubkey> {
    tx.message
        .instructions
        .iter()
        .map(|ix| tx.message.account_keys[ix.program_id_index as usize])
        .collect()
}

fn minter(ledger: &Arc<MockLedger>, uploader: &Arc<MockUploader>, config: MinterConfig) -> Minter {
    Minter::new(ledger.clone(), uploader.clone(), config).unwrap()
}

fn confirming_ledger() -> Arc<MockLedger> {
    Arc::new(MockLedger::new(
        SubscriptionPlan::After(Duration::from_millis(100)),
        PollPlan::Never,
    ))
}

#[tokio::test(start_paused = true)]
async fn test_mint_completes_with_content_link() {
    let wallet = KeypairWallet::new(Keypair::new());
    let ledger = confirming_ledger();
    let uploader = Arc::new(MockUploader::new(UploadPlan::Manifest("abc123".to_string())));

    let result = minter(&ledger, &uploader, MinterConfig::default())
        .mint(&wallet, image(), &metadata(&wallet.pubkey(), 100))
        .await
        .unwrap();

    assert!(result.resolved_content_link.starts_with("https://arweave.net/"));
    assert_eq!(result.resolved_content_link, "https://arweave.net/abc123");
    assert!(matches!(result.finalization, Finalization::Completed { .. }));

    let transactions = ledger.distinct_transactions();
    assert_eq!(transactions.len(), 2);

    let create = &transactions[0];
    create.verify().unwrap();
    assert_eq!(create.message.account_keys[0], wallet.pubkey());
    assert_eq!(create.signatures[0], result.phase_one_signature);
    assert_eq!(
        programs(create),
        vec![
            system_program::id(),
            MEMO_PROGRAM_ID,
            MEMO_PROGRAM_ID,
            system_program::id(),
            spl_token::id(),
            txmint::constants::ASSOCIATED_TOKEN_PROGRAM_ID,
            METADATA_PROGRAM_ID,
        ]
    );
    assert_eq!(metadata_discriminators(create), vec![CREATE_METADATA_INSTRUCTION]);
    assert!(create.message.account_keys.contains(&result.mint));

    let finalize = &transactions[1];
    finalize.verify().unwrap();
    assert_eq!(
        metadata_discriminators(finalize),
        vec![UPDATE_METADATA_INSTRUCTION, CREATE_MASTER_EDITION_INSTRUCTION]
    );
    match result.finalization {
        Finalization::Completed { signature, .. } => assert_eq!(signature, finalize.signatures[0]),
        Finalization::Skipped { .. } => unreachable!(),
    }

    let calls = uploader.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].transaction, result.phase_one_signature.to_string());
    assert_eq!(calls[0].filenames, vec!["sunrise.png", "metadata.json"]);
    for filename in &calls[0].filenames {
        let tags = &calls[0].tags[filename];
        assert_eq!(tags[0].name, "mint");
        assert_eq!(tags[0].value, result.mint.to_string());
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_manifest_skips_finalization() {
    let wallet = KeypairWallet::new(Keypair::new());
    let ledger = confirming_ledger();
    let uploader = Arc::new(MockUploader::new(UploadPlan::NoManifest));

    let result = minter(&ledger, &uploader, MinterConfig::default())
        .mint(&wallet, image(), &metadata(&wallet.pubkey(), 100))
        .await
        .unwrap();

    assert_eq!(result.resolved_content_link, "");
    assert!(matches!(result.finalization, Finalization::Skipped { .. }));

    let transactions = ledger.distinct_transactions();
    assert_eq!(transactions.len(), 1);
    assert!(transactions
        .iter()
        .all(|tx| !metadata_discriminators(tx).contains(&CREATE_MASTER_EDITION_INSTRUCTION)));
}

#[tokio::test(start_paused = true)]
async fn test_upload_error_skips_finalization() {
    let wallet = KeypairWallet::new(Keypair::new());
    let ledger = confirming_ledger();
    let uploader = Arc::new(MockUploader::new(UploadPlan::Error));

    let result = minter(&ledger, &uploader, MinterConfig::default())
        .mint(&wallet, image(), &metadata(&wallet.pubkey(), 100))
        .await
        .unwrap();

    match &result.finalization {
        Finalization::Skipped { reason } => assert!(reason.contains("502")),
        other => panic!("expected skip, got {:?}", other),
    }
    assert_eq!(ledger.distinct_transactions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wallet_rejection_stops_before_submission() {
    let wallet = FailingWallet(Pubkey::new_unique());
    let ledger = confirming_ledger();
    let uploader = Arc::new(MockUploader::new(UploadPlan::Manifest("abc123".to_string())));

    let err = minter(&ledger, &uploader, MinterConfig::default())
        .mint(&wallet, image(), &metadata(&wallet.0, 100))
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), TxMintError::SigningError(_)));
    assert_eq!(err.phase(), Some(MintPhase::Create));
    assert_eq!(ledger.sends(), 0);
    assert!(uploader.calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_phase_one_timeout_aborts_mint() {
    let wallet = KeypairWallet::new(Keypair::new());
    let ledger = Arc::new(MockLedger::new(SubscriptionPlan::Never, PollPlan::Never));
    let uploader = Arc::new(MockUploader::new(UploadPlan::Manifest("abc123".to_string())));
    let config = MinterConfig::from_toml_str("timeout_ms = 200").unwrap();

    let err = minter(&ledger, &uploader, config)
        .mint(&wallet, image(), &metadata(&wallet.pubkey(), 100))
        .await
        .unwrap_err();

    assert!(err.is_ambiguous());
    assert_eq!(err.phase(), Some(MintPhase::Create));
    assert!(uploader.calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_creator_shares_unenforced_by_default() {
    let wallet = KeypairWallet::new(Keypair::new());
    let ledger = confirming_ledger();
    let uploader = Arc::new(MockUploader::new(UploadPlan::NoManifest));

    let result = minter(&ledger, &uploader, MinterConfig::default())
        .mint(&wallet, image(), &metadata(&wallet.pubkey(), 40))
        .await;
    assert!(result.is_ok());

    let strict = MinterConfig::from_toml_str("enforce_creator_shares = true").unwrap();
    let err = minter(&ledger, &uploader, strict)
        .mint(&wallet, image(), &metadata(&wallet.pubkey(), 40))
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), TxMintError::InvalidCreators(_)));
    assert_eq!(ledger.distinct_transactions().len(), 1);
}
