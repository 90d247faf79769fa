//! Two-phase NFT mint
//!
//! Phase one pays for storage, creates the mint and the recipient's token
//! account, and writes metadata with a placeholder URI. Once that lands the
//! files are uploaded, tagged with the mint, using the phase-one signature as
//! proof of payment. Phase two points the metadata at the pinned manifest,
//! mints the single token and locks supply with a master edition.

use crate::assembler::assemble;
use crate::broadcast::{BroadcastEngine, ConfirmOptions, ConfirmedTransaction};
use crate::builders::{
    create_associated_token_account, create_master_edition, create_metadata, create_mint,
    mint_to, pay_for_files, update_metadata,
};
use crate::config::MinterConfig;
use crate::constants::{PLACEHOLDER_URI_LEN, RESERVED_METADATA};
use crate::error::{MintPhase, Result};
use crate::ledger::LedgerClient;
use crate::pda::find_associated_token_account;
use crate::schema::{validate_creator_shares, validate_creators, Creator, Data};
use crate::upload::{mint_tags, UploadFile, UploadService};
use crate::wallet::WalletSigner;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use solana_sdk::{program_pack::Pack, pubkey::Pubkey, signature::Keypair, signature::Signature};
use spl_token::state::Mint;
use std::sync::Arc;
use tracing::{info, warn};

/// A creator as the caller describes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorInput {
    pub address: String,
    pub share: u32,
    #[serde(default)]
    pub verified: bool,
}

/// The caller's description of the asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftMetadata {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    pub seller_fee_basis_points: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "animation_url", default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    #[serde(rename = "external_url", default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub creators: Vec<CreatorInput>,
}

impl NftMetadata {
    pub fn creators(&self) -> Result<Vec<Creator>> {
        self.creators
            .iter()
            .map(|c| Creator::try_new(&c.address, c.verified, c.share))
            .collect()
    }

    /// The `metadata.json` document pinned next to the files.
    ///
    /// Creators are listed under `properties` without their verified flag.
    pub fn manifest(&self) -> Value {
        let mut properties = self.properties.clone();
        properties.insert(
            "creators".to_string(),
            Value::Array(
                self.creators
                    .iter()
                    .map(|c| json!({ "address": c.address, "share": c.share }))
                    .collect(),
            ),
        );

        let mut manifest = json!({
            "name": self.name,
            "symbol": self.symbol,
            "description": self.description,
            "sellerFeeBasisPoints": self.seller_fee_basis_points,
            "properties": properties,
        });
        if let Value::Object(fields) = &mut manifest {
            for (key, value) in [
                ("image", &self.image),
                ("animation_url", &self.animation_url),
                ("external_url", &self.external_url),
            ] {
                if let Some(value) = value {
                    fields.insert(key.to_string(), Value::String(value.clone()));
                }
            }
        }
        manifest
    }

    fn data(&self, uri: String, creators: Vec<Creator>) -> Data {
        Data {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            uri,
            seller_fee_basis_points: self.seller_fee_basis_points,
            creators: Some(creators),
        }
    }
}

/// How the second phase ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalization {
    Completed { signature: Signature, slot: u64 },
    /// The upload produced no content link; the mint keeps its placeholder URI.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintResult {
    pub metadata_account: Pubkey,
    /// Empty when finalization was skipped
    pub resolved_content_link: String,
    pub mint: Pubkey,
    pub recipient_token_account: Pubkey,
    pub phase_one_signature: Signature,
    pub finalization: Finalization,
}

struct CreatedMint {
    mint: Pubkey,
    recipient_token_account: Pubkey,
    metadata_account: Pubkey,
    creators: Vec<Creator>,
    confirmed: ConfirmedTransaction,
}

pub struct Minter {
    ledger: Arc<dyn LedgerClient>,
    uploader: Arc<dyn UploadService>,
    engine: BroadcastEngine,
    config: MinterConfig,
}

impl Minter {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        uploader: Arc<dyn UploadService>,
        config: MinterConfig,
    ) -> Result<Self> {
        config.validate()?;
        let engine = BroadcastEngine::from_config(Arc::clone(&ledger), &config);
        Ok(Self {
            ledger,
            uploader,
            engine,
            config,
        })
    }

    pub fn config(&self) -> &MinterConfig {
        &self.config
    }

    pub async fn mint(
        &self,
        wallet: &dyn WalletSigner,
        files: Vec<UploadFile>,
        metadata: &NftMetadata,
    ) -> Result<MintResult> {
        let mut files = files;
        files.push(
            UploadFile::json(RESERVED_METADATA, &metadata.manifest())
                .map_err(|e| e.in_phase(MintPhase::Create))?,
        );

        let created = self
            .create(wallet, &files, metadata)
            .await
            .map_err(|e| e.in_phase(MintPhase::Create))?;
        let phase_one_signature = created.confirmed.signature;

        let mut result = MintResult {
            metadata_account: created.metadata_account,
            resolved_content_link: String::new(),
            mint: created.mint,
            recipient_token_account: created.recipient_token_account,
            phase_one_signature,
            finalization: Finalization::Skipped {
                reason: String::new(),
            },
        };

        let tags = mint_tags(&files, &created.mint.to_string());
        let content_id = match self
            .uploader
            .upload(&files, &tags, &phase_one_signature.to_string())
            .await
        {
            Ok(response) => response.manifest_transaction_id().map(str::to_string),
            Err(e) => {
                let e = e.in_phase(MintPhase::Upload);
                warn!(mint = %created.mint, error = %e, "Upload failed, skipping finalization");
                result.finalization = Finalization::Skipped {
                    reason: e.to_string(),
                };
                return Ok(result);
            }
        };

        let Some(content_id) = content_id else {
            warn!(mint = %created.mint, "Upload returned no manifest, skipping finalization");
            result.finalization = Finalization::Skipped {
                reason: "Upload response has no manifest entry".to_string(),
            };
            return Ok(result);
        };

        let link = format!("{}{}", self.config.arweave_gateway, content_id);
        let confirmed = self
            .finalize(wallet, metadata, &created, link.clone())
            .await
            .map_err(|e| e.in_phase(MintPhase::Finalize))?;

        info!(
            mint = %created.mint,
            signature = %confirmed.signature,
            slot = confirmed.slot,
            link = %link,
            "Mint finalized"
        );
        result.resolved_content_link = link;
        result.finalization = Finalization::Completed {
            signature: confirmed.signature,
            slot: confirmed.slot,
        };
        Ok(result)
    }

    async fn create(
        &self,
        wallet: &dyn WalletSigner,
        files: &[UploadFile],
        metadata: &NftMetadata,
    ) -> Result<CreatedMint> {
        let creators = metadata.creators()?;
        validate_creators(&creators)?;
        if self.config.enforce_creator_shares {
            validate_creator_shares(&creators)?;
        }

        let options = ConfirmOptions::from_config(&self.config)?;
        let payer = wallet.pubkey();
        let mint_rent = self
            .ledger
            .get_minimum_balance_for_rent_exemption(Mint::LEN)
            .await?;
        let blockhash = self
            .ledger
            .get_recent_blockhash(self.config.blockhash_commitment()?)
            .await?;

        let mut instructions = Vec::new();
        let mut signers: Vec<Keypair> = Vec::new();
        pay_for_files(
            &mut instructions,
            &payer,
            files,
            &self.config.storage_holder()?,
            self.config.storage_fee_lamports,
        );
        let mint = create_mint(
            &mut instructions,
            &mut signers,
            &payer,
            mint_rent,
            0,
            &payer,
            Some(&payer),
        )?;
        let recipient_token_account = find_associated_token_account(&*self.ledger, &payer, &mint);
        create_associated_token_account(
            &mut instructions,
            &recipient_token_account,
            &payer,
            &payer,
            &mint,
        );
        let metadata_account = create_metadata(
            &mut instructions,
            &*self.ledger,
            metadata.data(" ".repeat(PLACEHOLDER_URI_LEN), creators.clone()),
            &payer,
            &mint,
            &payer,
            &payer,
        )?;

        let signer_refs: Vec<&Keypair> = signers.iter().collect();
        let transaction = assemble(instructions, &signer_refs, wallet, blockhash, false).await?;
        let confirmed = self
            .engine
            .send_signed_transaction(&transaction, &options)
            .await?
            .into_result()?;

        info!(
            mint = %mint,
            signature = %confirmed.signature,
            slot = confirmed.slot,
            "Mint created"
        );
        Ok(CreatedMint {
            mint,
            recipient_token_account,
            metadata_account,
            creators,
            confirmed,
        })
    }

    async fn finalize(
        &self,
        wallet: &dyn WalletSigner,
        metadata: &NftMetadata,
        created: &CreatedMint,
        link: String,
    ) -> Result<ConfirmedTransaction> {
        let options = ConfirmOptions::from_config(&self.config)?;
        let payer = wallet.pubkey();
        let mut instructions = Vec::new();

        update_metadata(
            &mut instructions,
            &*self.ledger,
            Some(metadata.data(link, created.creators.clone())),
            None,
            None,
            &created.mint,
            &payer,
            Some(created.metadata_account),
        )?;
        mint_to(
            &mut instructions,
            &created.mint,
            &created.recipient_token_account,
            &payer,
            1,
        )?;
        create_master_edition(
            &mut instructions,
            &*self.ledger,
            Some(1),
            &created.mint,
            &payer,
            &payer,
            &payer,
        )?;

        let blockhash = self
            .ledger
            .get_recent_blockhash(self.config.blockhash_commitment()?)
            .await?;
        let transaction = assemble(instructions, &[], wallet, blockhash, false).await?;
        self.engine
            .send_signed_transaction(&transaction, &options)
            .await?
            .into_result()
    }
}
