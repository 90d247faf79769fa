//! Command-line minter
//!
//! Mints one NFT from a metadata JSON file and the asset files it refers to.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use txmint::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file; defaults apply when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keypair file (JSON byte array) of the paying wallet
    #[arg(short, long)]
    keypair: PathBuf,

    /// Asset description in metadata JSON form
    #[arg(short, long)]
    metadata: PathBuf,

    /// Files to pin with the mint
    files: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

fn content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "mp4" => Some("video/mp4"),
        "json" => Some("application/json"),
        _ => None,
    }
}

fn load_file(path: &Path) -> txmint::Result<UploadFile> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TxMintError::ConfigError(format!("Bad file name: {}", path.display())))?;
    let file = UploadFile::new(name, bytes);
    Ok(match content_type(path) {
        Some(content_type) => file.with_content_type(content_type),
        None => file,
    })
}

async fn run(args: Args) -> txmint::Result<MintResult> {
    let config = match &args.config {
        Some(path) => MinterConfig::from_file(path)?,
        None => MinterConfig::default(),
    };
    let wallet = KeypairWallet::from_file(&args.keypair)?;
    let metadata: NftMetadata = serde_json::from_slice(&std::fs::read(&args.metadata)?)?;
    let files = args
        .files
        .iter()
        .map(|path| load_file(path))
        .collect::<txmint::Result<Vec<_>>>()?;

    let ledger = Arc::new(RpcLedgerClient::new(
        config.rpc_url.clone(),
        config.ws_url.clone(),
        config.rpc_commitment()?,
    ));
    let uploader = Arc::new(HttpUploadService::new(
        config.upload_url.clone(),
        config.upload_timeout(),
    )?);

    info!(
        wallet = %wallet.pubkey(),
        rpc = %config.rpc_url,
        files = files.len(),
        "Minting"
    );
    let minter = Minter::new(ledger, uploader, config)?;
    minter.mint(&wallet, files, &metadata).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    txmint::logging::init_logging(args.verbose, args.json)?;

    match run(args).await {
        Ok(result) => {
            println!("mint:             {}", result.mint);
            println!("metadata account: {}", result.metadata_account);
            println!("token account:    {}", result.recipient_token_account);
            println!("create signature: {}", result.phase_one_signature);
            match &result.finalization {
                Finalization::Completed { signature, slot } => {
                    println!("content link:     {}", result.resolved_content_link);
                    println!("final signature:  {} (slot {})", signature, slot);
                }
                Finalization::Skipped { reason } => {
                    println!("finalization skipped: {}", reason);
                }
            }
            Ok(())
        }
        Err(e) => {
            error!(phase = ?e.phase(), ambiguous = e.is_ambiguous(), error = %e, "Mint failed");
            Err(e.into())
        }
    }
}
