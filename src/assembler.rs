//! Turns an instruction list into a fully signed transaction

use crate::error::{Result, TxMintError};
use crate::instruction::RawInstruction;
use crate::transaction::{CompiledTransaction, TransactionBuilder, MAX_TRANSACTION_SIZE};
use crate::wallet::WalletSigner;
use solana_sdk::{
    hash::Hash,
    signature::{Keypair, Signer},
};
use tracing::debug;

/// Compile, sign with the ephemeral `signers`, then hand to the wallet.
///
/// The wallet is the fee payer unless `includes_fee_payer` is set, in which
/// case the first ephemeral signer pays and the wallet is never asked.
pub async fn assemble(
    instructions: Vec<RawInstruction>,
    signers: &[&Keypair],
    wallet: &dyn WalletSigner,
    recent_blockhash: Hash,
    includes_fee_payer: bool,
) -> Result<CompiledTransaction> {
    let payer = if includes_fee_payer {
        signers
            .first()
            .map(|kp| kp.pubkey())
            .ok_or_else(|| TxMintError::SigningError("No fee payer among signers".to_string()))?
    } else {
        wallet.pubkey()
    };

    let mut transaction = TransactionBuilder::new()
        .payer(payer)
        .recent_blockhash(recent_blockhash)
        .add_instructions(instructions)
        .build_unsigned()?;

    transaction.partial_sign(signers)?;

    if !includes_fee_payer {
        let message = transaction.message.clone();
        transaction = wallet
            .sign_transaction(transaction)
            .await
            .map_err(|e| match e {
                TxMintError::SigningError(_) => e,
                other => TxMintError::SigningError(other.to_string()),
            })?;
        if transaction.message != message {
            return Err(TxMintError::SigningError(
                "Wallet returned a different message".to_string(),
            ));
        }
    }

    if !transaction.is_fully_signed() {
        return Err(TxMintError::SigningError(
            "Transaction is missing required signatures".to_string(),
        ));
    }

    let size = transaction.size();
    if size > MAX_TRANSACTION_SIZE {
        return Err(TxMintError::InvalidTransaction(format!(
            "Transaction is {} bytes, limit is {}",
            size, MAX_TRANSACTION_SIZE
        )));
    }

    debug!(
        payer = %payer,
        signatures = transaction.signatures.len(),
        size,
        "Assembled transaction"
    );
    Ok(transaction)
}
