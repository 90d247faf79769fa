//! Legacy transaction messages with byte-level control
//!
//! A message lists every account once, fee payer first, ordered writable
//! signers, readonly signers, writable non-signers, readonly non-signers.
//! Signatures are stored positionally: slot `i` belongs to `account_keys[i]`.

use crate::error::{Result, TxMintError};
use crate::instruction::RawInstruction;
use crate::serialization::{
    compact_u16_size, decode_compact_u16, decode_fixed_array, decode_pubkey, decode_u8,
    encode_compact_u16, encode_fixed_array, encode_pubkey, encode_u8, take_bytes, ByteSerialize,
};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use std::collections::HashMap;
use std::io::Cursor;

/// Largest serialized transaction the network accepts
pub const MAX_TRANSACTION_SIZE: usize = 1232;

/// Message header containing account metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

impl MessageHeader {
    pub fn new(
        num_required_signatures: u8,
        num_readonly_signed_accounts: u8,
        num_readonly_unsigned_accounts: u8,
    ) -> Self {
        Self {
            num_required_signatures,
            num_readonly_signed_accounts,
            num_readonly_unsigned_accounts,
        }
    }
}

impl ByteSerialize for MessageHeader {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(self.num_required_signatures, writer)?;
        encode_u8(self.num_readonly_signed_accounts, writer)?;
        encode_u8(self.num_readonly_unsigned_accounts, writer)?;
        Ok(())
    }
}

/// Compiled instruction with resolved account indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

impl CompiledInstruction {
    fn byte_size(&self) -> usize {
        1 + compact_u16_size(self.account_indices.len())
            + self.account_indices.len()
            + compact_u16_size(self.data.len())
            + self.data.len()
    }
}

impl ByteSerialize for CompiledInstruction {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(self.program_id_index, writer)?;
        encode_compact_u16(len_u16(self.account_indices.len())?, writer)?;
        writer.extend_from_slice(&self.account_indices);
        encode_compact_u16(len_u16(self.data.len())?, writer)?;
        writer.extend_from_slice(&self.data);
        Ok(())
    }
}

/// Compiled message: the exact bytes every signer signs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMessage {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

impl CompiledMessage {
    /// Keys that must sign, in signature-slot order
    pub fn signer_keys(&self) -> &[Pubkey] {
        let count = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..count]
    }

    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.signer_keys().first()
    }

    fn byte_size(&self) -> usize {
        3 + compact_u16_size(self.account_keys.len())
            + self.account_keys.len() * 32
            + 32
            + compact_u16_size(self.instructions.len())
            + self
                .instructions
                .iter()
                .map(CompiledInstruction::byte_size)
                .sum::<usize>()
    }
}

impl ByteSerialize for CompiledMessage {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        self.header.serialize_bytes(writer)?;

        encode_compact_u16(len_u16(self.account_keys.len())?, writer)?;
        for key in &self.account_keys {
            encode_pubkey(key, writer)?;
        }

        encode_fixed_array(&self.recent_blockhash.to_bytes(), writer)?;

        encode_compact_u16(len_u16(self.instructions.len())?, writer)?;
        for instruction in &self.instructions {
            instruction.serialize_bytes(writer)?;
        }
        Ok(())
    }
}

fn len_u16(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| {
        TxMintError::SerializationError(format!("Length {} exceeds compact-u16 range", len))
    })
}

/// A compiled transaction and its signature slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTransaction {
    pub message: CompiledMessage,
    pub signatures: Vec<Signature>,
}

impl CompiledTransaction {
    /// Wrap a message with one empty signature slot per required signer
    pub fn new_unsigned(message: CompiledMessage) -> Self {
        let signatures = vec![Signature::default(); message.header.num_required_signatures as usize];
        Self {
            message,
            signatures,
        }
    }

    /// Serialize the entire transaction to bytes
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.size());

        encode_compact_u16(len_u16(self.signatures.len())?, &mut bytes)?;
        for signature in &self.signatures {
            bytes.extend_from_slice(signature.as_ref());
        }

        self.message.serialize_bytes(&mut bytes)?;
        Ok(bytes)
    }

    /// Get the serialized message (for signing)
    pub fn message_bytes(&self) -> Result<Vec<u8>> {
        self.message.to_bytes()
    }

    /// Calculate transaction size in bytes
    pub fn size(&self) -> usize {
        compact_u16_size(self.signatures.len()) + self.signatures.len() * 64 + self.message.byte_size()
    }

    /// First signature slot; identifies the transaction on the ledger
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    /// Sign with each keypair into the slot matching its account index.
    ///
    /// Slots owned by other signers are left untouched, so signers can be
    /// applied in any order and across several calls.
    pub fn partial_sign(&mut self, signers: &[&Keypair]) -> Result<()> {
        if signers.is_empty() {
            return Ok(());
        }
        let message_bytes = self.message_bytes()?;
        let required = self.message.signer_keys().to_vec();
        if self.signatures.len() != required.len() {
            self.signatures.resize(required.len(), Signature::default());
        }

        for signer in signers {
            let pubkey = signer.pubkey();
            let position = required.iter().position(|key| *key == pubkey).ok_or_else(|| {
                TxMintError::SigningError(format!("{} is not a required signer", pubkey))
            })?;
            self.signatures[position] = signer.sign_message(&message_bytes);
        }
        Ok(())
    }

    /// Every required slot holds a signature
    pub fn is_fully_signed(&self) -> bool {
        self.signatures.len() == self.message.header.num_required_signatures as usize
            && self.signatures.iter().all(|sig| *sig != Signature::default())
    }

    /// Check every signature against its signer and the current message
    pub fn verify(&self) -> Result<()> {
        let message_bytes = self.message_bytes()?;
        let signers = self.message.signer_keys();
        if self.signatures.len() != signers.len() {
            return Err(TxMintError::SigningError(format!(
                "Expected {} signatures, found {}",
                signers.len(),
                self.signatures.len()
            )));
        }

        for (signature, key) in self.signatures.iter().zip(signers) {
            if !signature.verify(key.as_ref(), &message_bytes) {
                return Err(TxMintError::SigningError(format!(
                    "Invalid signature for {}",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Decode a transaction from bytes
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let num_signatures = decode_compact_u16(&mut cursor)? as usize;
        let mut signatures = Vec::with_capacity(num_signatures.min(bytes.len() / 64));
        for _ in 0..num_signatures {
            signatures.push(Signature::from(decode_fixed_array::<64>(&mut cursor)?));
        }

        let header = MessageHeader::new(
            decode_u8(&mut cursor)?,
            decode_u8(&mut cursor)?,
            decode_u8(&mut cursor)?,
        );

        let num_account_keys = decode_compact_u16(&mut cursor)? as usize;
        let mut account_keys = Vec::with_capacity(num_account_keys.min(bytes.len() / 32));
        for _ in 0..num_account_keys {
            account_keys.push(decode_pubkey(&mut cursor)?);
        }

        let recent_blockhash = Hash::new_from_array(decode_fixed_array::<32>(&mut cursor)?);

        let num_instructions = decode_compact_u16(&mut cursor)? as usize;
        let mut instructions = Vec::new();
        for _ in 0..num_instructions {
            let program_id_index = decode_u8(&mut cursor)?;
            let num_accounts = decode_compact_u16(&mut cursor)? as usize;
            let account_indices = take_bytes(&mut cursor, num_accounts)?.to_vec();
            let data_len = decode_compact_u16(&mut cursor)? as usize;
            let data = take_bytes(&mut cursor, data_len)?.to_vec();

            instructions.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data,
            });
        }

        if cursor.position() as usize != bytes.len() {
            return Err(TxMintError::DeserializationError(format!(
                "{} trailing bytes after transaction",
                bytes.len() - cursor.position() as usize
            )));
        }

        Ok(CompiledTransaction {
            message: CompiledMessage {
                header,
                account_keys,
                recent_blockhash,
                instructions,
            },
            signatures,
        })
    }
}

/// Transaction builder with fluent API
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    instructions: Vec<RawInstruction>,
    payer: Option<Pubkey>,
    recent_blockhash: Option<Hash>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fee payer
    pub fn payer(mut self, payer: Pubkey) -> Self {
        self.payer = Some(payer);
        self
    }

    /// Set the recent blockhash
    pub fn recent_blockhash(mut self, blockhash: Hash) -> Self {
        self.recent_blockhash = Some(blockhash);
        self
    }

    /// Add an instruction
    pub fn add_instruction(mut self, instruction: RawInstruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Add multiple instructions
    pub fn add_instructions(mut self, instructions: Vec<RawInstruction>) -> Self {
        self.instructions.extend(instructions);
        self
    }

    /// Compile the transaction into a message
    pub fn compile(self) -> Result<CompiledMessage> {
        let payer = self
            .payer
            .ok_or_else(|| TxMintError::InvalidTransaction("Payer not set".to_string()))?;

        let recent_blockhash = self.recent_blockhash.ok_or_else(|| {
            TxMintError::InvalidTransaction("Recent blockhash not set".to_string())
        })?;

        if self.instructions.is_empty() {
            return Err(TxMintError::InvalidTransaction(
                "No instructions provided".to_string(),
            ));
        }

        // (key, is_signer, is_writable) in first-seen order
        let mut keys: Vec<(Pubkey, bool, bool)> = vec![(payer, true, true)];
        let mut positions: HashMap<Pubkey, usize> = HashMap::from([(payer, 0)]);
        let mut merge = |key: Pubkey, is_signer: bool, is_writable: bool| {
            match positions.get(&key) {
                Some(&i) => {
                    keys[i].1 |= is_signer;
                    keys[i].2 |= is_writable;
                }
                None => {
                    positions.insert(key, keys.len());
                    keys.push((key, is_signer, is_writable));
                }
            }
        };

        for instruction in &self.instructions {
            for account in &instruction.accounts {
                merge(account.pubkey, account.is_signer, account.is_writable);
            }
            merge(instruction.program_id, false, false);
        }

        // Stable sort keeps the payer ahead of other writable signers.
        keys.sort_by_key(|(key, is_signer, is_writable)| match (*is_signer, *is_writable) {
            _ if *key == payer => 0,
            (true, true) => 1,
            (true, false) => 2,
            (false, true) => 3,
            (false, false) => 4,
        });

        if keys.len() > u8::MAX as usize + 1 {
            return Err(TxMintError::InvalidTransaction(format!(
                "Too many accounts: {}",
                keys.len()
            )));
        }

        let index_of: HashMap<Pubkey, u8> = keys
            .iter()
            .enumerate()
            .map(|(i, (key, _, _))| (*key, i as u8))
            .collect();

        let num_signers = keys.iter().filter(|(_, s, _)| *s).count() as u8;
        let num_readonly_signers = keys.iter().filter(|(_, s, w)| *s && !*w).count() as u8;
        let num_readonly_unsigned = keys.iter().filter(|(_, s, w)| !*s && !*w).count() as u8;
        let header = MessageHeader::new(num_signers, num_readonly_signers, num_readonly_unsigned);

        let lookup = |key: &Pubkey| {
            index_of.get(key).copied().ok_or_else(|| {
                TxMintError::InvalidInstruction(format!("Account {} not found in message", key))
            })
        };

        let instructions = self
            .instructions
            .iter()
            .map(|instruction| {
                Ok(CompiledInstruction {
                    program_id_index: lookup(&instruction.program_id)?,
                    account_indices: instruction
                        .accounts
                        .iter()
                        .map(|account| lookup(&account.pubkey))
                        .collect::<Result<Vec<_>>>()?,
                    data: instruction.data.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CompiledMessage {
            header,
            account_keys: keys.into_iter().map(|(key, _, _)| key).collect(),
            recent_blockhash,
            instructions,
        })
    }

    /// Compile and create an unsigned transaction
    pub fn build_unsigned(self) -> Result<CompiledTransaction> {
        Ok(CompiledTransaction::new_unsigned(self.compile()?))
    }
}
