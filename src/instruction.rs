//! Manual instruction construction
//!
//! Instructions are plain values: a target program, an ordered account list
//! and an opaque payload. Account order is fixed by the target program.

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

/// Account metadata for an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool, is_writable: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self::new(pubkey, is_signer, false)
    }

    pub fn new_writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self::new(pubkey, is_signer, true)
    }
}

/// A raw Solana instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction {
    /// Program ID that this instruction invokes
    pub program_id: Pubkey,
    /// Account keys required by this instruction
    pub accounts: Vec<AccountMeta>,
    /// Instruction data (opaque bytes)
    pub data: Vec<u8>,
}

impl RawInstruction {
    pub fn new(program_id: Pubkey, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }

    /// Convert an instruction produced by the SDK or SPL helpers
    pub fn from_sdk_instruction(instruction: &Instruction) -> Self {
        let accounts = instruction
            .accounts
            .iter()
            .map(|acc| AccountMeta::new(acc.pubkey, acc.is_signer, acc.is_writable))
            .collect();

        Self {
            program_id: instruction.program_id,
            accounts,
            data: instruction.data.clone(),
        }
    }

    /// First byte of the payload, which selects the program's handler
    pub fn discriminator(&self) -> Option<u8> {
        self.data.first().copied()
    }
}

/// High-level instruction encoder with builder pattern
pub struct InstructionEncoder {
    program_id: Pubkey,
    accounts: Vec<AccountMeta>,
    data: Vec<u8>,
}

impl InstructionEncoder {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            accounts: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Add an account to the instruction
    pub fn account(mut self, meta: AccountMeta) -> Self {
        self.accounts.push(meta);
        self
    }

    /// Add a signer account
    pub fn signer(mut self, pubkey: Pubkey, is_writable: bool) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, true, is_writable));
        self
    }

    /// Add a writable account
    pub fn writable(mut self, pubkey: Pubkey, is_signer: bool) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, is_signer, true));
        self
    }

    /// Add a readonly account
    pub fn readonly(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new_readonly(pubkey, false));
        self
    }

    /// Set instruction data directly
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Build the final instruction
    pub fn build(self) -> RawInstruction {
        RawInstruction::new(self.program_id, self.accounts, self.data)
    }
}
