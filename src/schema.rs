//! Token-metadata record schema
//!
//! Field order and converters for every record the minter writes or reads:
//!
//! | record | fields |
//! |---|---|
//! | `Creator` | address `pubkey_as_string`, verified `u8`, share `u8` |
//! | `Data` | name, symbol, uri `string`, seller_fee_basis_points `u16`, creators `option<vec<Creator>>` |
//! | `CreateMetadataArgs` | instruction `u8` = 0, data, is_mutable `u8` |
//! | `UpdateMetadataArgs` | instruction `u8` = 1, data `option`, update_authority `option<pubkey_as_string>`, primary_sale_happened `option<u8>` |
//! | `MintPrintingTokensArgs` | instruction `u8` = 9, supply `u64` |
//! | `CreateMasterEditionArgs` | instruction `u8` = 10, max_supply `option<u64>` |
//! | `Metadata` | key, update_authority, mint `pubkey_as_string`, data, primary_sale_happened, is_mutable |
//! | `Edition` | key, parent `pubkey_as_string`, edition `u64` |
//! | `MasterEditionV1` | key, supply, max_supply `option<u64>`, printing_mint, one_time_printing_authorization_mint |
//! | `MasterEditionV2` | key, supply, max_supply `option<u64>` |
//! | `EditionMarker` | key, ledger `[u8; 31]` |

use crate::constants::{
    EDITION_MARKER_BIT_SIZE, EDITION_MARKER_LEDGER_LEN, MAX_CREATOR_LIMIT, MAX_NAME_LENGTH,
    MAX_SELLER_FEE_BASIS_POINTS, MAX_SYMBOL_LENGTH, MAX_URI_LENGTH,
};
use crate::error::{Result, TxMintError};
use crate::serialization::{
    decode_bool, decode_fixed_array, decode_option, decode_pubkey_as_string, decode_string,
    decode_u16, decode_u64, decode_u8, decode_vec, encode_bool, encode_fixed_array,
    encode_option, encode_pubkey_as_string, encode_string, encode_u16, encode_u64, encode_u8,
    encode_vec, parse_pubkey_string, ByteDeserialize, ByteSerialize,
};
use std::io::Cursor;

pub const CREATE_METADATA_INSTRUCTION: u8 = 0;
pub const UPDATE_METADATA_INSTRUCTION: u8 = 1;
pub const MINT_PRINTING_TOKENS_INSTRUCTION: u8 = 9;
pub const CREATE_MASTER_EDITION_INSTRUCTION: u8 = 10;

/// Account discriminator stored in the first byte of every metadata-program account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MetadataKey {
    Uninitialized = 0,
    EditionV1 = 1,
    MasterEditionV1 = 2,
    MetadataV1 = 4,
    MasterEditionV2 = 6,
    EditionMarker = 7,
}

fn expect_key(cursor: &mut Cursor<&[u8]>, expected: MetadataKey) -> Result<()> {
    let key = decode_u8(cursor)?;
    if key != expected as u8 {
        return Err(TxMintError::DeserializationError(format!(
            "Expected account key {:?} ({}), found {}",
            expected, expected as u8, key
        )));
    }
    Ok(())
}

fn expect_instruction(cursor: &mut Cursor<&[u8]>, expected: u8) -> Result<()> {
    let instruction = decode_u8(cursor)?;
    if instruction != expected {
        return Err(TxMintError::InvalidInstruction(format!(
            "Expected instruction {}, found {}",
            expected, instruction
        )));
    }
    Ok(())
}

/// A royalty recipient listed in the asset's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    /// Base58 address
    pub address: String,
    pub verified: bool,
    /// Percentage of royalties
    pub share: u8,
}

impl Creator {
    /// Build a creator from caller input, rejecting bad addresses and shares over 255.
    pub fn try_new(address: &str, verified: bool, share: u32) -> Result<Self> {
        parse_pubkey_string(address)?;
        let share = u8::try_from(share).map_err(|_| {
            TxMintError::InvalidCreators(format!(
                "Share {} for {} does not fit in a byte",
                share, address
            ))
        })?;
        Ok(Self {
            address: address.to_string(),
            verified,
            share,
        })
    }
}

impl ByteSerialize for Creator {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_pubkey_as_string(&self.address, writer)?;
        encode_bool(self.verified, writer)?;
        encode_u8(self.share, writer)?;
        Ok(())
    }
}

impl ByteDeserialize for Creator {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(Self {
            address: decode_pubkey_as_string(cursor)?,
            verified: decode_bool(cursor)?,
            share: decode_u8(cursor)?,
        })
    }
}

/// Reject an empty or oversized creator list and unparsable addresses.
pub fn validate_creators(creators: &[Creator]) -> Result<()> {
    if creators.is_empty() {
        return Err(TxMintError::InvalidCreators(
            "Creator list is empty".to_string(),
        ));
    }
    if creators.len() > MAX_CREATOR_LIMIT {
        return Err(TxMintError::InvalidCreators(format!(
            "{} creators given, at most {} allowed",
            creators.len(),
            MAX_CREATOR_LIMIT
        )));
    }
    for creator in creators {
        parse_pubkey_string(&creator.address)?;
    }
    Ok(())
}

/// Opt-in check that shares add up to exactly 100.
pub fn validate_creator_shares(creators: &[Creator]) -> Result<()> {
    let total: u32 = creators.iter().map(|c| c.share as u32).sum();
    if total != 100 {
        return Err(TxMintError::InvalidCreators(format!(
            "Creator shares sum to {}, expected 100",
            total
        )));
    }
    Ok(())
}

/// Descriptive data of an asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
}

impl Data {
    /// Check the protocol's length and fee limits and the creator list.
    pub fn validate(&self) -> Result<()> {
        if self.name.len() > MAX_NAME_LENGTH {
            return Err(TxMintError::InvalidMetadata(format!(
                "Name is {} bytes, limit is {}",
                self.name.len(),
                MAX_NAME_LENGTH
            )));
        }
        if self.symbol.len() > MAX_SYMBOL_LENGTH {
            return Err(TxMintError::InvalidMetadata(format!(
                "Symbol is {} bytes, limit is {}",
                self.symbol.len(),
                MAX_SYMBOL_LENGTH
            )));
        }
        if self.uri.len() > MAX_URI_LENGTH {
            return Err(TxMintError::InvalidMetadata(format!(
                "URI is {} bytes, limit is {}",
                self.uri.len(),
                MAX_URI_LENGTH
            )));
        }
        if self.seller_fee_basis_points > MAX_SELLER_FEE_BASIS_POINTS {
            return Err(TxMintError::InvalidMetadata(format!(
                "Seller fee {} exceeds {} basis points",
                self.seller_fee_basis_points, MAX_SELLER_FEE_BASIS_POINTS
            )));
        }
        if let Some(creators) = &self.creators {
            validate_creators(creators)?;
        }
        Ok(())
    }
}

impl ByteSerialize for Data {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_string(&self.name, writer)?;
        encode_string(&self.symbol, writer)?;
        encode_string(&self.uri, writer)?;
        encode_u16(self.seller_fee_basis_points, writer)?;
        encode_option(self.creators.as_deref(), writer, |creators, w| {
            encode_vec(creators, w, |creator, w| creator.serialize_bytes(w))
        })?;
        Ok(())
    }
}

impl ByteDeserialize for Data {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(Self {
            name: decode_string(cursor)?,
            symbol: decode_string(cursor)?,
            uri: decode_string(cursor)?,
            seller_fee_basis_points: decode_u16(cursor)?,
            creators: decode_option(cursor, |c| decode_vec(c, Creator::deserialize_bytes))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMetadataArgs {
    pub data: Data,
    pub is_mutable: bool,
}

impl ByteSerialize for CreateMetadataArgs {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(CREATE_METADATA_INSTRUCTION, writer)?;
        self.data.serialize_bytes(writer)?;
        encode_bool(self.is_mutable, writer)?;
        Ok(())
    }
}

impl ByteDeserialize for CreateMetadataArgs {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_instruction(cursor, CREATE_METADATA_INSTRUCTION)?;
        Ok(Self {
            data: Data::deserialize_bytes(cursor)?,
            is_mutable: decode_bool(cursor)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateMetadataArgs {
    pub data: Option<Data>,
    /// New update authority, base58
    pub update_authority: Option<String>,
    pub primary_sale_happened: Option<bool>,
}

impl ByteSerialize for UpdateMetadataArgs {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(UPDATE_METADATA_INSTRUCTION, writer)?;
        encode_option(self.data.as_ref(), writer, |data, w| data.serialize_bytes(w))?;
        encode_option(self.update_authority.as_deref(), writer, encode_pubkey_as_string)?;
        encode_option(self.primary_sale_happened.as_ref(), writer, |v, w| {
            encode_bool(*v, w)
        })?;
        Ok(())
    }
}

impl ByteDeserialize for UpdateMetadataArgs {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_instruction(cursor, UPDATE_METADATA_INSTRUCTION)?;
        Ok(Self {
            data: decode_option(cursor, Data::deserialize_bytes)?,
            update_authority: decode_option(cursor, decode_pubkey_as_string)?,
            primary_sale_happened: decode_option(cursor, decode_bool)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMasterEditionArgs {
    pub max_supply: Option<u64>,
}

impl ByteSerialize for CreateMasterEditionArgs {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(CREATE_MASTER_EDITION_INSTRUCTION, writer)?;
        encode_option(self.max_supply.as_ref(), writer, |v, w| encode_u64(*v, w))?;
        Ok(())
    }
}

impl ByteDeserialize for CreateMasterEditionArgs {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_instruction(cursor, CREATE_MASTER_EDITION_INSTRUCTION)?;
        Ok(Self {
            max_supply: decode_option(cursor, decode_u64)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintPrintingTokensArgs {
    pub supply: u64,
}

impl ByteSerialize for MintPrintingTokensArgs {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(MINT_PRINTING_TOKENS_INSTRUCTION, writer)?;
        encode_u64(self.supply, writer)
    }
}

impl ByteDeserialize for MintPrintingTokensArgs {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_instruction(cursor, MINT_PRINTING_TOKENS_INSTRUCTION)?;
        Ok(Self {
            supply: decode_u64(cursor)?,
        })
    }
}

/// On-chain metadata account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub update_authority: String,
    pub mint: String,
    pub data: Data,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
}

impl ByteSerialize for Metadata {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(MetadataKey::MetadataV1 as u8, writer)?;
        encode_pubkey_as_string(&self.update_authority, writer)?;
        encode_pubkey_as_string(&self.mint, writer)?;
        self.data.serialize_bytes(writer)?;
        encode_bool(self.primary_sale_happened, writer)?;
        encode_bool(self.is_mutable, writer)?;
        Ok(())
    }
}

impl ByteDeserialize for Metadata {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_key(cursor, MetadataKey::MetadataV1)?;
        Ok(Self {
            update_authority: decode_pubkey_as_string(cursor)?,
            mint: decode_pubkey_as_string(cursor)?,
            data: Data::deserialize_bytes(cursor)?,
            primary_sale_happened: decode_bool(cursor)?,
            is_mutable: decode_bool(cursor)?,
        })
    }
}

/// A limited-edition print of a master edition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    pub parent: String,
    pub edition: u64,
}

impl ByteSerialize for Edition {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(MetadataKey::EditionV1 as u8, writer)?;
        encode_pubkey_as_string(&self.parent, writer)?;
        encode_u64(self.edition, writer)
    }
}

impl ByteDeserialize for Edition {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_key(cursor, MetadataKey::EditionV1)?;
        Ok(Self {
            parent: decode_pubkey_as_string(cursor)?,
            edition: decode_u64(cursor)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterEditionV1 {
    pub supply: u64,
    pub max_supply: Option<u64>,
    pub printing_mint: String,
    pub one_time_printing_authorization_mint: String,
}

impl ByteSerialize for MasterEditionV1 {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(MetadataKey::MasterEditionV1 as u8, writer)?;
        encode_u64(self.supply, writer)?;
        encode_option(self.max_supply.as_ref(), writer, |v, w| encode_u64(*v, w))?;
        encode_pubkey_as_string(&self.printing_mint, writer)?;
        encode_pubkey_as_string(&self.one_time_printing_authorization_mint, writer)?;
        Ok(())
    }
}

impl ByteDeserialize for MasterEditionV1 {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_key(cursor, MetadataKey::MasterEditionV1)?;
        Ok(Self {
            supply: decode_u64(cursor)?,
            max_supply: decode_option(cursor, decode_u64)?,
            printing_mint: decode_pubkey_as_string(cursor)?,
            one_time_printing_authorization_mint: decode_pubkey_as_string(cursor)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterEditionV2 {
    pub supply: u64,
    pub max_supply: Option<u64>,
}

impl ByteSerialize for MasterEditionV2 {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(MetadataKey::MasterEditionV2 as u8, writer)?;
        encode_u64(self.supply, writer)?;
        encode_option(self.max_supply.as_ref(), writer, |v, w| encode_u64(*v, w))?;
        Ok(())
    }
}

impl ByteDeserialize for MasterEditionV2 {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_key(cursor, MetadataKey::MasterEditionV2)?;
        Ok(Self {
            supply: decode_u64(cursor)?,
            max_supply: decode_option(cursor, decode_u64)?,
        })
    }
}

/// Bitset of which editions in a 248-edition window have been printed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditionMarker {
    pub ledger: [u8; EDITION_MARKER_LEDGER_LEN],
}

impl EditionMarker {
    /// Marker account number covering `edition`
    pub fn marker_index(edition: u64) -> u64 {
        edition / EDITION_MARKER_BIT_SIZE
    }

    /// Byte index and MSB-first bit position of `edition` within the ledger.
    fn bit_location(edition: u64) -> Result<(usize, u32)> {
        let index = edition / 8;
        if index >= EDITION_MARKER_LEDGER_LEN as u64 {
            return Err(TxMintError::EncodingError(format!(
                "Bad index for edition {}: byte {} is outside the {}-byte ledger",
                edition, index, EDITION_MARKER_LEDGER_LEN
            )));
        }
        let position_from_right = 7 - (edition % 8) as u32;
        Ok((index as usize, position_from_right))
    }

    pub fn edition_taken(&self, edition: u64) -> Result<bool> {
        let (index, position) = Self::bit_location(edition)?;
        Ok(self.ledger[index] & (1u8 << position) != 0)
    }

    pub fn mark_edition(&mut self, edition: u64) -> Result<()> {
        let (index, position) = Self::bit_location(edition)?;
        self.ledger[index] |= 1u8 << position;
        Ok(())
    }
}

impl ByteSerialize for EditionMarker {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(MetadataKey::EditionMarker as u8, writer)?;
        encode_fixed_array(&self.ledger, writer)
    }
}

impl ByteDeserialize for EditionMarker {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_key(cursor, MetadataKey::EditionMarker)?;
        Ok(Self {
            ledger: decode_fixed_array(cursor)?,
        })
    }
}
