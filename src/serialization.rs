//! Low-level byte serialization utilities
//!
//! Two wire formats live here. The Solana transaction format uses compact-u16
//! length prefixes, while token-metadata records use fixed-width little-endian
//! integers, u32-prefixed strings and lists, and one-byte option flags.
//!
//! Addresses have two named converters. `pubkey` carries a [`Pubkey`] and
//! `pubkey_as_string` carries base58 text in memory; both occupy 32 raw bytes
//! on the wire. Each record's schema picks one per field.

use crate::error::{Result, TxMintError};
use solana_sdk::pubkey::Pubkey;
use std::io::{Cursor, Write};

/// Trait for types that can be serialized at the byte level
pub trait ByteSerialize {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()>;

    /// Serialize into a fresh buffer
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.serialize_bytes(&mut bytes)?;
        Ok(bytes)
    }
}

/// Trait for types that can be deserialized from bytes
pub trait ByteDeserialize: Sized {
    fn deserialize_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Self>;

    /// Decode from the start of `bytes`. Trailing bytes (account padding) are ignored.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        Self::deserialize_bytes(&mut cursor)
    }
}

pub(crate) fn take_bytes<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8]> {
    let position = cursor.position() as usize;
    let data: &'a [u8] = *cursor.get_ref();

    if position + len > data.len() {
        return Err(TxMintError::BufferTooSmall {
            needed: position + len,
            available: data.len(),
        });
    }

    cursor.set_position((position + len) as u64);
    Ok(&data[position..position + len])
}

/// Compact-u16 encoding (variable-length encoding used by Solana)
pub fn encode_compact_u16(value: u16, writer: &mut Vec<u8>) -> Result<()> {
    if value <= 0x7f {
        writer.write_all(&[value as u8])?;
    } else if value <= 0x3fff {
        writer.write_all(&[((value & 0x7f) | 0x80) as u8, (value >> 7) as u8])?;
    } else {
        writer.write_all(&[
            ((value & 0x7f) | 0x80) as u8,
            (((value >> 7) & 0x7f) | 0x80) as u8,
            (value >> 14) as u8,
        ])?;
    }
    Ok(())
}

/// Decode compact-u16
pub fn decode_compact_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    let mut value: u16 = 0;
    let mut shift = 0;

    for _ in 0..3 {
        let byte = decode_u8(cursor).map_err(|_| {
            TxMintError::DeserializationError("Unexpected end of buffer".to_string())
        })?;

        value |= ((byte & 0x7f) as u16) << shift;

        if byte & 0x80 == 0 {
            return Ok(value);
        }

        shift += 7;
    }

    Err(TxMintError::DeserializationError(
        "Invalid compact-u16 encoding".to_string(),
    ))
}

/// Size of a compact-u16 prefix for `len`
pub fn compact_u16_size(len: usize) -> usize {
    if len <= 0x7f {
        1
    } else if len <= 0x3fff {
        2
    } else {
        3
    }
}

/// Encode a u8
pub fn encode_u8(value: u8, writer: &mut Vec<u8>) -> Result<()> {
    writer.write_all(&[value])?;
    Ok(())
}

/// Decode a u8
pub fn decode_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    Ok(take_bytes(cursor, 1)?[0])
}

/// Encode a bool as a single 0/1 byte
pub fn encode_bool(value: bool, writer: &mut Vec<u8>) -> Result<()> {
    encode_u8(value as u8, writer)
}

/// Decode a bool, rejecting anything other than 0 or 1
pub fn decode_bool(cursor: &mut Cursor<&[u8]>) -> Result<bool> {
    match decode_u8(cursor)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(TxMintError::DeserializationError(format!(
            "Invalid bool byte: {}",
            other
        ))),
    }
}

/// Encode a u16 in little-endian format
pub fn encode_u16(value: u16, writer: &mut Vec<u8>) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Decode a u16 in little-endian format
pub fn decode_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    let mut bytes = [0u8; 2];
    bytes.copy_from_slice(take_bytes(cursor, 2)?);
    Ok(u16::from_le_bytes(bytes))
}

/// Encode a u32 in little-endian format
pub fn encode_u32(value: u32, writer: &mut Vec<u8>) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Decode a u32 in little-endian format
pub fn decode_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(take_bytes(cursor, 4)?);
    Ok(u32::from_le_bytes(bytes))
}

/// Encode a u64 in little-endian format
pub fn encode_u64(value: u64, writer: &mut Vec<u8>) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Decode a u64 in little-endian format
pub fn decode_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(take_bytes(cursor, 8)?);
    Ok(u64::from_le_bytes(bytes))
}

/// Encode a fixed-length byte array with no prefix
pub fn encode_fixed_array<const N: usize>(value: &[u8; N], writer: &mut Vec<u8>) -> Result<()> {
    writer.write_all(value)?;
    Ok(())
}

/// Decode a fixed-length byte array
pub fn decode_fixed_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N]> {
    let mut value = [0u8; N];
    value.copy_from_slice(take_bytes(cursor, N)?);
    Ok(value)
}

/// Encode a UTF-8 string with a u32 byte-length prefix
pub fn encode_string(value: &str, writer: &mut Vec<u8>) -> Result<()> {
    let len = u32::try_from(value.len()).map_err(|_| {
        TxMintError::EncodingError(format!("String too long: {} bytes", value.len()))
    })?;
    encode_u32(len, writer)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

/// Decode a u32-prefixed UTF-8 string
pub fn decode_string(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let len = decode_u32(cursor)? as usize;
    let bytes = take_bytes(cursor, len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| TxMintError::DeserializationError(format!("Invalid UTF-8: {}", e)))
}

/// Encode an address as 32 raw bytes
pub fn encode_pubkey(pubkey: &Pubkey, writer: &mut Vec<u8>) -> Result<()> {
    writer.write_all(pubkey.as_ref())?;
    Ok(())
}

/// Decode 32 raw bytes into an address
pub fn decode_pubkey(cursor: &mut Cursor<&[u8]>) -> Result<Pubkey> {
    Ok(Pubkey::new_from_array(decode_fixed_array::<32>(cursor)?))
}

/// Parse base58 text into the 32 address bytes it names
pub fn parse_pubkey_string(value: &str) -> Result<[u8; 32]> {
    let bytes = bs58::decode(value).into_vec()?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        TxMintError::InvalidPublicKey(format!(
            "{} decodes to {} bytes, expected 32",
            value,
            bytes.len()
        ))
    })
}

/// Encode a base58 address string as its 32 raw bytes
pub fn encode_pubkey_as_string(value: &str, writer: &mut Vec<u8>) -> Result<()> {
    let bytes = parse_pubkey_string(value)?;
    encode_fixed_array(&bytes, writer)
}

/// Decode 32 raw bytes into base58 address text
pub fn decode_pubkey_as_string(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let bytes = decode_fixed_array::<32>(cursor)?;
    Ok(bs58::encode(bytes).into_string())
}

/// Encode an optional value as a presence byte followed by the value
pub fn encode_option<T: ?Sized, F>(value: Option<&T>, writer: &mut Vec<u8>, encode: F) -> Result<()>
where
    F: FnOnce(&T, &mut Vec<u8>) -> Result<()>,
{
    match value {
        Some(inner) => {
            encode_u8(1, writer)?;
            encode(inner, writer)
        }
        None => encode_u8(0, writer),
    }
}

/// Decode an optional value written by [`encode_option`]
pub fn decode_option<T, F>(cursor: &mut Cursor<&[u8]>, decode: F) -> Result<Option<T>>
where
    F: FnOnce(&mut Cursor<&[u8]>) -> Result<T>,
{
    match decode_u8(cursor)? {
        0 => Ok(None),
        1 => decode(cursor).map(Some),
        other => Err(TxMintError::DeserializationError(format!(
            "Invalid option flag: {}",
            other
        ))),
    }
}

/// Encode a list as a u32 count followed by its elements
pub fn encode_vec<T, F>(items: &[T], writer: &mut Vec<u8>, mut encode: F) -> Result<()>
where
    F: FnMut(&T, &mut Vec<u8>) -> Result<()>,
{
    let len = u32::try_from(items.len())
        .map_err(|_| TxMintError::EncodingError(format!("List too long: {}", items.len())))?;
    encode_u32(len, writer)?;
    for item in items {
        encode(item, writer)?;
    }
    Ok(())
}

/// Decode a u32-counted list
pub fn decode_vec<T, F>(cursor: &mut Cursor<&[u8]>, mut decode: F) -> Result<Vec<T>>
where
    F: FnMut(&mut Cursor<&[u8]>) -> Result<T>,
{
    let len = decode_u32(cursor)? as usize;
    let remaining = cursor.get_ref().len().saturating_sub(cursor.position() as usize);
    let mut items = Vec::with_capacity(len.min(remaining));
    for _ in 0..len {
        items.push(decode(cursor)?);
    }
    Ok(items)
}
