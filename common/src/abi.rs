//! Minimal ABI codec for the delegation contract surface.
//!
//! Only the shapes the contract interface actually uses are supported:
//! static calls with at most one address argument, and return tuples made
//! of addresses, uint256, bool, strings and one-dimensional arrays.

use crate::crypto::{Address, ADDRESS_SIZE};
use primitive_types::U256;
use sha3::{Digest, Keccak256};
use thiserror::Error;

pub const WORD_SIZE: usize = 32;
pub const SELECTOR_SIZE: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("Return data ends before expected word at byte {}", _0)]
    OutOfBounds(usize),
    #[error("Boolean word is neither zero nor one")]
    InvalidBool,
    #[error("String payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("Value does not fit in 64 bits")]
    ValueTooLarge,
    #[error("Offset or length does not fit in memory")]
    InvalidOffset,
    #[error("Invalid hex payload")]
    InvalidHex,
    #[error("Address word has non-zero padding")]
    InvalidAddressPadding,
}

// First four bytes of the keccak-256 hash of the canonical signature
pub fn selector(signature: &str) -> [u8; SELECTOR_SIZE] {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; SELECTOR_SIZE];
    out.copy_from_slice(&digest[..SELECTOR_SIZE]);
    out
}

// Calldata for a no-argument function
pub fn encode_call(signature: &str) -> Vec<u8> {
    selector(signature).to_vec()
}

// Calldata for a single address argument, left-padded to a full word
pub fn encode_call_address(signature: &str, address: &Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(SELECTOR_SIZE + WORD_SIZE);
    data.extend_from_slice(&selector(signature));
    data.extend_from_slice(&[0u8; WORD_SIZE - ADDRESS_SIZE]);
    data.extend_from_slice(address.as_bytes());
    data
}

pub fn to_hex_payload(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn from_hex_payload(payload: &str) -> Result<Vec<u8>, AbiError> {
    let raw = payload.strip_prefix("0x").unwrap_or(payload);
    hex::decode(raw).map_err(|_| AbiError::InvalidHex)
}

// Word-level reader over a return payload. Static slots are addressed by
// word index; dynamic data by the byte offsets read from those slots.
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word_at_byte(&self, offset: usize) -> Result<&'a [u8], AbiError> {
        let end = offset
            .checked_add(WORD_SIZE)
            .ok_or(AbiError::InvalidOffset)?;
        if end > self.data.len() {
            return Err(AbiError::OutOfBounds(offset));
        }
        Ok(&self.data[offset..end])
    }

    fn uint_at_byte(&self, offset: usize) -> Result<U256, AbiError> {
        Ok(U256::from_big_endian(self.word_at_byte(offset)?))
    }

    fn usize_at_byte(&self, offset: usize) -> Result<usize, AbiError> {
        let value = self.uint_at_byte(offset)?;
        if value > U256::from(usize::MAX as u64) {
            return Err(AbiError::InvalidOffset);
        }
        Ok(value.low_u64() as usize)
    }

    pub fn read_uint(&self, index: usize) -> Result<U256, AbiError> {
        self.uint_at_byte(index * WORD_SIZE)
    }

    pub fn read_u64(&self, index: usize) -> Result<u64, AbiError> {
        let value = self.read_uint(index)?;
        if value > U256::from(u64::MAX) {
            return Err(AbiError::ValueTooLarge);
        }
        Ok(value.low_u64())
    }

    pub fn read_address(&self, index: usize) -> Result<Address, AbiError> {
        let word = self.word_at_byte(index * WORD_SIZE)?;
        if word[..WORD_SIZE - ADDRESS_SIZE].iter().any(|b| *b != 0) {
            return Err(AbiError::InvalidAddressPadding);
        }
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&word[WORD_SIZE - ADDRESS_SIZE..]);
        Ok(Address::new(bytes))
    }

    pub fn read_bool(&self, index: usize) -> Result<bool, AbiError> {
        let value = self.read_uint(index)?;
        if value == U256::zero() {
            Ok(false)
        } else if value == U256::one() {
            Ok(true)
        } else {
            Err(AbiError::InvalidBool)
        }
    }

    // Byte offset of a dynamic field, read from its head slot
    pub fn read_offset(&self, index: usize) -> Result<usize, AbiError> {
        self.usize_at_byte(index * WORD_SIZE)
    }

    pub fn read_string_at(&self, offset: usize) -> Result<String, AbiError> {
        let len = self.usize_at_byte(offset)?;
        let start = offset
            .checked_add(WORD_SIZE)
            .ok_or(AbiError::InvalidOffset)?;
        let end = start.checked_add(len).ok_or(AbiError::InvalidOffset)?;
        if end > self.data.len() {
            return Err(AbiError::OutOfBounds(start));
        }
        String::from_utf8(self.data[start..end].to_vec()).map_err(|_| AbiError::InvalidUtf8)
    }

    pub fn read_address_array_at(&self, offset: usize) -> Result<Vec<Address>, AbiError> {
        let len = self.usize_at_byte(offset)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let word_offset = offset + WORD_SIZE + i * WORD_SIZE;
            let word = self.word_at_byte(word_offset)?;
            if word[..WORD_SIZE - ADDRESS_SIZE].iter().any(|b| *b != 0) {
                return Err(AbiError::InvalidAddressPadding);
            }
            let mut bytes = [0u8; ADDRESS_SIZE];
            bytes.copy_from_slice(&word[WORD_SIZE - ADDRESS_SIZE..]);
            out.push(Address::new(bytes));
        }
        Ok(out)
    }

    pub fn read_u64_array_at(&self, offset: usize) -> Result<Vec<u64>, AbiError> {
        let len = self.usize_at_byte(offset)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let value = self.uint_at_byte(offset + WORD_SIZE + i * WORD_SIZE)?;
            if value > U256::from(u64::MAX) {
                return Err(AbiError::ValueTooLarge);
            }
            out.push(value.low_u64());
        }
        Ok(out)
    }

    // string[] encodes a length, then per-element offsets relative to the
    // start of the element area (right after the length word)
    pub fn read_string_array_at(&self, offset: usize) -> Result<Vec<String>, AbiError> {
        let len = self.usize_at_byte(offset)?;
        let elements_start = offset
            .checked_add(WORD_SIZE)
            .ok_or(AbiError::InvalidOffset)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let relative = self.usize_at_byte(elements_start + i * WORD_SIZE)?;
            let string_offset = elements_start
                .checked_add(relative)
                .ok_or(AbiError::InvalidOffset)?;
            out.push(self.read_string_at(string_offset)?);
        }
        Ok(out)
    }
}
