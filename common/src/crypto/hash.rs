use serde::de::Error as SerdeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    convert::TryInto,
    fmt::{Display, Error, Formatter},
    str::FromStr,
};
use thiserror::Error;

pub const HASH_SIZE: usize = 32; // 32 bytes / 256 bits

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("Hash must be {} hex characters with a '0x' prefix", HASH_SIZE * 2)]
    InvalidLength,
    #[error("Invalid hex string")]
    InvalidHex,
}

// Transaction hash as returned by the wallet provider
#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct TxHash([u8; HASH_SIZE]);

impl TxHash {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        TxHash(bytes)
    }

    pub const fn zero() -> Self {
        TxHash::new([0; HASH_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_string(value: &str) -> Result<Self, HashError> {
        let raw = value.strip_prefix("0x").ok_or(HashError::InvalidLength)?;
        if raw.len() != HASH_SIZE * 2 {
            return Err(HashError::InvalidLength);
        }

        let bytes = hex::decode(raw).map_err(|_| HashError::InvalidHex)?;
        let bytes: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| HashError::InvalidLength)?;
        Ok(TxHash::new(bytes))
    }
}

impl FromStr for TxHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TxHash::from_string(s)
    }
}

impl std::hash::Hash for TxHash {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        TxHash::from_string(&value).map_err(SerdeError::custom)
    }
}
