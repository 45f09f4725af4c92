use serde::de::Error as SerdeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    convert::TryInto,
    fmt::{Display, Error, Formatter},
    str::FromStr,
};
use thiserror::Error;

pub const ADDRESS_SIZE: usize = 20; // 20 bytes / 160 bits
// "0x" prefix + 40 hex characters
pub const ADDRESS_STR_LEN: usize = 2 + ADDRESS_SIZE * 2;
pub const ADDRESS_PREFIX: &str = "0x";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address must be {} characters long", ADDRESS_STR_LEN)]
    InvalidLength,
    #[error("Address must start with '{}'", ADDRESS_PREFIX)]
    MissingPrefix,
    #[error("Invalid hex string")]
    InvalidHex,
}

#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Address(bytes)
    }

    pub const fn zero() -> Self {
        Address::new([0; ADDRESS_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; ADDRESS_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        format!("{}{}", ADDRESS_PREFIX, hex::encode(self.0))
    }

    // Short display form used in status output: 0x1234…abcd
    pub fn to_short_string(&self) -> String {
        let full = self.to_hex();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }

    // Syntactic form check applied to user input before any parsing:
    // exactly 42 characters and a leading "0x". No checksum validation,
    // no zero/burn address detection.
    pub fn has_valid_format(value: &str) -> bool {
        value.len() == ADDRESS_STR_LEN && value.starts_with(ADDRESS_PREFIX)
    }

    pub fn from_string(value: &str) -> Result<Self, AddressError> {
        if !value.starts_with(ADDRESS_PREFIX) {
            return Err(AddressError::MissingPrefix);
        }
        if value.len() != ADDRESS_STR_LEN {
            return Err(AddressError::InvalidLength);
        }

        let bytes = hex::decode(&value[ADDRESS_PREFIX.len()..])
            .map_err(|_| AddressError::InvalidHex)?;
        let bytes: [u8; ADDRESS_SIZE] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength)?;
        Ok(Address::new(bytes))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}

impl AsRef<Address> for Address {
    fn as_ref(&self) -> &Address {
        self
    }
}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Address::from_string(&value).map_err(SerdeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEWARD: &str = "0xac27fa800955849d6d17cc8952ba9dd6eaa66187";

    #[test]
    fn test_format_check_accepts_well_formed() {
        assert!(Address::has_valid_format(STEWARD));
        // uppercase hex is still well formed
        assert!(Address::has_valid_format(
            "0xAC27FA800955849D6D17CC8952BA9DD6EAA66187"
        ));
    }

    #[test]
    fn test_format_check_rejects_malformed() {
        // empty
        assert!(!Address::has_valid_format(""));
        // missing prefix
        assert!(!Address::has_valid_format(
            "ac27fa800955849d6d17cc8952ba9dd6eaa6618700"
        ));
        // too short
        assert!(!Address::has_valid_format("0xac27fa80"));
        // too long
        assert!(!Address::has_valid_format(
            "0xac27fa800955849d6d17cc8952ba9dd6eaa66187ff"
        ));
    }

    #[test]
    fn test_parse_round_trip() {
        let address = Address::from_string(STEWARD).unwrap();
        assert_eq!(address.to_hex(), STEWARD);
        assert_eq!(address.to_string(), STEWARD);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Address::from_string("ac27fa800955849d6d17cc8952ba9dd6eaa66187"),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!(
            Address::from_string("0xac27"),
            Err(AddressError::InvalidLength)
        );
        assert_eq!(
            Address::from_string("0xzz27fa800955849d6d17cc8952ba9dd6eaa66187"),
            Err(AddressError::InvalidHex)
        );
    }

    #[test]
    fn test_short_string() {
        let address = Address::from_string(STEWARD).unwrap();
        assert_eq!(address.to_short_string(), "0xac27…6187");
    }

    #[test]
    fn test_serde_as_string() {
        let address = Address::from_string(STEWARD).unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", STEWARD));

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn test_zero() {
        assert!(Address::zero().is_zero());
        let address = Address::from_string(STEWARD).unwrap();
        assert!(!address.is_zero());
    }
}
