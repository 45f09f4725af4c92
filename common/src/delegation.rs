use crate::crypto::Address;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// How the delegate target was chosen. The contract stores this as a
// free-form string next to the delegation itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DelegationKind {
    #[serde(rename = "self")]
    #[strum(serialize = "self")]
    ToSelf,
    Steward,
    Custom,
}

// Snapshot of a user's delegation as read from the contract.
// `kind` is None when the contract has no delegation recorded for the
// account (it returns an empty kind string in that case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationInfo {
    pub delegate: Address,
    // seconds since epoch, as reported by the contract
    pub timestamp: u64,
    pub kind: Option<DelegationKind>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Steward {
    pub address: Address,
    pub name: String,
    pub delegation_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DelegationStats {
    pub total: u64,
    #[serde(rename = "self")]
    pub to_self: u64,
    pub steward: u64,
    pub custom: u64,
}
