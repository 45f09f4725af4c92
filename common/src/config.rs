use crate::crypto::Address;
use lazy_static::lazy_static;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Deployed delegation contract on Base mainnet
pub const DELEGATION_CONTRACT_HEX: &str = "0xac27fa800955849d6d17cc8952ba9dd6eaa66187";

// Contract interface signatures, used to derive call selectors.
// `delegateToCustom` is part of the deployed interface but the client
// only ever submits `delegate` (the variants are presentation intent).
pub const FN_DELEGATE: &str = "delegate(address)";
pub const FN_DELEGATE_TO_CUSTOM: &str = "delegateToCustom(address)";
pub const FN_GET_DELEGATION: &str = "getDelegation(address)";
pub const FN_GET_ACTIVE_STEWARDS: &str = "getActiveStewards()";
pub const FN_GET_DELEGATION_STATS: &str = "getDelegationStats()";
pub const EVENT_VOTING_RIGHTS_DELEGATED: &str =
    "VotingRightsDelegated(address,address,uint256,string)";

lazy_static! {
    pub static ref DELEGATION_CONTRACT: Address =
        Address::from_string(DELEGATION_CONTRACT_HEX).unwrap();
}
