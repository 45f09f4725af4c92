use serde::Serialize;
use thiserror::Error;

// Numeric network identifier as reported by the wallet provider
pub type ChainId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainIdError {
    #[error("Chain id must be a '0x' prefixed hex string")]
    MissingPrefix,
    #[error("Invalid chain id: {}", _0)]
    InvalidValue(String),
}

// The provider speaks chain ids as 0x-prefixed hex strings
pub fn format_chain_id(id: ChainId) -> String {
    format!("{:#x}", id)
}

pub fn parse_chain_id(value: &str) -> Result<ChainId, ChainIdError> {
    let raw = value
        .strip_prefix("0x")
        .ok_or(ChainIdError::MissingPrefix)?;
    ChainId::from_str_radix(raw, 16).map_err(|_| ChainIdError::InvalidValue(value.to_owned()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

// Full chain definition as handed to the wallet when it does not know
// the target network yet (wallet_addEthereumChain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainSpec {
    pub chain_id: ChainId,
    pub name: &'static str,
    pub native_currency: NativeCurrency,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
}

// The single network the delegation contract lives on
pub const BASE_MAINNET: ChainSpec = ChainSpec {
    chain_id: 8453,
    name: "Base",
    native_currency: NativeCurrency {
        name: "Ethereum",
        symbol: "ETH",
        decimals: 18,
    },
    rpc_url: "https://mainnet.base.org",
    explorer_url: "https://basescan.org",
};
