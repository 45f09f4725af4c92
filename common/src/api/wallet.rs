//! Request and response types for the wallet provider RPC surface.

use crate::{
    chain::{format_chain_id, ChainSpec},
    crypto::{Address, TxHash},
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Block tag used for read calls; the client never queries history
pub const BLOCK_LATEST: &str = "latest";

// Subscription events pushed by the wallet provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotifyEvent {
    AccountsChanged,
    ChainChanged,
}

impl NotifyEvent {
    pub fn method_name(&self) -> &'static str {
        match self {
            NotifyEvent::AccountsChanged => "accountsChanged",
            NotifyEvent::ChainChanged => "chainChanged",
        }
    }

    pub fn from_method_name(name: &str) -> Option<Self> {
        match name {
            "accountsChanged" => Some(NotifyEvent::AccountsChanged),
            "chainChanged" => Some(NotifyEvent::ChainChanged),
            _ => None,
        }
    }
}

// accountsChanged carries the full (possibly empty) account list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsChangedEvent {
    pub accounts: Vec<Address>,
}

// chainChanged carries the new chain id as a hex string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainChangedEvent {
    pub chain_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChainParams {
    pub chain_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddChainCurrency<'a> {
    pub name: Cow<'a, str>,
    pub symbol: Cow<'a, str>,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams<'a> {
    pub chain_id: String,
    pub chain_name: Cow<'a, str>,
    pub native_currency: AddChainCurrency<'a>,
    pub rpc_urls: Vec<Cow<'a, str>>,
    pub block_explorer_urls: Vec<Cow<'a, str>>,
}

impl<'a> From<&'a ChainSpec> for AddChainParams<'a> {
    fn from(spec: &'a ChainSpec) -> Self {
        Self {
            chain_id: format_chain_id(spec.chain_id),
            chain_name: Cow::Borrowed(spec.name),
            native_currency: AddChainCurrency {
                name: Cow::Borrowed(spec.native_currency.name),
                symbol: Cow::Borrowed(spec.native_currency.symbol),
                decimals: spec.native_currency.decimals,
            },
            rpc_urls: vec![Cow::Borrowed(spec.rpc_url)],
            block_explorer_urls: vec![Cow::Borrowed(spec.explorer_url)],
        }
    }
}

// wallet_revokePermissions scope: { "eth_accounts": {} }
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionScope {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevokePermissionsParams {
    pub eth_accounts: PermissionScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub to: Address,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    // "0x1" on success, "0x0" on revert
    pub status: String,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == "0x1"
    }
}
