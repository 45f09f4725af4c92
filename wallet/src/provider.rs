//! Adapter around the external wallet provider.
//!
//! The provider is an opaque collaborator: it owns the keys, the signing
//! prompts and the network selection. This module only speaks its RPC
//! surface and forwards its subscription events.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, trace};
use updelegate_common::{
    abi,
    api::{
        AccountsChangedEvent, AddChainParams, CallRequest, ChainChangedEvent, NotifyEvent,
        RevokePermissionsParams, SwitchChainParams, TransactionReceipt, TransactionRequest,
        BLOCK_LATEST,
    },
    chain::{format_chain_id, parse_chain_id, ChainId, ChainSpec},
    crypto::{Address, TxHash},
    rpc::{
        client::{EventReceiver, SharedJsonRpcClient, WebSocketJsonRpcClient},
        RpcError,
    },
};

use crate::{config::EVENTS_CHANNEL_CAPACITY, error::WalletError};

// Seam between the state machines and the wallet. Implemented by the
// websocket client below and by scripted providers in tests.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    // Accounts already authorized for this application, without prompting
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    // Ask the wallet to authorize an account; prompts the user
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    async fn chain_id(&self) -> Result<ChainId, WalletError>;

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError>;

    async fn add_chain(&self, spec: &ChainSpec) -> Result<(), WalletError>;

    async fn revoke_permissions(&self) -> Result<(), WalletError>;

    // Read-only contract call, returns the raw ABI payload
    async fn call(&self, request: CallRequest) -> Result<Vec<u8>, WalletError>;

    // Submit a transaction for signing and broadcast
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, WalletError>;

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, WalletError>;

    async fn on_accounts_changed(
        &self,
    ) -> Result<EventReceiver<AccountsChangedEvent>, WalletError>;

    async fn on_chain_changed(&self) -> Result<EventReceiver<ChainChangedEvent>, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;
}

pub struct ProviderApi {
    client: SharedJsonRpcClient,
    capacity: usize,
}

impl ProviderApi {
    pub async fn new(provider_address: String) -> Result<Self, WalletError> {
        Self::with(provider_address, EVENTS_CHANNEL_CAPACITY).await
    }

    pub async fn with(provider_address: String, capacity: usize) -> Result<Self, WalletError> {
        let client = WebSocketJsonRpcClient::new(provider_address)
            .await
            .map_err(|e| match e {
                RpcError::WebSocket(_) | RpcError::Disconnected => WalletError::NoWalletProvider,
                other => WalletError::Rpc(other),
            })?;
        Ok(Self { client, capacity })
    }

    pub fn get_client(&self) -> &SharedJsonRpcClient {
        &self.client
    }

    // is the websocket connection alive
    pub fn is_online(&self) -> bool {
        self.client.is_online()
    }
}

#[async_trait]
impl WalletProvider for ProviderApi {
    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("eth_accounts");
        }
        let accounts = self.client.call("eth_accounts").await?;
        Ok(accounts)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("eth_requestAccounts");
        }
        let accounts = self.client.call("eth_requestAccounts").await?;
        Ok(accounts)
    }

    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("eth_chainId");
        }
        let chain_id: String = self.client.call("eth_chainId").await?;
        Ok(parse_chain_id(&chain_id)?)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("wallet_switchEthereumChain to {}", chain_id);
        }
        let _: serde_json::Value = self
            .client
            .call_with(
                "wallet_switchEthereumChain",
                &[SwitchChainParams {
                    chain_id: format_chain_id(chain_id),
                }],
            )
            .await?;
        Ok(())
    }

    async fn add_chain(&self, spec: &ChainSpec) -> Result<(), WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("wallet_addEthereumChain {}", spec.name);
        }
        let _: serde_json::Value = self
            .client
            .call_with("wallet_addEthereumChain", &[AddChainParams::from(spec)])
            .await?;
        Ok(())
    }

    async fn revoke_permissions(&self) -> Result<(), WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("wallet_revokePermissions");
        }
        let _: serde_json::Value = self
            .client
            .call_with(
                "wallet_revokePermissions",
                &[RevokePermissionsParams::default()],
            )
            .await?;
        Ok(())
    }

    async fn call(&self, request: CallRequest) -> Result<Vec<u8>, WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("eth_call to {}", request.to);
        }
        let payload: String = self
            .client
            .call_with("eth_call", &(request, BLOCK_LATEST))
            .await?;
        Ok(abi::from_hex_payload(&payload)?)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("eth_sendTransaction to {}", request.to);
        }
        let hash = self
            .client
            .call_with("eth_sendTransaction", &[request])
            .await?;
        Ok(hash)
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("eth_getTransactionReceipt {}", hash);
        }
        let receipt = self
            .client
            .call_with("eth_getTransactionReceipt", &[hash])
            .await?;
        Ok(receipt)
    }

    async fn on_accounts_changed(
        &self,
    ) -> Result<EventReceiver<AccountsChangedEvent>, WalletError> {
        trace!("on_accounts_changed");
        let receiver = self
            .client
            .subscribe_event(NotifyEvent::AccountsChanged, self.capacity)
            .await;
        Ok(receiver)
    }

    async fn on_chain_changed(&self) -> Result<EventReceiver<ChainChangedEvent>, WalletError> {
        trace!("on_chain_changed");
        let receiver = self
            .client
            .subscribe_event(NotifyEvent::ChainChanged, self.capacity)
            .await;
        Ok(receiver)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("disconnect");
        }
        debug!("Closing wallet provider connection");
        self.client.disconnect().await?;
        Ok(())
    }
}

pub type SharedProvider = Arc<dyn WalletProvider>;
