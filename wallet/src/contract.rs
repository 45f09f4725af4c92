//! Client for the fixed delegation contract.
//!
//! All reads go through `eth_call` against the latest block; the single
//! write is `delegate(address)`, which every delegation intent shares.

use std::str::FromStr;

use anyhow::anyhow;
use log::{debug, trace};
use tokio::time::sleep;
use updelegate_common::{
    abi::{self, Decoder},
    api::{CallRequest, TransactionReceipt, TransactionRequest},
    config::{FN_DELEGATE, FN_GET_ACTIVE_STEWARDS, FN_GET_DELEGATION, FN_GET_DELEGATION_STATS},
    crypto::{Address, TxHash},
    delegation::{DelegationInfo, DelegationKind, DelegationStats, Steward},
};

use crate::{config::CONFIRMATION_POLL_INTERVAL, error::WalletError, provider::SharedProvider};

#[derive(Clone)]
pub struct ContractClient {
    provider: SharedProvider,
    contract: Address,
    // account used as caller and transaction sender
    account: Address,
}

impl ContractClient {
    pub fn new(provider: SharedProvider, contract: Address, account: Address) -> Self {
        Self {
            provider,
            contract,
            account,
        }
    }

    pub fn get_contract(&self) -> &Address {
        &self.contract
    }

    pub fn get_account(&self) -> &Address {
        &self.account
    }

    async fn read(&self, data: Vec<u8>) -> Result<Vec<u8>, WalletError> {
        self.provider
            .call(CallRequest {
                to: self.contract,
                data: abi::to_hex_payload(&data),
                from: Some(self.account),
            })
            .await
    }

    /// Delegation recorded for an account: (delegate, timestamp, kind, active)
    pub async fn get_delegation(&self, user: &Address) -> Result<DelegationInfo, WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get_delegation for {}", user);
        }
        let payload = self
            .read(abi::encode_call_address(FN_GET_DELEGATION, user))
            .await?;
        let decoder = Decoder::new(&payload);

        let delegate = decoder.read_address(0)?;
        let timestamp = decoder.read_u64(1)?;
        let kind = decoder.read_string_at(decoder.read_offset(2)?)?;
        let active = decoder.read_bool(3)?;

        // the contract returns an empty kind string when nothing is recorded
        let kind = if kind.is_empty() {
            None
        } else {
            Some(
                DelegationKind::from_str(&kind)
                    .map_err(|_| anyhow!("Unknown delegation kind '{}'", kind))?,
            )
        };

        Ok(DelegationInfo {
            delegate,
            timestamp,
            kind,
            active,
        })
    }

    /// Current steward set: (addresses, names, delegation counts)
    pub async fn get_active_stewards(&self) -> Result<Vec<Steward>, WalletError> {
        trace!("get_active_stewards");
        let payload = self.read(abi::encode_call(FN_GET_ACTIVE_STEWARDS)).await?;
        let decoder = Decoder::new(&payload);

        let addresses = decoder.read_address_array_at(decoder.read_offset(0)?)?;
        let names = decoder.read_string_array_at(decoder.read_offset(1)?)?;
        let counts = decoder.read_u64_array_at(decoder.read_offset(2)?)?;

        if addresses.len() != names.len() || names.len() != counts.len() {
            return Err(anyhow!("Inconsistent steward columns from contract").into());
        }

        let stewards = addresses
            .into_iter()
            .zip(names)
            .zip(counts)
            .map(|((address, name), delegation_count)| Steward {
                address,
                name,
                delegation_count,
            })
            .collect();
        Ok(stewards)
    }

    pub async fn get_delegation_stats(&self) -> Result<DelegationStats, WalletError> {
        trace!("get_delegation_stats");
        let payload = self.read(abi::encode_call(FN_GET_DELEGATION_STATS)).await?;
        let decoder = Decoder::new(&payload);

        Ok(DelegationStats {
            total: decoder.read_u64(0)?,
            to_self: decoder.read_u64(1)?,
            steward: decoder.read_u64(2)?,
            custom: decoder.read_u64(3)?,
        })
    }

    // The only mutating call; self/steward/custom are presentation intents
    // over the same write
    pub async fn delegate(&self, delegate: &Address) -> Result<PendingTransaction, WalletError> {
        if log::log_enabled!(log::Level::Debug) {
            debug!("Submitting delegate({}) from {}", delegate, self.account);
        }
        let data = abi::encode_call_address(FN_DELEGATE, delegate);
        let hash = self
            .provider
            .send_transaction(TransactionRequest {
                from: self.account,
                to: self.contract,
                data: abi::to_hex_payload(&data),
            })
            .await?;
        Ok(PendingTransaction {
            provider: self.provider.clone(),
            hash,
        })
    }
}

// A submitted transaction before its on-chain confirmation
pub struct PendingTransaction {
    provider: SharedProvider,
    hash: TxHash,
}

impl PendingTransaction {
    pub fn get_hash(&self) -> &TxHash {
        &self.hash
    }

    // Poll the wallet until it reports a receipt. There is no timeout:
    // a wallet that never answers keeps the caller pending.
    pub async fn wait(self) -> Result<TransactionReceipt, WalletError> {
        loop {
            if let Some(receipt) = self.provider.transaction_receipt(self.hash).await? {
                if !receipt.is_success() {
                    return Err(WalletError::TransactionReverted(self.hash));
                }
                if log::log_enabled!(log::Level::Debug) {
                    debug!("Transaction {} confirmed", self.hash);
                }
                return Ok(receipt);
            }
            sleep(CONFIRMATION_POLL_INTERVAL).await;
        }
    }
}
