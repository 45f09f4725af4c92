//! Scripted wallet provider and ABI fixtures shared by the integration tests.
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use updelegate_common::{
    abi,
    api::{
        AccountsChangedEvent, CallRequest, ChainChangedEvent, TransactionReceipt,
        TransactionRequest,
    },
    chain::{format_chain_id, ChainId, ChainSpec},
    config::{FN_GET_ACTIVE_STEWARDS, FN_GET_DELEGATION, FN_GET_DELEGATION_STATS},
    crypto::{Address, TxHash, ADDRESS_SIZE},
    delegation::{DelegationStats, Steward},
    rpc::{client::EventReceiver, RpcError, RpcResponseError},
};
use updelegate_wallet::{error::WalletError, provider::WalletProvider};

pub const WORD: usize = 32;

pub fn word_u64(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn word_address(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - ADDRESS_SIZE..].copy_from_slice(address.as_bytes());
    word
}

pub fn word_string_data(value: &str) -> [u8; WORD] {
    assert!(value.len() <= WORD, "fixture strings must fit one word");
    let mut word = [0u8; WORD];
    word[..value.len()].copy_from_slice(value.as_bytes());
    word
}

// (address, uint256, string, bool) as returned by getDelegation
pub fn encode_delegation(delegate: &Address, timestamp: u64, kind: &str, active: bool) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&word_address(delegate));
    out.extend_from_slice(&word_u64(timestamp));
    out.extend_from_slice(&word_u64(128));
    out.extend_from_slice(&word_u64(active as u64));
    out.extend_from_slice(&word_u64(kind.len() as u64));
    out.extend_from_slice(&word_string_data(kind));
    out
}

// (uint256, uint256, uint256, uint256) as returned by getDelegationStats
pub fn encode_stats(stats: &DelegationStats) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&word_u64(stats.total));
    out.extend_from_slice(&word_u64(stats.to_self));
    out.extend_from_slice(&word_u64(stats.steward));
    out.extend_from_slice(&word_u64(stats.custom));
    out
}

// (address[], string[], uint256[]) as returned by getActiveStewards
pub fn encode_stewards(stewards: &[Steward]) -> Vec<u8> {
    let n = stewards.len();
    let addresses_offset = 3 * WORD;
    let names_offset = addresses_offset + WORD * (1 + n);
    let counts_offset = names_offset + WORD * (1 + 3 * n);

    let mut out = Vec::new();
    out.extend_from_slice(&word_u64(addresses_offset as u64));
    out.extend_from_slice(&word_u64(names_offset as u64));
    out.extend_from_slice(&word_u64(counts_offset as u64));

    out.extend_from_slice(&word_u64(n as u64));
    for steward in stewards {
        out.extend_from_slice(&word_address(&steward.address));
    }

    out.extend_from_slice(&word_u64(n as u64));
    for i in 0..n {
        // element offsets are relative to the element area
        out.extend_from_slice(&word_u64((WORD * (n + 2 * i)) as u64));
    }
    for steward in stewards {
        out.extend_from_slice(&word_u64(steward.name.len() as u64));
        out.extend_from_slice(&word_string_data(&steward.name));
    }

    out.extend_from_slice(&word_u64(n as u64));
    for steward in stewards {
        out.extend_from_slice(&word_u64(steward.delegation_count));
    }
    out
}

fn selector_hex(signature: &str) -> String {
    abi::to_hex_payload(&abi::selector(signature))
}

fn provider_error(code: i64, message: &str) -> WalletError {
    WalletError::Rpc(RpcError::Response(RpcResponseError {
        code,
        message: message.to_owned(),
        data: None,
    }))
}

pub fn address(seed: u8) -> Address {
    Address::new([seed; ADDRESS_SIZE])
}

pub fn steward_fixture(seed: u8, name: &str, delegation_count: u64) -> Steward {
    Steward {
        address: address(seed),
        name: name.to_owned(),
        delegation_count,
    }
}

// Wallet provider with scripted state and failures, recording every
// method invocation
pub struct MockProvider {
    pub accounts: Mutex<Vec<Address>>,
    pub chain_id: Mutex<ChainId>,
    pub stewards: Mutex<Vec<Steward>>,
    pub stats: Mutex<DelegationStats>,
    pub delegation: Mutex<Vec<u8>>,
    pub receipt_status: Mutex<String>,

    pub fail_revoke: AtomicBool,
    pub fail_send: AtomicBool,
    pub fail_stewards: AtomicBool,
    pub fail_stats: AtomicBool,
    pub switch_error_code: Mutex<Option<i64>>,

    pub sent_transactions: Mutex<Vec<TransactionRequest>>,
    pub added_chain: Mutex<Option<ChainSpec>>,
    pub log: Mutex<Vec<String>>,

    accounts_events: broadcast::Sender<Value>,
    chain_events: broadcast::Sender<Value>,
}

impl MockProvider {
    pub fn new(accounts: Vec<Address>, chain_id: ChainId) -> Arc<Self> {
        let (accounts_events, _) = broadcast::channel(16);
        let (chain_events, _) = broadcast::channel(16);
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            chain_id: Mutex::new(chain_id),
            stewards: Mutex::new(Vec::new()),
            stats: Mutex::new(DelegationStats::default()),
            delegation: Mutex::new(encode_delegation(&Address::zero(), 0, "", false)),
            receipt_status: Mutex::new("0x1".to_owned()),
            fail_revoke: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            fail_stewards: AtomicBool::new(false),
            fail_stats: AtomicBool::new(false),
            switch_error_code: Mutex::new(None),
            sent_transactions: Mutex::new(Vec::new()),
            added_chain: Mutex::new(None),
            log: Mutex::new(Vec::new()),
            accounts_events,
            chain_events,
        })
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    pub fn calls(&self, entry: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == entry)
            .count()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn push_accounts_changed(&self, accounts: Vec<Address>) {
        let event = serde_json::to_value(AccountsChangedEvent { accounts }).unwrap();
        let _ = self.accounts_events.send(event);
    }

    pub fn push_chain_changed(&self, chain_id: ChainId) {
        let event = serde_json::to_value(ChainChangedEvent {
            chain_id: format_chain_id(chain_id),
        })
        .unwrap();
        let _ = self.chain_events.send(event);
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.record("eth_accounts");
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.record("eth_requestAccounts");
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        self.record("eth_chainId");
        Ok(*self.chain_id.lock().unwrap())
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError> {
        self.record("wallet_switchEthereumChain");
        if let Some(code) = *self.switch_error_code.lock().unwrap() {
            return Err(provider_error(code, "Unrecognized chain ID"));
        }
        *self.chain_id.lock().unwrap() = chain_id;
        Ok(())
    }

    async fn add_chain(&self, spec: &ChainSpec) -> Result<(), WalletError> {
        self.record("wallet_addEthereumChain");
        *self.added_chain.lock().unwrap() = Some(*spec);
        Ok(())
    }

    async fn revoke_permissions(&self) -> Result<(), WalletError> {
        self.record("wallet_revokePermissions");
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(provider_error(-32000, "Revoke failed"));
        }
        self.accounts.lock().unwrap().clear();
        Ok(())
    }

    async fn call(&self, request: CallRequest) -> Result<Vec<u8>, WalletError> {
        let selector = &request.data[..10];
        if selector == selector_hex(FN_GET_ACTIVE_STEWARDS) {
            self.record("call:getActiveStewards");
            if self.fail_stewards.load(Ordering::SeqCst) {
                return Err(provider_error(-32000, "execution error"));
            }
            Ok(encode_stewards(&self.stewards.lock().unwrap()))
        } else if selector == selector_hex(FN_GET_DELEGATION_STATS) {
            self.record("call:getDelegationStats");
            if self.fail_stats.load(Ordering::SeqCst) {
                return Err(provider_error(-32000, "execution error"));
            }
            Ok(encode_stats(&self.stats.lock().unwrap()))
        } else if selector == selector_hex(FN_GET_DELEGATION) {
            self.record("call:getDelegation");
            Ok(self.delegation.lock().unwrap().clone())
        } else {
            Err(provider_error(-32601, "unknown selector"))
        }
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, WalletError> {
        self.record("eth_sendTransaction");
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(provider_error(4001, "User rejected the request"));
        }
        self.sent_transactions.lock().unwrap().push(request);
        Ok(TxHash::new([0xaa; 32]))
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        self.record("eth_getTransactionReceipt");
        Ok(Some(TransactionReceipt {
            transaction_hash: hash,
            block_number: Some("0x10".to_owned()),
            status: self.receipt_status.lock().unwrap().clone(),
        }))
    }

    async fn on_accounts_changed(
        &self,
    ) -> Result<EventReceiver<AccountsChangedEvent>, WalletError> {
        Ok(EventReceiver::new(self.accounts_events.subscribe()))
    }

    async fn on_chain_changed(&self) -> Result<EventReceiver<ChainChangedEvent>, WalletError> {
        Ok(EventReceiver::new(self.chain_events.subscribe()))
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.record("disconnect");
        Ok(())
    }
}
