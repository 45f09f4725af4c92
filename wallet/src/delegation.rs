//! Delegation state machine: snapshots of contract state and the three
//! delegation intents.
//!
//! Every mutating operation follows the same protocol: guard on an
//! initialized contract client, raise `loading`, submit and await the
//! confirmation, refresh every snapshot, drop `loading` on success and
//! failure alike. The `loading` flag is advisory: the CLI refuses new
//! delegations while it is set, the controller itself does not serialize
//! concurrent callers.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, error, trace};
use tokio::sync::RwLock;
use updelegate_common::{
    config::DELEGATION_CONTRACT,
    crypto::{Address, TxHash},
    delegation::{DelegationInfo, DelegationStats, Steward},
};

use crate::{contract::ContractClient, error::WalletError, provider::SharedProvider};

pub type SharedDelegationController = Arc<DelegationController>;

// Read-only caches of contract state, replaced wholesale on refresh and
// never merged incrementally
#[derive(Debug, Clone, Default)]
pub struct DelegationSnapshots {
    pub stewards: Vec<Steward>,
    pub stats: Option<DelegationStats>,
    pub delegation: Option<DelegationInfo>,
}

pub struct DelegationController {
    contract: RwLock<Option<ContractClient>>,
    snapshots: RwLock<DelegationSnapshots>,
    loading: AtomicBool,
}

impl DelegationController {
    pub fn new() -> SharedDelegationController {
        Arc::new(Self {
            contract: RwLock::new(None),
            snapshots: RwLock::new(DelegationSnapshots::default()),
            loading: AtomicBool::new(false),
        })
    }

    // Bind the contract client to the connected account. Called when a
    // session gains an account; delegate-to-self uses this account.
    pub async fn init(&self, provider: SharedProvider, account: Address) {
        if log::log_enabled!(log::Level::Debug) {
            debug!("Initializing contract client for {}", account.to_short_string());
        }
        *self.contract.write().await = Some(ContractClient::new(
            provider,
            *DELEGATION_CONTRACT,
            account,
        ));
    }

    pub async fn teardown(&self) {
        trace!("teardown");
        *self.contract.write().await = None;
        *self.snapshots.write().await = DelegationSnapshots::default();
    }

    pub async fn is_initialized(&self) -> bool {
        self.contract.read().await.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn get_snapshots(&self) -> DelegationSnapshots {
        self.snapshots.read().await.clone()
    }

    async fn client(&self) -> Result<ContractClient, WalletError> {
        self.contract
            .read()
            .await
            .clone()
            .ok_or(WalletError::Uninitialized)
    }

    // Delegate to the connected account itself
    pub async fn delegate_to_self(&self) -> Result<TxHash, WalletError> {
        let client = self.client().await?;
        let account = *client.get_account();
        self.submit(client, account).await
    }

    pub async fn delegate_to_steward(&self, steward: Address) -> Result<TxHash, WalletError> {
        let client = self.client().await?;
        self.submit(client, steward).await
    }

    pub async fn delegate_to_custom(&self, delegate: Address) -> Result<TxHash, WalletError> {
        let client = self.client().await?;
        self.submit(client, delegate).await
    }

    async fn submit(&self, client: ContractClient, delegate: Address) -> Result<TxHash, WalletError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.submit_internal(&client, delegate).await;
        self.loading.store(false, Ordering::SeqCst);
        result
    }

    async fn submit_internal(
        &self,
        client: &ContractClient,
        delegate: Address,
    ) -> Result<TxHash, WalletError> {
        let pending = client.delegate(&delegate).await?;
        let hash = *pending.get_hash();
        if log::log_enabled!(log::Level::Debug) {
            debug!("Delegation transaction {} submitted, waiting for confirmation", hash);
        }
        pending.wait().await?;

        // on-chain state moved, replace the snapshots; a failed refresh
        // does not fail the confirmed delegation
        if let Err(e) = self.load_contract_data(client).await {
            error!("Error while refreshing contract data: {}", e);
        }
        Ok(hash)
    }

    // Full data refresh, guarded like the mutating operations
    pub async fn refresh(&self) -> Result<(), WalletError> {
        let client = self.client().await?;
        self.loading.store(true, Ordering::SeqCst);
        let result = self.load_contract_data(&client).await;
        self.loading.store(false, Ordering::SeqCst);
        result
    }

    // The three reads are sequential and not transactional: the first
    // failure aborts the rest of the cycle, leaving the snapshots already
    // written in place and the remaining ones stale. Callers must
    // tolerate partially-stale snapshots after a failed refresh.
    async fn load_contract_data(&self, client: &ContractClient) -> Result<(), WalletError> {
        trace!("load_contract_data");

        let stewards = client.get_active_stewards().await?;
        self.snapshots.write().await.stewards = stewards;

        let stats = client.get_delegation_stats().await?;
        self.snapshots.write().await.stats = Some(stats);

        let delegation = client.get_delegation(client.get_account()).await?;
        self.snapshots.write().await.delegation = Some(delegation);

        Ok(())
    }
}
