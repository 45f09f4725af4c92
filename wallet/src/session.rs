//! Connection state machine for the wallet session.
//!
//! States: Disconnected -> Connecting -> Connected (wrong network) ->
//! Connected (on target network). Disconnected is reachable from any
//! state through an explicit disconnect or a wallet-side account removal.

use std::sync::Arc;

use log::{debug, info, trace, warn};
use tokio::sync::{broadcast, RwLock};
use updelegate_common::{
    chain::{ChainId, ChainSpec},
    crypto::Address,
};

use crate::{error::WalletError, provider::SharedProvider};

pub type SharedSession = Arc<Session>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connecting,
    Connected { account: Address, chain_id: ChainId },
    AccountChanged { account: Address },
    ChainChanged { chain_id: ChainId },
    Disconnected,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    account: Option<Address>,
    chain_id: Option<ChainId>,
    connecting: bool,
}

pub struct Session {
    provider: SharedProvider,
    target: ChainSpec,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(provider: SharedProvider, target: ChainSpec) -> SharedSession {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            provider,
            target,
            state: RwLock::new(SessionState::default()),
            events,
        })
    }

    pub fn get_provider(&self) -> &SharedProvider {
        &self.provider
    }

    pub fn get_target(&self) -> &ChainSpec {
        &self.target
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn propagate_event(&self, event: SessionEvent) {
        if log::log_enabled!(log::Level::Trace) {
            trace!("Propagating event {:?}", event);
        }
        if self.events.send(event).is_err() {
            trace!("No subscriber for session events");
        }
    }

    pub async fn get_account(&self) -> Option<Address> {
        self.state.read().await.account
    }

    pub async fn get_chain_id(&self) -> Option<ChainId> {
        self.state.read().await.chain_id
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.account.is_some()
    }

    pub async fn is_connecting(&self) -> bool {
        self.state.read().await.connecting
    }

    pub async fn is_on_target_chain(&self) -> bool {
        self.state.read().await.chain_id == Some(self.target.chain_id)
    }

    // Derived gate for the delegation surface: connected AND on target
    pub async fn can_delegate(&self) -> bool {
        let state = self.state.read().await;
        state.account.is_some() && state.chain_id == Some(self.target.chain_id)
    }

    // Adopt an account that is already authorized, without prompting.
    // Used once at session start.
    pub async fn check_connection(&self) -> Result<(), WalletError> {
        trace!("check_connection");
        let accounts = self.provider.accounts().await?;
        let account = match accounts.first().copied() {
            Some(account) => account,
            None => {
                debug!("No account authorized yet");
                return Ok(());
            }
        };

        let chain_id = self.provider.chain_id().await?;
        {
            let mut state = self.state.write().await;
            state.account = Some(account);
            state.chain_id = Some(chain_id);
        }
        info!("Resumed session with {}", account.to_short_string());
        self.propagate_event(SessionEvent::Connected { account, chain_id })
            .await;
        Ok(())
    }

    // Request an account from the wallet; if the wallet ends up on the
    // wrong chain, the switch to the target is invoked automatically
    pub async fn connect(&self) -> Result<(), WalletError> {
        {
            let mut state = self.state.write().await;
            if state.connecting {
                warn!("Already connecting");
                return Ok(());
            }
            state.connecting = true;
        }
        self.propagate_event(SessionEvent::Connecting).await;

        let result = self.connect_internal().await;
        self.state.write().await.connecting = false;
        result
    }

    async fn connect_internal(&self) -> Result<(), WalletError> {
        let accounts = self.provider.request_accounts().await?;
        let account = match accounts.first().copied() {
            Some(account) => account,
            None => {
                // wallet holds no account; stay disconnected without failing
                warn!("Wallet returned no accounts");
                return Ok(());
            }
        };

        let chain_id = self.provider.chain_id().await?;
        {
            let mut state = self.state.write().await;
            state.account = Some(account);
            state.chain_id = Some(chain_id);
        }
        info!(
            "Connected with {} on chain {}",
            account.to_short_string(),
            chain_id
        );
        self.propagate_event(SessionEvent::Connected { account, chain_id })
            .await;

        if chain_id != self.target.chain_id {
            info!(
                "Wallet is on chain {}, requesting switch to {} ({})",
                chain_id, self.target.name, self.target.chain_id
            );
            self.switch_to_target().await?;
        }

        Ok(())
    }

    // wallet_switchEthereumChain, falling back to wallet_addEthereumChain
    // with the full chain definition when the wallet reports the chain as
    // unknown. The resulting chain id update arrives via chainChanged.
    pub async fn switch_to_target(&self) -> Result<(), WalletError> {
        match self.provider.switch_chain(self.target.chain_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unrecognized_chain() => {
                debug!(
                    "Chain {} is unknown to the wallet, requesting to add it",
                    self.target.chain_id
                );
                self.provider.add_chain(&self.target).await
            }
            Err(e) => Err(e),
        }
    }

    // Revoke the permission grant; local state is cleared regardless of
    // the revoke outcome
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        trace!("disconnect");
        let revoke_result = self.provider.revoke_permissions().await;

        {
            let mut state = self.state.write().await;
            state.account = None;
            state.chain_id = None;
            state.connecting = false;
        }
        self.propagate_event(SessionEvent::Disconnected).await;

        if let Err(e) = revoke_result {
            warn!("Permission revoke failed, local session cleared anyway: {}", e);
        }
        Ok(())
    }

    // accountsChanged: empty list means the wallet removed our access
    pub async fn handle_accounts_changed(&self, accounts: Vec<Address>) {
        match accounts.first().copied() {
            None => {
                debug!("Wallet removed account access");
                self.state.write().await.account = None;
                self.propagate_event(SessionEvent::Disconnected).await;
            }
            Some(account) => {
                debug!("Active account is now {}", account.to_short_string());
                self.state.write().await.account = Some(account);
                self.propagate_event(SessionEvent::AccountChanged { account })
                    .await;
            }
        }
    }

    // chainChanged updates the chain id only; contract snapshots are not
    // refetched here
    pub async fn handle_chain_changed(&self, chain_id: ChainId) {
        debug!("Wallet switched to chain {}", chain_id);
        self.state.write().await.chain_id = Some(chain_id);
        self.propagate_event(SessionEvent::ChainChanged { chain_id })
            .await;
    }
}
