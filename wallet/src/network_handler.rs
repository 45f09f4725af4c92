//! Bridges wallet provider notifications onto the session.
//!
//! Subscriptions are registered when the handler starts and the dispatch
//! task is aborted on teardown; all events land on the same session
//! state machine, single dispatcher, no concurrent handlers.

use std::sync::Arc;

use log::{trace, warn};
use thiserror::Error;
use tokio::{
    select,
    sync::Mutex,
    task::{JoinError, JoinHandle},
};
use updelegate_common::{chain::parse_chain_id, utils::spawn_task};

use crate::{error::WalletError, session::SharedSession};

// NetworkHandler must be behind a Arc to be accessed from the CLI (to stop it) or from tokio task
pub type SharedNetworkHandler = Arc<NetworkHandler>;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("event handler is already running")]
    AlreadyRunning,
    #[error(transparent)]
    TaskError(#[from] JoinError),
    #[error(transparent)]
    WalletError(#[from] WalletError),
}

pub struct NetworkHandler {
    // tokio task
    task: Mutex<Option<JoinHandle<Result<(), WalletError>>>>,
    // session for event dispatch
    session: SharedSession,
}

impl NetworkHandler {
    pub fn new(session: SharedSession) -> SharedNetworkHandler {
        Arc::new(Self {
            task: Mutex::new(None),
            session,
        })
    }

    pub async fn start(self: &Arc<Self>) -> Result<(), NetworkError> {
        trace!("Starting wallet event handler");

        if self.is_running().await {
            return Err(NetworkError::AlreadyRunning);
        }

        let provider = self.session.get_provider();
        let mut on_accounts_changed = provider.on_accounts_changed().await?;
        let mut on_chain_changed = provider.on_chain_changed().await?;

        let zelf = Arc::clone(self);
        *self.task.lock().await = Some(spawn_task("wallet-events", async move {
            loop {
                select! {
                    biased;
                    res = on_accounts_changed.recv() => {
                        trace!("accountsChanged");
                        let event = res.map_err(WalletError::Rpc)?;
                        zelf.session.handle_accounts_changed(event.accounts).await;
                    },
                    res = on_chain_changed.recv() => {
                        trace!("chainChanged");
                        let event = res.map_err(WalletError::Rpc)?;
                        match parse_chain_id(&event.chain_id) {
                            Ok(chain_id) => zelf.session.handle_chain_changed(chain_id).await,
                            Err(e) => warn!("Invalid chain id in event: {}", e),
                        }
                    }
                }
            }
        }));

        Ok(())
    }

    // Stop the dispatch task; subscriptions die with it
    pub async fn stop(&self) -> Result<(), NetworkError> {
        trace!("Stopping wallet event handler");
        if let Some(handle) = self.task.lock().await.take() {
            if handle.is_finished() {
                handle.await??;
            } else {
                handle.abort();
            }
        }
        Ok(())
    }

    // check if the event handler is running (that we have a task and its not finished)
    pub async fn is_running(&self) -> bool {
        let task = self.task.lock().await;
        if let Some(handle) = task.as_ref() {
            !handle.is_finished()
        } else {
            false
        }
    }
}
