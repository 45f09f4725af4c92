use thiserror::Error;
use updelegate_common::{abi::AbiError, chain::ChainIdError, crypto::TxHash, rpc::RpcError};

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("No wallet provider is reachable. Install or start a wallet agent to use this application")]
    NoWalletProvider,
    #[error("Contract client is not initialized")]
    Uninitialized,
    #[error("Transaction {} reverted", _0)]
    TransactionReverted(TxHash),
    #[error(transparent)]
    ChainId(#[from] ChainIdError),
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

impl WalletError {
    // The wallet prompt was declined by the user
    pub fn is_user_rejection(&self) -> bool {
        match self {
            WalletError::Rpc(rpc) => rpc
                .as_response_error()
                .map_or(false, |e| e.is_user_rejection()),
            _ => false,
        }
    }

    // The wallet does not know the requested chain yet
    pub fn is_unrecognized_chain(&self) -> bool {
        match self {
            WalletError::Rpc(rpc) => rpc
                .as_response_error()
                .map_or(false, |e| e.is_unrecognized_chain()),
            _ => false,
        }
    }
}
