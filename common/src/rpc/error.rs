use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Provider error: the user declined the wallet prompt
pub const CODE_USER_REJECTED: i64 = 4001;
// Provider error: the requested chain has not been added to the wallet
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;

// Error object carried inside a JSON-RPC response
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("RPC error {}: {}", code, message)]
pub struct RpcResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponseError {
    pub fn is_user_rejection(&self) -> bool {
        self.code == CODE_USER_REJECTED
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == CODE_UNRECOGNIZED_CHAIN
    }
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Connection to the wallet provider is closed")]
    Disconnected,
    #[error(transparent)]
    Response(#[from] RpcResponseError),
    #[error("Invalid JSON: {}", _0)]
    Json(#[from] serde_json::Error),
    #[error("WebSocket error: {}", _0)]
    WebSocket(String),
}

impl RpcError {
    // The response error, if this failure came from the provider itself
    pub fn as_response_error(&self) -> Option<&RpcResponseError> {
        match self {
            RpcError::Response(inner) => Some(inner),
            _ => None,
        }
    }
}

pub type JsonRpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_codes() {
        let rejected = RpcResponseError {
            code: CODE_USER_REJECTED,
            message: "User rejected the request".to_owned(),
            data: None,
        };
        assert!(rejected.is_user_rejection());
        assert!(!rejected.is_unrecognized_chain());

        let unknown_chain = RpcResponseError {
            code: CODE_UNRECOGNIZED_CHAIN,
            message: "Unrecognized chain ID".to_owned(),
            data: None,
        };
        assert!(unknown_chain.is_unrecognized_chain());
    }
}
