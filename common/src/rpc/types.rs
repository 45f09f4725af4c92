use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RpcResponseError;

pub const JSON_RPC_VERSION: &str = "2.0";

pub type Id = u64;

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: Id,
    pub method: &'a str,
    pub params: &'a P,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcResponseError>,
}

// Server push without an id; the wallet provider uses these for
// accountsChanged / chainChanged
#[derive(Debug, Clone, Deserialize)]
pub struct RpcNotification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let params = vec!["0x2105"];
        let request = RpcRequest {
            jsonrpc: JSON_RPC_VERSION,
            id: 7,
            method: "wallet_switchEthereumChain",
            params: &params,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 7);
        assert_eq!(json["method"], "wallet_switchEthereumChain");
        assert_eq!(json["params"][0], "0x2105");
    }

    #[test]
    fn test_response_with_error() {
        let response: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected the request"}}"#,
        )
        .unwrap();
        assert_eq!(response.id, Some(1));
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, 4001);
    }

    #[test]
    fn test_notification_deserialization() {
        let notification: RpcNotification = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"chainChanged","params":{"chainId":"0x1"}}"#,
        )
        .unwrap();
        assert_eq!(notification.method, "chainChanged");
        assert_eq!(notification.params["chainId"], "0x1");
    }
}
