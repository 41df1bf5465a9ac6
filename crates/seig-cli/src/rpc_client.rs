// crates/seig-cli/src/rpc_client.rs
//
// Lightweight JSON-RPC client that POSTs envelopes to the seigd service
// endpoint.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// gRPC service path the daemon mounts its JSON dispatcher under.
pub const SERVICE_PATH: &str = "seig.rpc.SeigService/Call";

/// Mirrors the server's JsonRpcRequest envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub method: String,
    pub params: serde_json::Value,
}

/// Mirrors the server's JsonRpcResponse envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("cannot reach daemon: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("daemon answered HTTP {0}")]
    Http(u16),

    /// The daemon rejected the call.
    #[error("{0}")]
    Remote(String),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client bound to one daemon endpoint.
pub struct RpcClient {
    endpoint: String,
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Full URL calls are posted to.
    pub fn url(&self) -> String {
        format!("{}/{}", self.endpoint, SERVICE_PATH)
    }

    /// Send one call and return its `result`, or the daemon's error text.
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        let request = JsonRpcRequest {
            method: method.to_string(),
            params,
        };

        let resp = self.http.post(self.url()).json(&request).send().await?;
        if !resp.status().is_success() {
            return Err(RpcError::Http(resp.status().as_u16()));
        }

        let envelope: JsonRpcResponse = resp.json().await?;
        unwrap_envelope(envelope)
    }

    /// Like `call`, decoding the result into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn unwrap_envelope(envelope: JsonRpcResponse) -> Result<serde_json::Value, RpcError> {
    if envelope.success {
        Ok(envelope.result.unwrap_or(serde_json::Value::Null))
    } else {
        Err(RpcError::Remote(
            envelope
                .error
                .unwrap_or_else(|| "call failed without an error message".to_string()),
        ))
    }
}
