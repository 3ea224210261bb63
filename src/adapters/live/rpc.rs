//! JSON-RPC 2.0 client shared by the live wallet and ledger adapters.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Error code wallets use when the user declines a request.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Failures talking to the JSON-RPC endpoint.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RpcError {
    /// The endpoint could not be reached or answered with a non-2xx status.
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the endpoint.
        message: String,
    },
    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl RpcError {
    /// Returns `true` when the user declined the request.
    #[must_use]
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::Remote { code, .. } if *code == USER_REJECTED_CODE)
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Sends JSON-RPC requests over HTTP.
pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client for the given endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: Client::new(), url: url.into(), next_id: AtomicU64::new(1) }
    }

    /// Calls `method` with `params` and decodes the `result` member.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the endpoint returns an error
    /// object, or the result cannot be decoded as `T`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "json-rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&RpcRequest { jsonrpc: "2.0", id, method, params })
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("{method} request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(format!("failed to read {method} response: {e}")))?;

        if !status.is_success() {
            return Err(RpcError::Transport(format!("{method} returned HTTP {}: {text}", status.as_u16())));
        }

        decode_response(&text)
    }
}

/// Decodes a JSON-RPC response body.
fn decode_response<T: DeserializeOwned>(text: &str) -> Result<T, RpcError> {
    let response: RpcResponse =
        serde_json::from_str(text).map_err(|e| RpcError::Decode(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(RpcError::Remote { code: error.code, message: error.message });
    }

    serde_json::from_value(response.result.unwrap_or(Value::Null))
        .map_err(|e| RpcError::Decode(e.to_string()))
}
