//! # JSON-RPC Client
//!
//! Minimal Ethereum JSON-RPC 2.0 client over HTTP. It serves two roles:
//!
//! - [`BalanceReader`] for chain reads (`eth_getBalance`)
//! - [`WalletProvider`] for wallets exposed through a node's RPC endpoint
//!   (a local development node with unlocked accounts answers
//!   `eth_requestAccounts` / `eth_accounts` like an injected wallet would)

use crate::provider::{BalanceReader, ProviderError, WalletProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::utils::parse_quantity;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// Per-request timeout for RPC calls.
const RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC client bound to one endpoint.
pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for `url` with a 10 second request timeout.
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self::with_client(client, url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Perform one JSON-RPC call and return its `result`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        trace!(id, method, url = %self.url, "Sending JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::other(format!("RPC request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::other(format!(
                "RPC request failed with HTTP {}",
                status
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::other(format!("Malformed RPC response: {}", e)))?;

        into_result(method, body)
    }
}

fn into_result(method: &str, body: RpcResponse) -> Result<Value, ProviderError> {
    if let Some(error) = body.error {
        debug!(method, code = error.code, message = %error.message, "JSON-RPC error");
        return Err(ProviderError::new(error.code, error.message));
    }
    Ok(body.result.unwrap_or(Value::Null))
}

#[async_trait]
impl WalletProvider for RpcClient {
    fn kind(&self) -> &'static str {
        "rpc"
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.call(method, params).await
    }
}

#[async_trait]
impl BalanceReader for RpcClient {
    async fn get_balance(&self, address: &str) -> Result<u128, ProviderError> {
        let value = self
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;

        value
            .as_str()
            .and_then(parse_quantity)
            .ok_or_else(|| ProviderError::other(format!("Malformed eth_getBalance result: {}", value)))
    }
}
