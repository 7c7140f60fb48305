//! # Wallet Provider Capabilities
//!
//! The connection core never talks to a wallet directly. It is handed
//! capabilities behind these traits:
//!
//! - [`WalletProvider`]: EIP-1193 style `request(method, params)` plus an
//!   optional stream of [`ProviderEvent`]s (`accountsChanged`, `chainChanged`)
//! - [`BalanceReader`]: chain reads used for display
//!
//! Event subscriptions are `tokio::sync::broadcast` receivers: holding the
//! receiver is the subscription, dropping it unsubscribes.

use async_trait::async_trait;
use lib_core::ConnectionError;
use serde_json::{json, Value};
use shared::utils::parse_quantity;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Shared handle to whichever provider produced the connected account.
pub type ProviderHandle = Arc<dyn WalletProvider>;

/// Error returned by a provider request.
///
/// `code` carries the EIP-1193 / JSON-RPC error code when the provider
/// supplied one (4001 user rejected, -32002 request pending, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Failure without a provider code (transport, decoding).
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl From<ProviderError> for ConnectionError {
    fn from(err: ProviderError) -> Self {
        ConnectionError::from_provider(err.code, err.message)
    }
}

/// Notification pushed by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// `accountsChanged`; an empty list means the wallet revoked access
    AccountsChanged(Vec<String>),
    /// `chainChanged`
    ChainChanged(u64),
    /// The provider itself went away (relay session deleted, extension disabled)
    Disconnected,
}

/// EIP-1193 style wallet provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Short label used in logs ("injected", "relay", "rpc").
    fn kind(&self) -> &'static str;

    /// Send a JSON-RPC request through the wallet.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Subscribe to account and chain notifications.
    ///
    /// Providers that never push events return `None`.
    fn events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        None
    }
}

/// Chain-read collaborator used for display values.
#[async_trait]
pub trait BalanceReader: Send + Sync {
    /// Native balance of `address` in the chain's smallest unit.
    async fn get_balance(&self, address: &str) -> Result<u128, ProviderError>;
}

/// Ask the wallet for its accounts.
///
/// `eth_requestAccounts` prompts the user; `eth_accounts` only reports
/// accounts the application is already authorised for.
pub async fn request_accounts(
    provider: &dyn WalletProvider,
    method: &str,
) -> Result<Vec<String>, ProviderError> {
    let value = provider.request(method, json!([])).await?;
    serde_json::from_value::<Vec<String>>(value)
        .map_err(|e| ProviderError::other(format!("Malformed {} response: {}", method, e)))
}

/// Read `eth_chainId`, accepting hex strings, decimal strings or numbers.
pub async fn read_chain_id(provider: &dyn WalletProvider) -> Result<u64, ProviderError> {
    let value = provider.request("eth_chainId", json!([])).await?;
    parse_chain_id(&value)
        .ok_or_else(|| ProviderError::other(format!("Malformed eth_chainId response: {}", value)))
}

pub(crate) fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => parse_quantity(s).and_then(|id| u64::try_from(id).ok()),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
