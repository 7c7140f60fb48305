//! # Wallet Connection DTOs
//!
//! Plain-data view of the wallet connection: where the connection lifecycle
//! stands, which account is connected, and why the last attempt failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of the single application-wide wallet connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No wallet connected, nothing in progress
    Idle,
    /// The method-choice dialog is open
    AwaitingMethodChoice,
    /// An account has been handed over and chain details are being read
    Connecting,
    /// A wallet is connected
    Connected,
    /// The last attempt failed; see [`ConnectionSnapshot::error`]
    Failed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::AwaitingMethodChoice => "awaiting_method_choice",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing category of a failed connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The human declined the request in their wallet
    UserRejected,
    /// The wallet already has a connection request outstanding
    AlreadyPending,
    /// The pairing-service identifier is missing or malformed
    InvalidConfiguration,
    /// Relay or RPC communication failed
    NetworkUnavailable,
    /// Nothing happened within the allowed window
    Timeout,
    /// Anything else
    Unknown,
}

impl ErrorCategory {
    /// Message shown to the user for this category.
    pub fn headline(&self) -> &'static str {
        match self {
            ErrorCategory::UserRejected => {
                "Connection rejected. Please approve the connection request in your wallet."
            }
            ErrorCategory::AlreadyPending => {
                "Connection request already pending. Please check your wallet."
            }
            ErrorCategory::InvalidConfiguration => {
                "Invalid WalletConnect Project ID. Please check your .env file and restart."
            }
            ErrorCategory::NetworkUnavailable => {
                "Network error: unable to reach the wallet service. Please check your internet connection and try again."
            }
            ErrorCategory::Timeout => "Connection timeout. Please try again.",
            ErrorCategory::Unknown => "Connection error.",
        }
    }

    /// Whether offering a "try again" action makes sense.
    ///
    /// Configuration problems and outstanding wallet prompts are not fixed by
    /// retrying from the application.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::NetworkUnavailable | ErrorCategory::Timeout | ErrorCategory::Unknown
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::UserRejected => "user_rejected",
            ErrorCategory::AlreadyPending => "already_pending",
            ErrorCategory::InvalidConfiguration => "invalid_configuration",
            ErrorCategory::NetworkUnavailable => "network_unavailable",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Serializable record of why the connection is in [`ConnectionStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionFailure {
    pub category: ErrorCategory,
    pub message: String,
}

/// How the user chose to connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectMethod {
    /// Browser-extension style wallet exposing `request({method, params})`
    Injected,
    /// Mobile wallet paired through a relay by scanning a QR code
    RemotePairing,
}

impl ConnectMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectMethod::Injected => "Browser Wallet",
            ConnectMethod::RemotePairing => "WalletConnect",
        }
    }
}

/// Provider-free copy of the connection state, published after every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chain_id: Option<u64>,

    /// Native balance in the chain's smallest unit (wei)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub balance: Option<u128>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub connected_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ConnectionFailure>,
}

impl ConnectionSnapshot {
    pub fn idle() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            address: None,
            chain_id: None,
            balance: None,
            connected_at: None,
            error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
