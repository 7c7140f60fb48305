//! Relay service collaborator.
//!
//! A relay brokers a session between this application and a wallet running on
//! another device. The pairing strategy only sees these traits; the transport
//! behind them is supplied by the host application.

use crate::provider::ProviderHandle;
use async_trait::async_trait;
use lib_core::{AppMetadata, ConnectionError, ProjectId};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Error thrown by the relay transport. Carries no code, only a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RelayError {
    pub message: String,
}

impl RelayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<RelayError> for ConnectionError {
    fn from(err: RelayError) -> Self {
        ConnectionError::classify(err.message)
    }
}

/// Parameters for opening a relay session.
#[derive(Debug, Clone)]
pub struct RelayInit {
    pub project_id: ProjectId,
    /// Chains the peer must support
    pub chains: Vec<u64>,
    pub metadata: AppMetadata,
    /// Whether the relay should render its own QR modal; the application
    /// renders the pairing URI itself
    pub show_qr_modal: bool,
}

/// Notification emitted by a relay session.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// `display_uri`: pairing URI to show the user
    DisplayUri(String),
    /// `connect`: the peer approved
    Connect { accounts: Vec<String> },
    /// `disconnect`
    Disconnect,
    /// `session_event`: informational
    SessionEvent(Value),
    /// `session_delete`: the peer ended the session
    SessionDelete,
}

#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Open a new session. Each call must return a fresh session.
    async fn init(&self, init: &RelayInit) -> Result<Arc<dyn RelaySession>, RelayError>;
}

#[async_trait]
pub trait RelaySession: Send + Sync {
    /// Subscribe to session notifications.
    fn events(&self) -> broadcast::Receiver<RelayEvent>;

    /// Start pairing. Resolves with the approved accounts once the peer
    /// approves.
    async fn enable(&self) -> Result<Vec<String>, RelayError>;

    /// Close the session.
    async fn disconnect(&self) -> Result<(), RelayError>;

    /// Provider handle used to talk to the paired wallet.
    fn provider(self: Arc<Self>) -> ProviderHandle;
}
