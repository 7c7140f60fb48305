//! # Connection Strategies
//!
//! A strategy performs one method-specific handshake and, when it obtains an
//! account, hands it to [`SessionController::complete_connection`]. Strategies
//! never touch connection state any other way.

use crate::controller::SessionController;
use async_trait::async_trait;
use lib_core::ConnectionError;
use shared::dto::wallet::ConnectMethod;

/// How a single attempt ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The account was handed to the controller
    Connected { address: String },
    /// The user backed out before the handshake finished
    Cancelled,
    /// The account was obtained, but a newer identity change won before the
    /// controller committed it
    Superseded,
}

#[async_trait]
pub trait ConnectStrategy: Send + Sync {
    fn method(&self) -> ConnectMethod;

    /// Run one attempt to completion.
    ///
    /// Every failure is returned classified; cancellation is not an error.
    async fn connect(&self, controller: &SessionController) -> Result<ConnectOutcome, ConnectionError>;

    /// Abort the attempt currently in progress, if any.
    fn cancel(&self);
}
