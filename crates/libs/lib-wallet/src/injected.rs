//! # Injected Provider Strategy
//!
//! Browser-extension style connection: ask the provider for accounts with
//! `eth_requestAccounts` (which prompts the user) and hand the first one to
//! the session controller. Provider error codes are classified on the way
//! out, so a declined prompt surfaces as `UserRejected` and a second prompt
//! while one is open surfaces as `AlreadyPending`.

use crate::controller::SessionController;
use crate::provider::{request_accounts, ProviderHandle};
use crate::strategy::{ConnectOutcome, ConnectStrategy};
use async_trait::async_trait;
use lib_core::ConnectionError;
use shared::dto::wallet::ConnectMethod;
use shared::utils::short_address;
use tracing::{debug, info, warn};

/// Connects through an injected provider, if one was detected.
pub struct InjectedConnector {
    provider: Option<ProviderHandle>,
}

impl InjectedConnector {
    pub fn new(provider: Option<ProviderHandle>) -> Self {
        Self { provider }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Re-adopt an account the wallet already authorised, without prompting.
    ///
    /// Returns the restored address. No provider, no authorised account and
    /// provider failures all give `None`; a failed restore is only logged and
    /// never recorded as a failed connection.
    pub async fn restore(&self, controller: &SessionController) -> Option<String> {
        let provider = self.provider.as_ref()?;

        let accounts = match request_accounts(provider.as_ref(), "eth_accounts").await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(error = %e, "Could not check for an existing wallet session");
                return None;
            }
        };
        let Some(address) = accounts.into_iter().next() else {
            debug!("No previously authorised account");
            return None;
        };

        match controller.complete_connection(&address, provider.clone()).await {
            Ok(completion) if completion.is_committed() => {
                info!(address = %short_address(&address), "Restored wallet session");
                Some(address)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Ignoring unusable restored account");
                None
            }
        }
    }
}

#[async_trait]
impl ConnectStrategy for InjectedConnector {
    fn method(&self) -> ConnectMethod {
        ConnectMethod::Injected
    }

    async fn connect(
        &self,
        controller: &SessionController,
    ) -> Result<ConnectOutcome, ConnectionError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            ConnectionError::unknown(
                "No browser wallet detected. Please install MetaMask or another Web3 wallet.",
            )
        })?;

        debug!(provider = provider.kind(), "Requesting accounts");
        let accounts = request_accounts(provider.as_ref(), "eth_requestAccounts").await?;
        let address = accounts.into_iter().next().ok_or_else(|| {
            ConnectionError::unknown("No accounts found. Please unlock your wallet.")
        })?;

        let completion = controller
            .complete_connection(&address, provider.clone())
            .await?;
        if !completion.is_committed() {
            return Ok(ConnectOutcome::Superseded);
        }
        Ok(ConnectOutcome::Connected { address })
    }

    // The provider prompt cannot be withdrawn once shown
    fn cancel(&self) {}
}
