//! # Remote Pairing
//!
//! Out-of-band pairing through a relay service: open a session, show the
//! pairing URI (as a QR code), wait for the remote wallet to approve, then
//! hand the first approved account to the session controller.
//!
//! ## State Machine
//!
//! ```text
//! Idle → Initializing → AwaitingUri → UriReady → AwaitingPeerApproval → Paired
//!              │              │           │                │
//!              └──────────────┴───────────┴────────────────┴──→ Failed / Cancelled
//! ```
//!
//! The relay notifications, the completion of `enable()`, the timer and the
//! user's cancel request are raced in one `select!` loop, so whichever arrives
//! first decides the transition. Anything arriving after that is dropped
//! together with the event receiver.
//!
//! ## Teardown
//!
//! A session whose account the controller did not adopt is closed exactly
//! once, including when a newer identity change superseded it. Close errors
//! are logged and never change the outcome. If the attempt future is dropped
//! mid-flight the session is closed from a background task.

mod relay;

#[cfg(test)]
mod tests;

pub use relay::{RelayClient, RelayError, RelayEvent, RelayInit, RelaySession};

use crate::controller::SessionController;
use crate::strategy::{ConnectOutcome, ConnectStrategy};
use async_trait::async_trait;
use lib_core::{AppMetadata, Config, ConnectionError, ProjectId};
use parking_lot::Mutex;
use shared::dto::wallet::ConnectMethod;
use shared::utils::short_address;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Options for remote pairing attempts.
#[derive(Debug, Clone)]
pub struct PairingOptions {
    /// Raw pairing-service identifier, validated at the start of each attempt
    pub project_id: Option<String>,
    pub chains: Vec<u64>,
    pub metadata: AppMetadata,
    /// Time allowed for the relay to produce a pairing URI
    pub uri_timeout: Duration,
    /// Time allowed for the peer to approve once the URI is shown
    pub approval_timeout: Option<Duration>,
}

impl PairingOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            project_id: config.project_id.clone(),
            chains: vec![config.chain_id],
            metadata: config.metadata.clone(),
            uri_timeout: config.pairing_timeout,
            approval_timeout: config.approval_timeout,
        }
    }
}

impl Default for PairingOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Observable state of the pairing flow.
#[derive(Debug, Clone, PartialEq)]
pub enum PairingState {
    Idle,
    Initializing,
    AwaitingUri,
    UriReady { uri: String },
    AwaitingPeerApproval { uri: String },
    Paired { address: String },
    Failed(ConnectionError),
    Cancelled,
}

impl PairingState {
    /// Pairing URI to display, if one has been produced.
    pub fn uri(&self) -> Option<&str> {
        match self {
            PairingState::UriReady { uri } | PairingState::AwaitingPeerApproval { uri } => {
                Some(uri)
            }
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PairingState::Paired { .. } | PairingState::Failed(_) | PairingState::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Deadline {
    Uri,
    Approval,
}

impl Deadline {
    fn expired(self) -> ConnectionError {
        match self {
            Deadline::Uri => ConnectionError::timeout(
                "Connection timeout. WalletConnect did not generate a pairing URI.",
            ),
            Deadline::Approval => {
                ConnectionError::timeout("Connection timeout. The wallet did not approve in time.")
            }
        }
    }
}

/// Remote pairing strategy.
///
/// One instance serves any number of sequential attempts; each attempt opens
/// a new relay session and starts its own timer.
pub struct RemotePairing {
    relay: Arc<dyn RelayClient>,
    options: PairingOptions,
    state: watch::Sender<PairingState>,
    armed: Mutex<Option<CancellationToken>>,
    active: Mutex<Option<CancellationToken>>,
}

impl RemotePairing {
    pub fn new(relay: Arc<dyn RelayClient>, options: PairingOptions) -> Self {
        let (state, _) = watch::channel(PairingState::Idle);
        Self {
            relay,
            options,
            state,
            armed: Mutex::new(None),
            active: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &PairingOptions {
        &self.options
    }

    pub fn state(&self) -> PairingState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PairingState> {
        self.state.subscribe()
    }

    /// Prepare the next attempt before it is spawned.
    ///
    /// A [`cancel`](Self::cancel) issued between this call and the start of
    /// the attempt is not lost: the attempt starts already cancelled.
    pub fn arm(&self) {
        *self.armed.lock() = Some(CancellationToken::new());
    }

    /// Request cancellation of the running or armed attempt.
    ///
    /// The attempt stops its timer, closes its session and ends in
    /// `Cancelled`. Does nothing when no attempt is running or armed.
    pub fn cancel(&self) {
        if let Some(token) = self.armed.lock().as_ref() {
            debug!("Cancelling armed pairing attempt");
            token.cancel();
        }
        if let Some(token) = self.active.lock().as_ref() {
            debug!("Cancelling pairing attempt");
            token.cancel();
        }
    }

    /// Return to `Idle` after a finished attempt.
    pub fn reset(&self) {
        if self.active.lock().is_none() {
            self.transition(PairingState::Idle);
        }
    }

    /// Run one pairing attempt.
    ///
    /// Returns `Ok(Cancelled)` when the user backed out, `Ok(Superseded)`
    /// when a newer identity change won over the paired account, and the
    /// classified error on failure. On success the controller holds the
    /// paired account.
    pub async fn pair(
        &self,
        controller: &SessionController,
    ) -> Result<ConnectOutcome, ConnectionError> {
        let attempt = self.start_attempt()?;

        let result = self.run(controller, &attempt.token).await;
        match &result {
            Ok(ConnectOutcome::Connected { .. }) => {}
            Ok(ConnectOutcome::Cancelled) => {
                info!("Pairing cancelled");
                self.transition(PairingState::Cancelled);
            }
            Ok(ConnectOutcome::Superseded) => {
                info!("Pairing superseded, session closed");
                self.transition(PairingState::Cancelled);
            }
            Err(err) => {
                warn!(category = %err.category(), error = %err.message(), "Pairing failed");
                self.transition(PairingState::Failed(err.clone()));
            }
        }
        result
    }

    fn start_attempt(&self) -> Result<ActiveAttempt<'_>, ConnectionError> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(ConnectionError::already_pending(
                "A pairing attempt is already in progress",
            ));
        }
        let token = self.armed.lock().take().unwrap_or_default();
        *active = Some(token.clone());
        Ok(ActiveAttempt {
            slot: &self.active,
            token,
        })
    }

    async fn run(
        &self,
        controller: &SessionController,
        cancel: &CancellationToken,
    ) -> Result<ConnectOutcome, ConnectionError> {
        if cancel.is_cancelled() {
            return Ok(ConnectOutcome::Cancelled);
        }
        self.transition(PairingState::Initializing);
        let project_id = ProjectId::parse(self.options.project_id.as_deref())?;

        let init = RelayInit {
            project_id,
            chains: self.options.chains.clone(),
            metadata: self.options.metadata.clone(),
            show_qr_modal: false,
        };
        debug!(project_id = ?init.project_id, chains = ?init.chains, "Initializing relay session");

        let uri_deadline = Instant::now() + self.options.uri_timeout;
        let session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(ConnectOutcome::Cancelled),
            _ = time::sleep_until(uri_deadline) => return Err(Deadline::Uri.expired()),
            result = self.relay.init(&init) => result?,
        };

        // Subscribe before enable() so an early display_uri is not missed
        let mut events = session.events();
        let mut guard = SessionGuard::new(session.clone());
        self.transition(PairingState::AwaitingUri);

        let mut enable = session.enable();
        let mut enable_done = false;
        let mut deadline = Some((Deadline::Uri, uri_deadline));
        let mut uri: Option<String> = None;

        let address = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    guard.teardown().await;
                    return Ok(ConnectOutcome::Cancelled);
                }
                _ = expire(deadline.map(|(_, at)| at)) => {
                    let kind = deadline.map_or(Deadline::Uri, |(kind, _)| kind);
                    guard.teardown().await;
                    return Err(kind.expired());
                }
                event = events.recv() => match event {
                    Ok(RelayEvent::DisplayUri(next)) => {
                        if uri.is_some() {
                            debug!("Ignoring repeated pairing URI");
                            continue;
                        }
                        info!("Pairing URI ready");
                        deadline = self
                            .options
                            .approval_timeout
                            .map(|window| (Deadline::Approval, Instant::now() + window));
                        self.transition(PairingState::UriReady { uri: next.clone() });
                        self.transition(PairingState::AwaitingPeerApproval { uri: next.clone() });
                        uri = Some(next);
                    }
                    Ok(RelayEvent::Connect { accounts }) => match accounts.into_iter().next() {
                        Some(address) => break address,
                        None => warn!("Relay reported a connection without accounts"),
                    },
                    Ok(RelayEvent::SessionEvent(payload)) => {
                        debug!(%payload, "Relay session event");
                    }
                    Ok(RelayEvent::Disconnect) | Ok(RelayEvent::SessionDelete) => {
                        guard.release();
                        return Err(ConnectionError::network_unavailable(
                            "Relay session ended before the wallet approved",
                        ));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Relay events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        guard.release();
                        return Err(ConnectionError::network_unavailable(
                            "Relay event stream closed before the wallet approved",
                        ));
                    }
                },
                result = &mut enable, if !enable_done => {
                    enable_done = true;
                    match result {
                        Ok(accounts) => match accounts.into_iter().next() {
                            Some(address) => break address,
                            None => warn!("Relay enable() returned no accounts"),
                        },
                        Err(err) => {
                            guard.teardown().await;
                            return Err(err.into());
                        }
                    }
                }
            }
        };
        drop(enable);

        info!(address = %short_address(&address), "Wallet approved pairing");
        self.transition(PairingState::Paired {
            address: address.clone(),
        });

        match controller
            .complete_connection(&address, session.clone().provider())
            .await
        {
            Ok(completion) if completion.is_committed() => {
                guard.release();
                Ok(ConnectOutcome::Connected { address })
            }
            Ok(_) => {
                guard.teardown().await;
                Ok(ConnectOutcome::Superseded)
            }
            Err(err) => {
                guard.teardown().await;
                Err(err)
            }
        }
    }

    fn transition(&self, next: PairingState) {
        debug!(state = ?next, "Pairing state");
        self.state.send_replace(next);
    }
}

#[async_trait]
impl ConnectStrategy for RemotePairing {
    fn method(&self) -> ConnectMethod {
        ConnectMethod::RemotePairing
    }

    async fn connect(
        &self,
        controller: &SessionController,
    ) -> Result<ConnectOutcome, ConnectionError> {
        self.pair(controller).await
    }

    fn cancel(&self) {
        RemotePairing::cancel(self);
    }
}

/// Marks an attempt as running; clears the slot when the attempt ends.
struct ActiveAttempt<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
    token: CancellationToken,
}

impl Drop for ActiveAttempt<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

/// Closes a relay session at most once.
struct SessionGuard {
    session: Option<Arc<dyn RelaySession>>,
}

impl SessionGuard {
    fn new(session: Arc<dyn RelaySession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    async fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            close_session(session.as_ref()).await;
        }
    }

    /// Keep the session open (paired) or skip closing it (already closed by the peer).
    fn release(&mut self) {
        self.session = None;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { close_session(session.as_ref()).await });
            }
            Err(_) => warn!("No runtime to close abandoned relay session"),
        }
    }
}

async fn close_session(session: &dyn RelaySession) {
    match session.disconnect().await {
        Ok(()) => debug!("Relay session closed"),
        Err(e) => warn!(error = %e, "Failed to close relay session"),
    }
}

async fn expire(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
