//! # Application Shell
//!
//! The [`App`] maps the connection state to the screen shown and drives the
//! connect modal. It never changes connection state itself; every action is
//! forwarded to the [`SessionController`] or to a connection strategy.
//!
//! ## Flow
//!
//! ```text
//! Landing ──open_connect_modal──▶ method choice ──choose_method──▶ attempt task
//!    ▲                                 │  ▲                             │
//!    └─────────── close_modal ─────────┘  └────────── go_back ──────────┤
//!                                                                       ▼
//!                                            Dashboard ◀── Connected snapshot
//! ```
//!
//! Background tasks report to the UI through an `async_channel` of
//! [`AppEvent`]s: every published snapshot, pairing URIs to render as QR
//! codes, and classified failures with their display message.

pub mod events;

pub use events::AppEvent;

use async_channel::{unbounded, Receiver, Sender};
use lib_core::ConnectionError;
use lib_wallet::{ConnectOutcome, ConnectStrategy, InjectedConnector, RemotePairing, SessionController};
use parking_lot::Mutex;
use shared::dto::wallet::{ConnectMethod, ConnectionSnapshot, ConnectionStatus};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Welcome screen with the connect button
    Landing,
    /// Trading dashboard for the connected account
    Dashboard,
}

impl Screen {
    /// Screen for a connection snapshot: the dashboard needs a connected address.
    pub fn for_snapshot(snapshot: &ConnectionSnapshot) -> Self {
        match (snapshot.status, &snapshot.address) {
            (ConnectionStatus::Connected, Some(_)) => Screen::Dashboard,
            _ => Screen::Landing,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Landing => "Welcome to ArmaDEX",
            Screen::Dashboard => "ArmaDEX Dashboard",
        }
    }
}

/// Application shell.
pub struct App {
    controller: SessionController,
    injected: Arc<InjectedConnector>,
    pairing: Option<Arc<RemotePairing>>,
    event_tx: Sender<AppEvent>,
    event_rx: Receiver<AppEvent>,
    attempt: Mutex<Option<JoinHandle<()>>>,
    forwarder: JoinHandle<()>,
    uri_forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    /// Create the shell. Must be called inside a Tokio runtime.
    ///
    /// Without a `pairing` strategy the remote option reports that no relay
    /// transport is configured.
    pub fn new(
        controller: SessionController,
        injected: InjectedConnector,
        pairing: Option<Arc<RemotePairing>>,
    ) -> Self {
        let (event_tx, event_rx) = unbounded();
        let forwarder = forward_snapshots(&controller, event_tx.clone());

        Self {
            controller,
            injected: Arc::new(injected),
            pairing,
            event_tx,
            event_rx,
            attempt: Mutex::new(None),
            forwarder,
            uri_forwarder: Mutex::new(None),
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.controller.snapshot()
    }

    pub fn screen(&self) -> Screen {
        Screen::for_snapshot(&self.controller.snapshot())
    }

    /// Receiver for UI events.
    pub fn events(&self) -> Receiver<AppEvent> {
        self.event_rx.clone()
    }

    /// Which connection methods can be offered.
    pub fn available_methods(&self) -> Vec<ConnectMethod> {
        let mut methods = Vec::with_capacity(2);
        if self.injected.is_available() {
            methods.push(ConnectMethod::Injected);
        }
        methods.push(ConnectMethod::RemotePairing);
        methods
    }

    /// Silently re-adopt a previously authorised wallet at startup.
    pub async fn restore_session(&self) -> Option<String> {
        self.injected.restore(&self.controller).await
    }

    /// Open the method-choice modal.
    pub fn open_connect_modal(&self) -> Result<(), ConnectionError> {
        self.controller.begin_connection().map(|_| ())
    }

    /// Start an attempt with the chosen method in the background.
    ///
    /// A remote pairing attempt is armed before the task is spawned, so
    /// [`close_modal`](Self::close_modal) cancels it even if the task has not
    /// run yet. Use [`wait_for_attempt`](Self::wait_for_attempt) to await it.
    pub fn choose_method(&self, method: ConnectMethod) {
        info!(method = method.name(), "Connection method chosen");

        let strategy: Arc<dyn ConnectStrategy> = match method {
            ConnectMethod::Injected => self.injected.clone(),
            ConnectMethod::RemotePairing => match &self.pairing {
                Some(pairing) => {
                    pairing.reset();
                    pairing.arm();
                    let uris = forward_pairing_uri(pairing, self.event_tx.clone());
                    if let Some(previous) = self.uri_forwarder.lock().replace(uris) {
                        previous.abort();
                    }
                    pairing.clone()
                }
                None => {
                    let err = ConnectionError::network_unavailable("No relay transport configured");
                    warn!(error = %err, "Remote pairing unavailable");
                    self.controller.record_failure(&err);
                    let _ = self.event_tx.try_send(failure_event(&err));
                    return;
                }
            },
        };

        let controller = self.controller.clone();
        let event_tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            let event = match controller.connect_with(strategy.as_ref()).await {
                // A superseded attempt needs no event; the newer state is published
                Ok(ConnectOutcome::Connected { .. }) | Ok(ConnectOutcome::Superseded) => None,
                Ok(ConnectOutcome::Cancelled) => Some(AppEvent::AttemptCancelled),
                Err(err) => Some(failure_event(&err)),
            };
            if let Some(event) = event {
                let _ = event_tx.send(event).await;
            }
        });

        if let Some(previous) = self.attempt.lock().replace(handle) {
            debug!(finished = previous.is_finished(), "Replacing attempt handle");
        }
    }

    /// Wait for the attempt started by [`choose_method`](Self::choose_method).
    pub async fn wait_for_attempt(&self) {
        let handle = self.attempt.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Connection attempt task failed");
            }
        }
    }

    /// Leave the QR view and return to the method choice.
    pub fn go_back(&self) {
        self.cancel_attempt();
        if self.controller.status() == ConnectionStatus::Failed {
            self.controller.dismiss();
            if let Err(e) = self.controller.begin_connection() {
                debug!(error = %e, "Could not reopen method choice");
            }
        }
    }

    /// Close the modal, cancelling any attempt in progress.
    pub fn close_modal(&self) {
        self.cancel_attempt();
        self.controller.dismiss();
    }

    pub fn disconnect(&self) {
        self.controller.disconnect();
    }

    fn cancel_attempt(&self) {
        if let Some(pairing) = &self.pairing {
            pairing.cancel();
        }
        self.injected.cancel();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.forwarder.abort();
        if let Some(uris) = self.uri_forwarder.lock().take() {
            uris.abort();
        }
        self.controller.shutdown();
    }
}

fn failure_event(err: &ConnectionError) -> AppEvent {
    AppEvent::ConnectionFailed {
        category: err.category(),
        message: err.user_message(),
    }
}

/// Forward every published snapshot to the UI.
fn forward_snapshots(controller: &SessionController, event_tx: Sender<AppEvent>) -> JoinHandle<()> {
    let mut updates = controller.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if event_tx.send(AppEvent::ConnectionChanged(snapshot)).await.is_err() {
                break;
            }
        }
    })
}

/// Forward the pairing URI of the next attempt, once.
fn forward_pairing_uri(pairing: &RemotePairing, event_tx: Sender<AppEvent>) -> JoinHandle<()> {
    let mut states = pairing.subscribe();
    tokio::spawn(async move {
        let mut shown = false;
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            if let (false, Some(uri)) = (shown, state.uri()) {
                shown = true;
                if event_tx.send(AppEvent::PairingUri(uri.to_string())).await.is_err() {
                    break;
                }
            }
            if state.is_terminal() {
                break;
            }
        }
    })
}
