//! # Connection Session Controller
//!
//! Single authority for "am I connected, to whom, on which chain".
//!
//! The controller owns the one [`ConnectionState`] of the application. UI code
//! and strategies hold a cheap clone of [`SessionController`] and change the
//! state only through its operations:
//!
//! - [`begin_connection`](SessionController::begin_connection) - open method choice
//! - [`connect_with`](SessionController::connect_with) - run one strategy attempt
//! - [`complete_connection`](SessionController::complete_connection) - adopt an account
//! - [`disconnect`](SessionController::disconnect) - back to idle, always succeeds
//! - [`dismiss`](SessionController::dismiss) - close method choice / acknowledge failure
//!
//! Every change is published as a [`ConnectionSnapshot`] on a `watch` channel.
//!
//! ## Provider Notifications
//!
//! After a successful connection the controller subscribes to the provider's
//! events. An empty `accountsChanged` disconnects, a non-empty one re-runs
//! `complete_connection` with the new primary account, `chainChanged` updates
//! the chain and refreshes the balance. The subscription task is aborted as
//! soon as `complete_connection` starts adopting a different provider, on
//! disconnect, and when the last controller handle is dropped, so a stale
//! provider can never write to the state.
//!
//! ## Ordering
//!
//! Every identity change bumps an epoch counter. `complete_connection` reads
//! chain id and balance without holding the lock and only commits if no newer
//! change (another `complete_connection`, a `disconnect`) happened meanwhile:
//! the last caller wins. The loser gets [`Completion::Superseded`] so a
//! strategy can release what it opened for that account.

use crate::provider::{read_chain_id, BalanceReader, ProviderEvent, ProviderHandle};
use crate::strategy::{ConnectOutcome, ConnectStrategy};
use chrono::{DateTime, Utc};
use lib_core::ConnectionError;
use lib_utils::validation;
use parking_lot::{Mutex, RwLock};
use shared::dto::wallet::{ConnectionSnapshot, ConnectionStatus};
use shared::utils::short_address;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;


/// The application-wide connection state.
///
/// Invariants: `address`, `balance` and `connected_at` are present iff
/// `status == Connected`; `last_error` is present iff `status == Failed`.
#[derive(Clone)]
pub struct ConnectionState {
    status: ConnectionStatus,
    address: Option<String>,
    chain_id: Option<u64>,
    balance: Option<u128>,
    connected_at: Option<DateTime<Utc>>,
    last_error: Option<ConnectionError>,
    provider: Option<ProviderHandle>,
}

impl ConnectionState {
    fn idle() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            address: None,
            chain_id: None,
            balance: None,
            connected_at: None,
            last_error: None,
            provider: None,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn provider(&self) -> Option<&ProviderHandle> {
        self.provider.as_ref()
    }

    pub fn last_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            status: self.status,
            address: self.address.clone(),
            chain_id: self.chain_id,
            balance: self.balance,
            connected_at: self.connected_at,
            error: self.last_error.as_ref().map(ConnectionError::to_failure),
        }
    }
}

/// How a [`SessionController::complete_connection`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The account is now the connected identity
    Committed(ConnectionSnapshot),
    /// A newer change landed during the reads; the snapshot is that newer state
    Superseded(ConnectionSnapshot),
}

impl Completion {
    pub fn is_committed(&self) -> bool {
        matches!(self, Completion::Committed(_))
    }

    pub fn snapshot(&self) -> &ConnectionSnapshot {
        match self {
            Completion::Committed(snapshot) | Completion::Superseded(snapshot) => snapshot,
        }
    }

    pub fn into_snapshot(self) -> ConnectionSnapshot {
        match self {
            Completion::Committed(snapshot) | Completion::Superseded(snapshot) => snapshot,
        }
    }
}

/// Live subscription to one provider's events.
struct ProviderWatch {
    provider: ProviderHandle,
    task: JoinHandle<()>,
}

impl Drop for ProviderWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Inner {
    state: RwLock<ConnectionState>,
    epoch: AtomicU64,
    in_flight: AtomicBool,
    watch: Mutex<Option<ProviderWatch>>,
    balances: Option<Arc<dyn BalanceReader>>,
    default_chain_id: u64,
    updates: watch::Sender<ConnectionSnapshot>,
}

/// Clears the single-flight flag when an attempt ends, however it ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to the connection session. Clones share the same state.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Create a controller.
    ///
    /// `default_chain_id` is recorded when a provider cannot report its chain;
    /// without a `balances` reader every connection shows a zero balance.
    pub fn new(default_chain_id: u64, balances: Option<Arc<dyn BalanceReader>>) -> Self {
        let (updates, _) = watch::channel(ConnectionSnapshot::idle());
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(ConnectionState::idle()),
                epoch: AtomicU64::new(0),
                in_flight: AtomicBool::new(false),
                watch: Mutex::new(None),
                balances,
                default_chain_id,
                updates,
            }),
        }
    }

    /// Current state as plain data.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.inner.state.read().snapshot()
    }

    /// Clone of the full state, including the provider handle.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.read().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.read().status
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn address(&self) -> Option<String> {
        self.inner.state.read().address.clone()
    }

    pub fn provider(&self) -> Option<ProviderHandle> {
        self.inner.state.read().provider.clone()
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Whether a strategy attempt is running.
    pub fn attempt_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Open the method-choice step.
    ///
    /// Fails with `AlreadyPending` while an attempt is running. When a wallet
    /// is already connected the identity is kept; a new attempt will replace
    /// it only once it succeeds.
    pub fn begin_connection(&self) -> Result<ConnectionSnapshot, ConnectionError> {
        if self.attempt_in_flight() {
            return Err(ConnectionError::already_pending(
                "A connection attempt is already in progress",
            ));
        }

        self.update(|state| match state.status {
            ConnectionStatus::Connecting => Err(ConnectionError::already_pending(
                "A connection attempt is already in progress",
            )),
            ConnectionStatus::Connected => Ok(()),
            _ => {
                state.status = ConnectionStatus::AwaitingMethodChoice;
                state.last_error = None;
                Ok(())
            }
        })
    }

    /// Close the method-choice step or acknowledge a failure.
    pub fn dismiss(&self) -> ConnectionSnapshot {
        self.update(|state| {
            if matches!(
                state.status,
                ConnectionStatus::AwaitingMethodChoice | ConnectionStatus::Failed
            ) {
                state.status = ConnectionStatus::Idle;
                state.last_error = None;
            }
            Ok::<(), ConnectionError>(())
        })
        .unwrap_or_else(|_| self.snapshot())
    }

    /// Run one strategy attempt under the single-flight guard.
    ///
    /// A failure is recorded as `Failed` unless a wallet is connected (the
    /// existing connection survives a failed replacement attempt) or a newer
    /// identity change is already being applied.
    pub async fn connect_with(
        &self,
        strategy: &dyn ConnectStrategy,
    ) -> Result<ConnectOutcome, ConnectionError> {
        let _flight = FlightGuard::acquire(&self.inner.in_flight).ok_or_else(|| {
            ConnectionError::already_pending("A connection attempt is already in progress")
        })?;

        let method = strategy.method();
        let span = info_span!("connect", attempt = %Uuid::new_v4(), method = method.name());

        async move {
            info!("Starting connection attempt");
            match strategy.connect(self).await {
                Ok(ConnectOutcome::Connected { address }) => {
                    info!(address = %short_address(&address), "Connection attempt succeeded");
                    Ok(ConnectOutcome::Connected { address })
                }
                Ok(ConnectOutcome::Cancelled) => {
                    info!("Connection attempt cancelled");
                    Ok(ConnectOutcome::Cancelled)
                }
                Ok(ConnectOutcome::Superseded) => {
                    info!("Connection attempt superseded by a newer change");
                    Ok(ConnectOutcome::Superseded)
                }
                Err(err) => {
                    warn!(category = %err.category(), error = %err.message(), "Connection attempt failed");
                    self.record_failure(&err);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Adopt `address` from `provider` as the connected identity.
    ///
    /// Reads the chain id from the provider and the balance from the chain
    /// reader; either read may fail independently and falls back to the
    /// default chain id / zero balance. Calling this while connected replaces
    /// the previous identity; a different provider is unsubscribed before the
    /// reads start.
    ///
    /// An invalid address leaves the state untouched and returns the error.
    /// If a newer change lands while the reads are in flight, this call does
    /// not commit and returns [`Completion::Superseded`].
    pub async fn complete_connection(
        &self,
        address: &str,
        provider: ProviderHandle,
    ) -> Result<Completion, ConnectionError> {
        let address = validate_address(address)?;
        let epoch = self.inner.epoch.fetch_add(1, Ordering::AcqRel) + 1;

        {
            let mut state = self.inner.state.write();
            if let Some(previous) = state.address.as_deref().filter(|prev| *prev != address) {
                // Overwrite without confirmation, as provider account switches expect
                warn!(
                    previous = %short_address(previous),
                    next = %short_address(&address),
                    "Replacing connected identity"
                );
            }
            state.status = ConnectionStatus::Connecting;
            state.address = None;
            state.balance = None;
            state.connected_at = None;
            state.last_error = None;
            if state
                .provider
                .as_ref()
                .is_some_and(|active| !same_provider(active, &provider))
            {
                state.provider = None;
            }
            let snapshot = state.snapshot();
            drop(state);
            self.unwatch_other(&provider);
            self.inner.updates.send_replace(snapshot);
        }
        debug!(address = %short_address(&address), provider = provider.kind(), "Reading chain details");

        let chain_id = match read_chain_id(provider.as_ref()).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, fallback = self.inner.default_chain_id, "Could not read chain id, using default");
                self.inner.default_chain_id
            }
        };
        let balance = self.read_balance(&address).await;

        {
            let mut state = self.inner.state.write();
            if self.inner.epoch.load(Ordering::Acquire) != epoch {
                debug!(address = %short_address(&address), "Connection superseded before commit");
                return Ok(Completion::Superseded(state.snapshot()));
            }
            state.status = ConnectionStatus::Connected;
            state.address = Some(address.clone());
            state.chain_id = Some(chain_id);
            state.balance = Some(balance);
            state.connected_at = Some(Utc::now());
            state.last_error = None;
            state.provider = Some(provider.clone());
        }
        self.watch_provider(&provider);

        let snapshot = self.publish();
        info!(
            address = %short_address(&address),
            chain_id,
            provider = provider.kind(),
            "Wallet connected"
        );
        Ok(Completion::Committed(snapshot))
    }

    /// Reset to `Idle`, clearing address, chain and provider.
    pub fn disconnect(&self) -> ConnectionSnapshot {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        let was = {
            let mut state = self.inner.state.write();
            std::mem::replace(&mut *state, ConnectionState::idle())
        };
        self.inner.watch.lock().take();

        if let Some(address) = was.address.as_deref() {
            info!(address = %short_address(address), "Wallet disconnected");
        }
        self.publish()
    }

    /// Stop listening to the active provider.
    ///
    /// Also happens automatically when the last handle is dropped.
    pub fn shutdown(&self) {
        self.inner.watch.lock().take();
    }

    /// Surface a failure that happened outside a strategy attempt.
    ///
    /// Ignored while connected or while an identity is being applied.
    pub fn record_failure(&self, err: &ConnectionError) {
        let _ = self.update(|state| {
            match state.status {
                ConnectionStatus::Idle
                | ConnectionStatus::AwaitingMethodChoice
                | ConnectionStatus::Failed => {
                    state.status = ConnectionStatus::Failed;
                    state.last_error = Some(err.clone());
                }
                ConnectionStatus::Connected | ConnectionStatus::Connecting => {
                    debug!(status = %state.status, "Keeping current state after failed attempt");
                }
            }
            Ok::<(), ConnectionError>(())
        });
    }

    async fn apply_chain_change(&self, chain_id: u64) {
        let (epoch, address) = {
            let mut state = self.inner.state.write();
            if state.status != ConnectionStatus::Connected {
                return;
            }
            state.chain_id = Some(chain_id);
            (self.inner.epoch.load(Ordering::Acquire), state.address.clone())
        };
        self.publish();
        info!(chain_id, "Chain changed");

        let Some(address) = address else { return };
        let balance = self.read_balance(&address).await;

        let committed = {
            let mut state = self.inner.state.write();
            let current = self.inner.epoch.load(Ordering::Acquire) == epoch
                && state.address.as_deref() == Some(address.as_str());
            if current {
                state.balance = Some(balance);
            }
            current
        };
        if committed {
            self.publish();
        }
    }

    async fn read_balance(&self, address: &str) -> u128 {
        let Some(reader) = self.inner.balances.as_ref() else {
            return 0;
        };
        match reader.get_balance(address).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(error = %e, "Could not read balance, showing zero");
                0
            }
        }
    }

    fn is_active_provider(&self, provider: &ProviderHandle) -> bool {
        self.inner
            .state
            .read()
            .provider
            .as_ref()
            .is_some_and(|active| same_provider(active, provider))
    }

    /// Drop the subscription unless it belongs to `provider`.
    fn unwatch_other(&self, provider: &ProviderHandle) {
        let mut slot = self.inner.watch.lock();
        if slot
            .as_ref()
            .is_some_and(|current| !same_provider(&current.provider, provider))
        {
            debug!("Unsubscribing from replaced provider");
            *slot = None;
        }
    }

    /// Subscribe to `provider`, replacing any previous subscription.
    fn watch_provider(&self, provider: &ProviderHandle) {
        let mut slot = self.inner.watch.lock();
        if slot
            .as_ref()
            .is_some_and(|current| same_provider(&current.provider, provider))
        {
            return;
        }
        // Dropping the previous watch aborts its task
        *slot = None;

        let Some(events) = provider.events() else {
            debug!(provider = provider.kind(), "Provider does not emit events");
            return;
        };
        let task = tokio::spawn(watch_events(
            Arc::downgrade(&self.inner),
            provider.clone(),
            events,
        ));
        *slot = Some(ProviderWatch {
            provider: provider.clone(),
            task,
        });
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut ConnectionState) -> Result<T, ConnectionError>,
    ) -> Result<ConnectionSnapshot, ConnectionError> {
        let snapshot = {
            let mut state = self.inner.state.write();
            f(&mut state)?;
            state.snapshot()
        };
        self.inner.updates.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    fn publish(&self) -> ConnectionSnapshot {
        let snapshot = self.snapshot();
        self.inner.updates.send_replace(snapshot.clone());
        snapshot
    }
}

async fn watch_events(
    inner: Weak<Inner>,
    provider: ProviderHandle,
    mut events: broadcast::Receiver<ProviderEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Provider events lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let Some(inner) = inner.upgrade() else { break };
        let controller = SessionController { inner };
        if !controller.is_active_provider(&provider) {
            debug!(provider = provider.kind(), "Ignoring event from stale provider");
            break;
        }

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    info!("Wallet reported no accounts");
                    controller.disconnect();
                    break;
                }
                Some(primary) => {
                    if let Err(e) = controller
                        .complete_connection(primary, provider.clone())
                        .await
                    {
                        warn!(error = %e, "Ignoring unusable account from accountsChanged");
                    }
                }
            },
            ProviderEvent::ChainChanged(chain_id) => controller.apply_chain_change(chain_id).await,
            ProviderEvent::Disconnected => {
                info!(provider = provider.kind(), "Provider disconnected");
                controller.disconnect();
                break;
            }
        }
    }
}

fn validate_address(address: &str) -> Result<String, ConnectionError> {
    let address = address.trim();
    validation::validate_not_empty(address, "Account address")
        .and_then(|_| validation::validate_no_whitespace(address, "Account address"))
        .map_err(ConnectionError::unknown)?;
    Ok(address.to_string())
}

/// Identity comparison on the data pointer only; vtable pointers of the
/// same object may differ between codegen units.
fn same_provider(a: &ProviderHandle, b: &ProviderHandle) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
