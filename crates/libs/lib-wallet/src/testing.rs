//! Mock collaborators for unit tests.

use crate::pairing::{RelayClient, RelayError, RelayEvent, RelayInit, RelaySession};
use crate::provider::{BalanceReader, ProviderError, ProviderEvent, ProviderHandle, WalletProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const ALICE: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA1111";
pub const BOB: &str = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB2222";
pub const VALID_PROJECT_ID: &str = "bae1988f9fff8e3b8086760a5f45a362";
pub const SEPOLIA: u64 = 11_155_111;

// region:    --- Injected provider

pub struct MockProvider {
    kind: &'static str,
    accounts: Mutex<Result<Vec<String>, ProviderError>>,
    chain: Mutex<Result<Value, ProviderError>>,
    chain_delay: Mutex<Duration>,
    events: broadcast::Sender<ProviderEvent>,
    requests: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(accounts: &[&str]) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            kind: "injected",
            accounts: Mutex::new(Ok(accounts.iter().map(|a| a.to_string()).collect())),
            chain: Mutex::new(Ok(json!("0xaa36a7"))),
            chain_delay: Mutex::new(Duration::ZERO),
            events,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(code: i64, message: &str) -> Arc<Self> {
        let provider = Self::new(&[]);
        *provider.accounts.lock() = Err(ProviderError::new(code, message));
        provider
    }

    pub fn set_chain(&self, chain: Result<Value, ProviderError>) {
        *self.chain.lock() = chain;
    }

    pub fn set_chain_delay(&self, delay: Duration) {
        *self.chain_delay.lock() = delay;
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn handle(self: &Arc<Self>) -> ProviderHandle {
        self.clone()
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn request(&self, method: &str, _params: Value) -> Result<Value, ProviderError> {
        self.requests.lock().push(method.to_string());
        match method {
            "eth_requestAccounts" | "eth_accounts" => {
                let accounts = self.accounts.lock().clone()?;
                Ok(json!(accounts))
            }
            "eth_chainId" => {
                let delay = *self.chain_delay.lock();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.chain.lock().clone()
            }
            _ => Err(ProviderError::new(-32601, "Method not found")),
        }
    }

    fn events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        Some(self.events.subscribe())
    }
}

// endregion: --- Injected provider

// region:    --- Chain reads

pub struct MockBalances {
    balance: Mutex<Result<u128, ProviderError>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl MockBalances {
    pub fn new(balance: u128) -> Arc<Self> {
        Arc::new(Self {
            balance: Mutex::new(Ok(balance)),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let balances = Self::new(0);
        *balances.balance.lock() = Err(ProviderError::other(message));
        balances
    }

    pub fn set(&self, balance: u128) {
        *self.balance.lock() = Ok(balance);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceReader for MockBalances {
    async fn get_balance(&self, _address: &str) -> Result<u128, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.balance.lock().clone()
    }
}

// endregion: --- Chain reads

// region:    --- Relay

/// Relay whose sessions replay a script of `(delay, event)` pairs, each
/// delay relative to the previous event.
pub struct MockRelay {
    script: Vec<(Duration, RelayEvent)>,
    enable: Option<Result<Vec<String>, RelayError>>,
    init_error: Option<RelayError>,
    init_calls: AtomicUsize,
    sessions: Mutex<Vec<Arc<MockSession>>>,
}

impl MockRelay {
    pub fn new(script: Vec<(Duration, RelayEvent)>) -> Arc<Self> {
        Arc::new(Self::scripted(script))
    }

    /// `enable()` resolves immediately with this result instead of staying pending.
    pub fn with_enable(
        script: Vec<(Duration, RelayEvent)>,
        enable: Result<Vec<String>, RelayError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            enable: Some(enable),
            ..Self::scripted(script)
        })
    }

    pub fn failing_init(message: &str) -> Arc<Self> {
        Arc::new(Self {
            init_error: Some(RelayError::new(message)),
            ..Self::scripted(Vec::new())
        })
    }

    fn scripted(script: Vec<(Duration, RelayEvent)>) -> Self {
        Self {
            script,
            enable: None,
            init_error: None,
            init_calls: AtomicUsize::new(0),
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions.lock().last().cloned()
    }
}

#[async_trait]
impl RelayClient for MockRelay {
    async fn init(&self, init: &RelayInit) -> Result<Arc<dyn RelaySession>, RelayError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!init.show_qr_modal);
        if let Some(err) = &self.init_error {
            return Err(err.clone());
        }

        let session = MockSession::new(self.enable.clone());
        let events = session.events.clone();
        let script = self.script.clone();
        tokio::spawn(async move {
            for (delay, event) in script {
                tokio::time::sleep(delay).await;
                let _ = events.send(event);
            }
        });

        self.sessions.lock().push(session.clone());
        Ok(session)
    }
}

pub struct MockSession {
    events: broadcast::Sender<RelayEvent>,
    provider_events: broadcast::Sender<ProviderEvent>,
    enable: Option<Result<Vec<String>, RelayError>>,
    disconnect_calls: AtomicUsize,
}

impl MockSession {
    fn new(enable: Option<Result<Vec<String>, RelayError>>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        let (provider_events, _) = broadcast::channel(16);
        Arc::new(Self {
            events,
            provider_events,
            enable,
            disconnect_calls: AtomicUsize::new(0),
        })
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: RelayEvent) {
        let _ = self.events.send(event);
    }

    pub fn emit_provider(&self, event: ProviderEvent) {
        let _ = self.provider_events.send(event);
    }
}

#[async_trait]
impl WalletProvider for MockSession {
    fn kind(&self) -> &'static str {
        "relay"
    }

    async fn request(&self, method: &str, _params: Value) -> Result<Value, ProviderError> {
        match method {
            "eth_chainId" => Ok(json!("0xaa36a7")),
            _ => Err(ProviderError::new(-32601, "Method not found")),
        }
    }

    fn events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        Some(self.provider_events.subscribe())
    }
}

#[async_trait]
impl RelaySession for MockSession {
    fn events(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    async fn enable(&self) -> Result<Vec<String>, RelayError> {
        match &self.enable {
            Some(result) => result.clone(),
            None => std::future::pending().await,
        }
    }

    async fn disconnect(&self) -> Result<(), RelayError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn provider(self: Arc<Self>) -> ProviderHandle {
        self
    }
}

// endregion: --- Relay
