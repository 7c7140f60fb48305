//! # Wallet Connection Library
//!
//! Connection lifecycle for the ArmaDEX client:
//!
//! - [`controller`]: the session controller owning the single connection state
//! - [`pairing`]: remote pairing through a relay service
//! - [`injected`]: connection through an injected (browser extension) provider
//! - [`provider`]: collaborator traits the wallets and chain reads sit behind
//! - [`rpc`]: JSON-RPC over HTTP implementation of those traits

pub mod controller;
pub mod injected;
pub mod pairing;
pub mod provider;
pub mod rpc;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{Completion, ConnectionState, SessionController};
pub use injected::InjectedConnector;
pub use pairing::{
    PairingOptions, PairingState, RelayClient, RelayError, RelayEvent, RelayInit, RelaySession,
    RemotePairing,
};
pub use provider::{BalanceReader, ProviderError, ProviderEvent, ProviderHandle, WalletProvider};
pub use rpc::RpcClient;
pub use strategy::{ConnectOutcome, ConnectStrategy};
