//! # Application Configuration
//!
//! Configuration loaded from environment variables (and an optional `.env`
//! file). Values are validated once on load so a misconfigured deployment
//! fails at startup.
//!
//! The pairing-service identifier is the exception: it is optional at load
//! time because the browser-wallet path works without it. It is validated by
//! [`ProjectId::parse`] when the user picks remote pairing, before any relay
//! call is made.
//!
//! ## Environment Variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `WALLETCONNECT_PROJECT_ID` (or `VITE_WC_PROJECT_ID`) | unset |
//! | `RPC_URL` | `https://sepolia.gateway.tenderly.co` |
//! | `CHAIN_ID` | `11155111` (Sepolia) |
//! | `PAIRING_TIMEOUT_SECS` | `15` |
//! | `APPROVAL_TIMEOUT_SECS` | unset (wait for the peer indefinitely) |
//! | `APP_URL` | `http://localhost:5173` |
//!
//! ```rust,no_run
//! use lib_core::config::Config;
//!
//! let config = Config::load().expect("invalid configuration");
//! println!("RPC endpoint: {}", config.rpc_url);
//! ```

use crate::error::ConnectionError;
use lib_utils::{envs, validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Sepolia testnet chain id.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Public Sepolia gateway used when `RPC_URL` is not set.
pub const DEFAULT_RPC_URL: &str = "https://sepolia.gateway.tenderly.co";

/// Window for the relay to produce a pairing URI.
pub const DEFAULT_PAIRING_TIMEOUT_SECS: u64 = 15;

/// Variables read for the pairing-service identifier, first set wins.
pub const PROJECT_ID_VARS: &[&str] = &["WALLETCONNECT_PROJECT_ID", "VITE_WC_PROJECT_ID"];

/// Shortest identifier the pairing service has ever issued.
pub const MIN_PROJECT_ID_LEN: usize = 20;

/// Values shipped in `.env.example` files that were never replaced.
pub const PLACEHOLDER_PROJECT_IDS: &[&str] = &["your_walletconnect_project_id_here"];

const PLACEHOLDER_MARKER: &str = "your_walletconnect";

/// Validated pairing-service ("project") identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct ProjectId(String);

impl ProjectId {
    /// Validate a raw identifier.
    ///
    /// Rejects a missing value, anything shorter than [`MIN_PROJECT_ID_LEN`]
    /// and known placeholders. A bad identifier otherwise surfaces as a relay
    /// session that never produces a pairing URI.
    pub fn parse(raw: Option<&str>) -> Result<Self, ConnectionError> {
        let raw = raw
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ConnectionError::invalid_configuration("WalletConnect project id is not set")
            })?;

        let lower = raw.to_lowercase();
        if PLACEHOLDER_PROJECT_IDS.contains(&lower.as_str()) || lower.contains(PLACEHOLDER_MARKER) {
            return Err(ConnectionError::invalid_configuration(
                "WalletConnect project id is still the placeholder value",
            ));
        }

        validation::validate_min_length(raw, MIN_PROJECT_ID_LEN, "WalletConnect project id")
            .map_err(ConnectionError::invalid_configuration)?;
        validation::validate_no_whitespace(raw, "WalletConnect project id")
            .map_err(ConnectionError::invalid_configuration)?;

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep identifiers out of logs.
impl fmt::Debug for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "ProjectId({}…)", visible)
    }
}

/// Metadata the relay shows the peer when it is asked to approve a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    pub icons: Vec<String>,
}

impl AppMetadata {
    pub fn for_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            name: "ArmaDEX".to_string(),
            description: "MEV-Protected Trading Platform".to_string(),
            url: origin.to_string(),
            icons: vec![format!("{}/favicon.ico", origin)],
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// Raw pairing-service identifier; validated when remote pairing starts
    pub project_id: Option<String>,

    /// JSON-RPC endpoint used for chain reads
    pub rpc_url: String,

    /// Chain id assumed when the wallet cannot report one
    pub chain_id: u64,

    /// Window for the relay to emit a pairing URI
    ///
    /// Valid range: 1-300 seconds
    pub pairing_timeout: Duration,

    /// Optional window for the peer to approve once the URI is shown
    pub approval_timeout: Option<Duration>,

    pub metadata: AppMetadata,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: None,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: SEPOLIA_CHAIN_ID,
            pairing_timeout: Duration::from_secs(DEFAULT_PAIRING_TIMEOUT_SECS),
            approval_timeout: None,
            metadata: AppMetadata::for_origin("http://localhost:5173"),
        }
    }
}

impl Config {
    /// Load `.env` (if present), then read and validate the environment.
    pub fn load() -> Result<Self, Error> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
        }

        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();

        let project_id = envs::get_env_opt_first(PROJECT_ID_VARS);
        let rpc_url = envs::get_env_opt("RPC_URL").unwrap_or(defaults.rpc_url);
        let chain_id = envs::get_env_parse_or("CHAIN_ID", defaults.chain_id)?;
        let pairing_timeout_secs =
            envs::get_env_parse_or("PAIRING_TIMEOUT_SECS", DEFAULT_PAIRING_TIMEOUT_SECS)?;
        let approval_timeout = match envs::get_env_opt("APPROVAL_TIMEOUT_SECS") {
            Some(_) => Some(Duration::from_secs(envs::get_env_parse::<u64>(
                "APPROVAL_TIMEOUT_SECS",
            )?)),
            None => None,
        };
        let metadata = envs::get_env_opt("APP_URL")
            .map(|url| AppMetadata::for_origin(&url))
            .unwrap_or(defaults.metadata);

        Ok(Self {
            project_id,
            rpc_url,
            chain_id,
            pairing_timeout: Duration::from_secs(pairing_timeout_secs),
            approval_timeout,
            metadata,
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(Error::Invalid(format!(
                "RPC_URL must be an http(s) URL, got {}",
                self.rpc_url
            )));
        }

        if self.chain_id == 0 {
            return Err(Error::Invalid("CHAIN_ID must be non-zero".to_string()));
        }

        let secs = self.pairing_timeout.as_secs();
        if !(1..=300).contains(&secs) {
            return Err(Error::Invalid(
                "PAIRING_TIMEOUT_SECS must be between 1 and 300".to_string(),
            ));
        }

        if self.approval_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::Invalid(
                "APPROVAL_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Validated pairing-service identifier.
    pub fn project_id(&self) -> Result<ProjectId, ConnectionError> {
        ProjectId::parse(self.project_id.as_deref())
    }
}

// region:    --- Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Env(#[from] envs::Error),
    #[error("Configuration error: {0}")]
    Invalid(String),
}
// endregion: --- Error
