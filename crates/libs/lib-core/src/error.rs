//! # Connection Error Handling
//!
//! This module defines [`ConnectionError`], the single error type every
//! connection attempt ends in. Strategies catch whatever their collaborators
//! throw, classify it into an [`ErrorCategory`], and hand the result to the
//! session controller; nothing else escapes to the rest of the application.
//!
//! ## Error Categories
//!
//! - [`UserRejected`](ErrorCategory::UserRejected) - declined in the wallet (EIP-1193 code 4001)
//! - [`AlreadyPending`](ErrorCategory::AlreadyPending) - a request is outstanding (code -32002)
//! - [`InvalidConfiguration`](ErrorCategory::InvalidConfiguration) - bad pairing-service identifier
//! - [`NetworkUnavailable`](ErrorCategory::NetworkUnavailable) - relay/RPC unreachable
//! - [`Timeout`](ErrorCategory::Timeout) - nothing arrived within the window
//! - [`Unknown`](ErrorCategory::Unknown) - anything else, message passed through
//!
//! ## Usage Example
//!
//! ```rust
//! use lib_core::error::ConnectionError;
//! use lib_core::ErrorCategory;
//!
//! let err = ConnectionError::classify("Request rejected by user");
//! assert_eq!(err.category(), ErrorCategory::UserRejected);
//!
//! let err = ConnectionError::from_provider(Some(-32002), "Request of type 'wallet_requestPermissions' already pending");
//! assert_eq!(err.category(), ErrorCategory::AlreadyPending);
//! ```

use shared::dto::wallet::{ConnectionFailure, ErrorCategory};
use thiserror::Error;

/// Convenience type alias for `Result<T, ConnectionError>`.
pub type Result<T> = std::result::Result<T, ConnectionError>;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Wallet-specific JSON-RPC code for "request already pending".
pub const REQUEST_PENDING_CODE: i64 = -32002;

/// Failure of a connection attempt, already classified for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category}: {message}")]
pub struct ConnectionError {
    category: ErrorCategory,
    message: String,
}

impl ConnectionError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::UserRejected, message)
    }

    pub fn already_pending(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::AlreadyPending, message)
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InvalidConfiguration, message)
    }

    pub fn network_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NetworkUnavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Timeout, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unknown, message)
    }

    /// Classify a free-form failure message coming back from a wallet or relay.
    ///
    /// Relay SDKs report most failures only through their message text, so the
    /// match is on lowercase substrings. Order matters: a "request rejected
    /// after timeout" is a rejection.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        let category = if lower.contains("rejected") {
            ErrorCategory::UserRejected
        } else if lower.contains("already pending") {
            ErrorCategory::AlreadyPending
        } else if lower.contains("projectid") || lower.contains("project id") {
            ErrorCategory::InvalidConfiguration
        } else if lower.contains("publish") || lower.contains("payload") {
            ErrorCategory::NetworkUnavailable
        } else if lower.contains("timeout") || lower.contains("timed out") {
            ErrorCategory::Timeout
        } else if lower.contains("failed") {
            ErrorCategory::NetworkUnavailable
        } else {
            ErrorCategory::Unknown
        };

        Self { category, message }
    }

    /// Classify an EIP-1193 provider error, preferring the numeric code.
    pub fn from_provider(code: Option<i64>, message: impl Into<String>) -> Self {
        match code {
            Some(USER_REJECTED_CODE) => Self::user_rejected(message),
            Some(REQUEST_PENDING_CODE) => Self::already_pending(message),
            _ => Self::classify(message),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Text to show the user.
    ///
    /// Known categories get a fixed headline; `Unknown` keeps the underlying
    /// message so it can be reported.
    pub fn user_message(&self) -> String {
        match self.category {
            ErrorCategory::Unknown if !self.message.is_empty() => {
                format!("Connection error: {}", self.message)
            }
            category => category.headline().to_string(),
        }
    }

    /// Serializable form stored in connection snapshots.
    pub fn to_failure(&self) -> ConnectionFailure {
        ConnectionFailure {
            category: self.category,
            message: self.message.clone(),
        }
    }
}

impl From<ConnectionError> for ConnectionFailure {
    fn from(err: ConnectionError) -> Self {
        ConnectionFailure {
            category: err.category,
            message: err.message,
        }
    }
}
