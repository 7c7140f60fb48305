//! # Application Events
//!
//! Event types sent from background connection tasks to the UI loop.

use shared::dto::wallet::{ConnectionSnapshot, ErrorCategory};

/// Async task results sent to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The connection state changed
    ConnectionChanged(ConnectionSnapshot),
    /// A pairing URI is ready to be shown as a QR code
    PairingUri(String),
    /// A connection attempt failed; `message` is ready for display
    ConnectionFailed {
        category: ErrorCategory,
        message: String,
    },
    /// The user backed out of an attempt
    AttemptCancelled,
}
