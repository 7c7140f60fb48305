//! # Core Library
//!
//! Error taxonomy and configuration shared by the connection libraries and the
//! application shell.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{AppMetadata, Config, ProjectId};
pub use error::{ConnectionError, Result};
pub use shared::dto::wallet::ErrorCategory;
