//! # Shared Data Transfer Objects Library
//!
//! Types exchanged between the connection libraries and the application shell.
//! Everything here is plain data: no provider handles, no channels, no locks.
//!
//! ## Structure
//!
//! - **[`dto`]**: Data Transfer Objects
//!   - **[`dto::wallet`]**: Connection status, error categories and snapshots
//! - **[`utils`]**: Shared utility functions
//!   - **[`utils::format_address`]**: Format wallet addresses for display
//!   - **[`utils::parse_quantity`]**: Decode JSON-RPC hex quantities
//!
//! ## Wire Format
//!
//! All DTOs serialize to JSON using `serde`:
//! - Enums serialize to snake_case strings
//! - Optional fields are omitted from JSON when `None`
//!
//! ```rust
//! use shared::dto::wallet::{ConnectionSnapshot, ConnectionStatus};
//!
//! let snapshot = ConnectionSnapshot::idle();
//! assert_eq!(snapshot.status, ConnectionStatus::Idle);
//! let json = serde_json::to_string(&snapshot).unwrap();
//! assert_eq!(json, r#"{"status":"idle"}"#);
//! ```

pub mod dto;
pub mod utils;

// Re-export commonly used types for convenience
pub use dto::*;
pub use utils::*;
