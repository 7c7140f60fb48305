//! # Data Transfer Objects (DTOs)
//!
//! ## Module Organization
//!
//! - [`wallet`] - Wallet connection status, error categories and state snapshots

pub mod wallet;

pub use wallet::*;
