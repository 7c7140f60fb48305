//! # Logging
//!
//! Structured logging for the ArmaDEX shell: a daily rotated file under
//! `ARMADEX_LOG_DIR` plus an optional stderr mirror.
//!
//! ## Usage
//!
//! ```rust,no_run
//! // Keep the guard alive until exit so buffered lines are flushed
//! let _guard = terminal::debug::init().expect("logging");
//!
//! tracing::info!(address = "0x1234…abcd", "Wallet connected");
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (e.g., `lib_wallet=debug,info`)
//! - `ARMADEX_LOG_DIR`: Log directory (default: `logs`)
//! - `ARMADEX_LOG_STDERR`: `0` to log to the file only

pub mod config;
pub mod logger;

pub use config::LogConfig;
pub use logger::LogError;

use tracing_appender::non_blocking::WorkerGuard;

/// Initialize logging from environment variables
pub fn init() -> Result<WorkerGuard, LogError> {
    logger::init(&LogConfig::from_env())
}
