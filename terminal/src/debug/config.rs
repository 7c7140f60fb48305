//! Logging configuration from environment variables

use std::path::PathBuf;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "armadex=info,terminal=info,lib_wallet=info,lib_core=info,warn";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log directory (for rotation)
    pub log_dir: PathBuf,
    /// File name prefix of the rotated log
    pub file_prefix: String,
    /// Log level filter (e.g., "lib_wallet=debug,info")
    pub log_level: String,
    /// Mirror events to stderr
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_prefix: "armadex.log".to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            stderr: true,
        }
    }
}

impl LogConfig {
    /// Load configuration from environment variables
    ///
    /// - `ARMADEX_LOG_DIR`: log directory (default `logs`)
    /// - `RUST_LOG`: filter directives
    /// - `ARMADEX_LOG_STDERR`: `0` disables the stderr layer
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            log_dir: std::env::var("ARMADEX_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            file_prefix: defaults.file_prefix,
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            stderr: std::env::var("ARMADEX_LOG_STDERR")
                .map(|v| v != "0")
                .unwrap_or(defaults.stderr),
        }
    }

    /// Path of today's log file
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(&self.file_prefix)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.log_level.contains("debug") || self.log_level.contains("trace")
    }
}
