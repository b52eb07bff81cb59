//! # Configs Module
//!
//! Layered settings for the sync binaries: built-in defaults, then an optional
//! JSON file, then environment variables and command-line flags.

/// `SyncSettings`, its merge layers and the resolved `SyncConfig`.
pub mod config_sync;

pub use config_sync::{ConfigError, SyncConfig, SyncSettings, DEFAULT_CONFIG_FILE};
