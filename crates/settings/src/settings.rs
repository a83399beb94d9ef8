//! Configuration system for Tilda.
//!
//! Provides compile-time constants, per-instance TOML config files and a
//! typed key-value view over them.

pub mod constants;
pub mod file;
pub mod store;

use std::path::PathBuf;

pub use file::{
    default_key_for_instance, ensure_config_file, load_config, read_config, save_config,
    watch_config, Config, ConfigWatcher,
};
pub use store::{ConfigStore, Value};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("unknown config key '{0}'")]
    UnknownKey(String),
    #[error("config key '{key}' holds a {expected}, not a {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("config key '{key}' {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("cannot access config file {path:?}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config file {path:?} is too large ({size} bytes)")]
    TooLarge { path: PathBuf, size: u64 },
    #[error("cannot parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}
