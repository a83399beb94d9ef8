//! Centralized path management for Tilda.
//!
//! All application directories are lazily initialized and cached.
//! Use `set_*` functions before first access to override for testing.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();
static CACHE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Prefix of the per-instance config file names (`config_0`, `config_1`, ...).
pub const CONFIG_FILE_PREFIX: &str = "config_";

/// ~/.config/tilda (or $XDG_CONFIG_HOME/tilda)
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tilda")
    })
}

/// ~/.cache/tilda (or $XDG_CACHE_HOME/tilda)
pub fn cache_dir() -> &'static PathBuf {
    CACHE_DIR.get_or_init(|| {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tilda")
    })
}

/// Override config dir (must be called before first access). For testing.
///
/// Returns `false` if the directory was already fixed.
pub fn set_config_dir(path: PathBuf) -> bool {
    CONFIG_DIR.set(path).is_ok()
}

/// Override cache dir (must be called before first access). For testing.
///
/// Returns `false` if the directory was already fixed.
pub fn set_cache_dir(path: PathBuf) -> bool {
    CACHE_DIR.set(path).is_ok()
}

/// Directory shared by all running instances for their lock files:
/// cache_dir()/locks
pub fn lock_dir() -> PathBuf {
    cache_dir().join("locks")
}

/// Config file for the given instance number: config_dir()/config_<instance>
///
/// Symlinks are resolved so that writes land on the link target.
pub fn config_file(instance: u32) -> PathBuf {
    config_file_in(config_dir(), instance)
}

/// Same as [`config_file`] but relative to an explicit directory.
pub fn config_file_in(dir: &Path, instance: u32) -> PathBuf {
    let path = dir.join(format!("{CONFIG_FILE_PREFIX}{instance}"));
    match std::fs::canonicalize(&path) {
        Ok(resolved) if resolved != path => {
            tracing::debug!("Config file at {:?} points to {:?}", path, resolved);
            resolved
        }
        _ => path,
    }
}
