//! Per-instance TOML config files with live reload.
//!
//! Config location: `~/.config/tilda/config_<instance>`

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use serde::Deserialize;

use crate::constants;
use crate::store::Value;
use crate::SettingsError;

/// One instance's settings, parsed from TOML.
///
/// Field names are the historical config keys, so existing files keep working.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub tilda_config_version: String,
    /// Accelerator that toggles the window. `None` until one is assigned.
    pub key: Option<String>,
    pub title: String,
    pub max_width: i64,
    pub max_height: i64,
    pub x_pos: i64,
    pub y_pos: i64,
    pub centered_horizontally: bool,
    pub centered_vertically: bool,
    pub animation: bool,
    pub slide_sleep_usec: i64,
    /// 0 top, 1 bottom, 2 left, 3 right.
    pub animation_orientation: i64,
    pub pinned: bool,
    pub above: bool,
    pub hidden: bool,
    pub auto_hide_on_focus_lost: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tilda_config_version: constants::settings::CONFIG_VERSION.to_string(),
            key: None,
            title: constants::window::DEFAULT_TITLE.to_string(),
            max_width: constants::window::DEFAULT_MAX_WIDTH,
            max_height: constants::window::DEFAULT_MAX_HEIGHT,
            x_pos: constants::window::DEFAULT_X_POS,
            y_pos: constants::window::DEFAULT_Y_POS,
            centered_horizontally: false,
            centered_vertically: false,
            animation: false,
            slide_sleep_usec: constants::animation::DEFAULT_SLIDE_SLEEP_USEC,
            animation_orientation: 0,
            pinned: true,
            above: true,
            hidden: false,
            auto_hide_on_focus_lost: false,
        }
    }
}

/// Hotkey given to a fresh config: F1 for instance 0, F2 for instance 1, ...
pub fn default_key_for_instance(instance: u32) -> String {
    format!("F{}", instance + 1)
}

/// Default config file content with comments (written for new instances).
const DEFAULT_CONFIG: &str = r#"# Tilda configuration for one instance.
# Changes are applied live, just save this file.

tilda_config_version = "VERSION_PLACEHOLDER"

# Hotkey that pulls the window down and back up, e.g. "<Control>F12".
# "NULL" leaves the window without a hotkey.
key = "KEY_PLACEHOLDER"

# Window title
title = "Tilda"

# Size and position of the pulled-down window, in pixels
max_width = 600
max_height = 150
x_pos = 0
y_pos = 0
# centered_horizontally = false
# centered_vertically = false

# Slide the window in and out instead of showing it at once
animation = false
# Pause between animation frames, in microseconds
slide_sleep_usec = 20000
# Screen edge the window slides from: 0 top, 1 bottom, 2 left, 3 right
animation_orientation = 0

# Show on every workspace, and above other windows
pinned = true
above = true

# Start hidden
hidden = false

# Hide the window when it loses focus
# auto_hide_on_focus_lost = false
"#;

/// Create `path` with the default content if it does not exist yet.
/// Returns whether a file was written.
pub fn ensure_config_file(path: &Path, instance: u32) -> Result<bool, SettingsError> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content = DEFAULT_CONFIG
        .replace("VERSION_PLACEHOLDER", constants::settings::CONFIG_VERSION)
        .replace("KEY_PLACEHOLDER", &default_key_for_instance(instance));
    write_synced(path, &content)?;
    tracing::info!("Created default config at {:?}", path);
    Ok(true)
}

/// Load and parse a config file. Returns defaults on any error.
pub fn load_config(path: &Path) -> Config {
    match read_config(path) {
        Ok(config) => config,
        Err(SettingsError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Config::default()
        }
        Err(err) => {
            tracing::warn!("{}, using defaults", err);
            Config::default()
        }
    }
}

/// Load a config file, reporting why it could not be used.
pub fn read_config(path: &Path) -> Result<Config, SettingsError> {
    let io_error = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Size guard
    let size = std::fs::metadata(path).map_err(io_error)?.len();
    if size > constants::settings::MAX_FILE_SIZE {
        return Err(SettingsError::TooLarge {
            path: path.to_path_buf(),
            size,
        });
    }

    let content = std::fs::read_to_string(path).map_err(io_error)?;
    toml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        message: source.to_string(),
    })
}

/// Write `config` to `path`, keeping comments and unknown keys already in the file.
pub fn save_config(path: &Path, config: &Config) -> Result<(), SettingsError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    for (key, value) in config.entries() {
        doc[key] = match value {
            Value::String(s) => toml_edit::value(s),
            Value::Int(i) => toml_edit::value(i),
            Value::Bool(b) => toml_edit::value(b),
        };
    }
    if config.key.is_none() {
        doc.remove("key");
    }
    doc["tilda_config_version"] = toml_edit::value(constants::settings::CONFIG_VERSION);

    write_synced(path, &doc.to_string())?;
    tracing::debug!("Saved config to {:?}", path);
    Ok(())
}

fn write_synced(path: &Path, content: &str) -> Result<(), SettingsError> {
    let io_error = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::create(path).map_err(io_error)?;
    file.write_all(content.as_bytes()).map_err(io_error)?;
    file.sync_all().map_err(io_error)
}

/// Keeps a config file watch alive. Stops watching on drop.
pub type ConfigWatcher = notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>;

/// Start watching `path` for changes.
///
/// Each change that yields a config different from the last one seen is
/// sent on the returned channel. The receiver is meant to be drained from the
/// main loop.
pub fn watch_config(path: &Path) -> Option<(ConfigWatcher, mpsc::Receiver<Config>)> {
    use notify_debouncer_mini::new_debouncer;

    let watch_dir = path.parent()?.to_path_buf();
    let watched: PathBuf = path.to_path_buf();
    let current = parking_lot::Mutex::new(load_config(path));
    let (tx, rx) = mpsc::channel();

    let mut debouncer = new_debouncer(
        constants::timing::CONFIG_DEBOUNCE,
        move |res: Result<Vec<notify_debouncer_mini::DebouncedEvent>, _>| {
            let Ok(events) = res else {
                return;
            };
            if !events.iter().any(|event| event.path == watched) {
                return;
            }
            let new_config = load_config(&watched);
            let mut prev = current.lock();
            if new_config != *prev {
                tracing::info!("Config file changed, reloading...");
                *prev = new_config.clone();
                let _ = tx.send(new_config);
            }
        },
    )
    .ok()?;

    debouncer
        .watcher()
        .watch(&watch_dir, notify::RecursiveMode::NonRecursive)
        .ok()?;

    tracing::info!("Watching config file: {:?}", path);
    Some((debouncer, rx))
}
