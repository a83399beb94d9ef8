//! Tilda - a drop-down terminal window on a global hotkey
//!
//! Main entry point for the application.

mod app;
mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use instance_lock::InstanceLock;
use once_cell::sync::Lazy;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{debug, error, info};
use util::ResultExt as _;

use crate::app::App;
use crate::cli::Cli;

/// Application startup time for performance monitoring
static STARTUP_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Exit status when the lock directory or global lock is unusable.
const EXIT_LOCK_FAILED: u8 = 1;
/// Exit status when the configured hotkey cannot be bound.
const EXIT_BAD_HOTKEY: u8 = 2;

/// Check if debug mode is enabled via environment variable.
fn is_debug_mode() -> bool {
    std::env::var_os("TILDA_DEBUG").is_some()
}

fn default_filter() -> &'static str {
    if is_debug_mode() {
        "tilda=trace,keybinder=trace,instance_lock=trace,info"
    } else {
        "tilda=info,warn"
    }
}

/// Initialize the logging system.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_line_number(true))
        .with(filter)
        .init();

    if is_debug_mode() {
        info!(
            "Tilda v{} starting up (DEBUG MODE ENABLED)",
            env!("CARGO_PKG_VERSION")
        );
        info!("Set RUST_LOG for custom log levels, e.g. RUST_LOG=keybinder=trace");
    } else {
        info!("Tilda v{} starting up", env!("CARGO_PKG_VERSION"));
    }
}

/// SIGINT and SIGTERM set the returned flag.
fn install_signal_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }
    Ok(flag)
}

/// The config file for `instance`, unless `-g` names an existing one.
fn instance_config_path(cli: &Cli, instance: u32) -> PathBuf {
    cli.config_path(tilda_paths::config_file(instance))
}

/// Load the config at `path`, creating it with defaults for `instance` if
/// missing, then apply command line overrides.
fn load_config(cli: &Cli, path: &Path, instance: u32) -> settings::Config {
    settings::ensure_config_file(path, instance).log_err("creating the config file");
    let mut config = settings::load_config(path);
    cli.apply_overrides(&mut config);
    debug!("Using config {:?}", path);
    config
}

fn run(cli: &Cli, lock: &InstanceLock) -> Result<ExitCode> {
    let instance = lock.instance();
    let config_path = instance_config_path(cli, instance);
    let config = load_config(cli, &config_path, instance);
    let shutdown = install_signal_flag()?;

    let mut app = App::new(config, config_path, instance)?;
    if let Err(err) = app.bind_hotkey() {
        error!("Invalid keybinding: {}", err);
        eprintln!("tilda: {err}");
        app.shutdown();
        return Ok(ExitCode::from(EXIT_BAD_HOTKEY));
    }
    app.show_initial()?;
    info!(
        "Instance {} initialized in {:?}",
        instance,
        STARTUP_TIME.elapsed()
    );

    let result = app.run(&shutdown);
    app.shutdown();
    result.map(|()| ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let _ = *STARTUP_TIME;

    let cli = Cli::parse_args();
    init_logging();

    let lock = match instance_lock::obtain_instance_lock() {
        Ok(lock) => lock,
        Err(err) => {
            let err = anyhow::Error::from(err);
            error!("Cannot obtain an instance number: {:#}", err);
            eprintln!("tilda: cannot obtain an instance number: {err:#}");
            return ExitCode::from(EXIT_LOCK_FAILED);
        }
    };
    info!("Running as instance {}", lock.instance());

    let code = match run(&cli, &lock) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("tilda: {err:#}");
            ExitCode::FAILURE
        }
    };

    lock.release().log_err("releasing the instance lock");
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn debug_env_enables_tracing() {
        std::env::set_var("TILDA_DEBUG", "1");
        assert!(default_filter().contains("keybinder=trace"));
        std::env::remove_var("TILDA_DEBUG");
        assert_eq!(default_filter(), "tilda=info,warn");
    }

    #[test]
    fn missing_config_is_created_with_the_instance_hotkey() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config_2");
        let cli = Cli::try_parse_args_from(["tilda", "--hidden"]).unwrap();

        let config = load_config(&cli, &path, 2);
        assert!(path.is_file());
        assert_eq!(config.key.as_deref(), Some("F3"));
        assert!(config.hidden);
    }

    #[test]
    fn existing_config_is_loaded_with_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("custom.toml");
        std::fs::write(&path, "key = \"F9\"\nx_pos = 3\n").unwrap();
        let cli = Cli::try_parse_args_from(["tilda", "-g", path.to_str().unwrap(), "-x", "7"]).unwrap();

        let config = load_config(&cli, &cli.config_path(tmp.path().join("config_0")), 0);
        assert_eq!(config.key.as_deref(), Some("F9"));
        assert_eq!(config.x_pos, 7);
    }

    #[test]
    #[serial]
    fn instance_config_lives_in_the_config_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(tilda_paths::set_config_dir(tmp.path().to_path_buf()));
        let cli = Cli::try_parse_args_from(["tilda"]).unwrap();

        let path = instance_config_path(&cli, 1);
        assert_eq!(path, tmp.path().join("config_1"));

        let config = load_config(&cli, &path, 1);
        assert!(path.is_file());
        assert_eq!(config.key.as_deref(), Some("F2"));
    }
}
