//! Command line options.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser};
use settings::Config;

#[derive(Debug, Parser)]
#[command(
    name = "tilda",
    version,
    disable_version_flag = true,
    about = "A drop-down terminal window toggled by a global hotkey"
)]
pub struct Cli {
    /// Use this config file instead of the one for the instance number
    #[arg(short = 'g', long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Start with the window pulled up
    #[arg(long)]
    pub hidden: bool,

    /// X position of the pulled-down window
    #[arg(short = 'x', long, allow_negative_numbers = true)]
    pub x_pos: Option<i64>,

    /// Y position of the pulled-down window
    #[arg(short = 'y', long, allow_negative_numbers = true)]
    pub y_pos: Option<i64>,
}

impl Cli {
    /// Parse the process arguments, exiting on `--help`, `--version` or errors.
    pub fn parse_args() -> Self {
        Self::try_parse_args_from(std::env::args_os()).unwrap_or_else(|err| err.exit())
    }

    pub fn try_parse_args_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut matches = command().try_get_matches_from(args)?;
        Self::from_arg_matches_mut(&mut matches)
    }

    /// The config file to use: `--config-file` when it exists, otherwise `default`.
    pub fn config_path(&self, default: PathBuf) -> PathBuf {
        match &self.config_file {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                tracing::warn!(
                    "Config file {:?} does not exist, using {:?}",
                    path,
                    default
                );
                default
            }
            None => default,
        }
    }

    /// Overwrite config values given on the command line.
    pub fn apply_overrides(&self, config: &mut Config) {
        if self.hidden {
            config.hidden = true;
        }
        if let Some(x) = self.x_pos {
            config.x_pos = x;
        }
        if let Some(y) = self.y_pos {
            config.y_pos = y;
        }
    }
}

/// The derived command with `-v`/`--version` in place of clap's `-V`.
fn command() -> clap::Command {
    Cli::command().arg(
        Arg::new("version")
            .short('v')
            .long("version")
            .action(ArgAction::Version)
            .help("Print version"),
    )
}
