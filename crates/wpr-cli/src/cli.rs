//! CLI argument definitions for wp-release.

use std::path::PathBuf;

use clap::{Args, ColorChoice, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;
use tracing::level_filters::LevelFilter;

use crate::logging::{LogConfig, LogFormat};

#[derive(Parser)]
#[command(
    name = "wp-release",
    version,
    about = "Deploy a WordPress build archive as a new release",
    long_about = "Deploy a pre-built WordPress .tar.gz as a timestamped release.\n\n\
                  Extracts into releases/release-<date>-<id>, links the shared config,\n\
                  moves ACF Pro into mu-plugins, swaps the current-release link and\n\
                  keeps the five newest releases.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub deploy: DeployArgs,

    #[command(flatten)]
    pub site: SiteArgs,

    /// Adjust log verbosity (deploy steps are shown by default; -v for debug,
    /// -q to hide progress, -qq for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging setup for this invocation.
    ///
    /// `--log-level` beats `-v/-q`, and either one disables `RUST_LOG`.
    /// Colors follow `--color`, or `stderr_is_terminal` when writing to
    /// stderr in auto mode.
    pub fn log_config(&self, stderr_is_terminal: bool) -> LogConfig {
        let explicit_level = self.log_level.map(LevelFilter::from);
        LogConfig {
            level_filter: explicit_level.unwrap_or_else(|| self.verbosity.tracing_level_filter()),
            use_env_filter: explicit_level.is_none() && !self.verbosity.is_present(),
            format: self.log_format.into(),
            log_file: self.log_file.clone(),
            with_ansi: match self.color.color {
                ColorChoice::Always => true,
                ColorChoice::Never => false,
                ColorChoice::Auto => self.log_file.is_none() && stderr_is_terminal,
            },
            ..LogConfig::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the release history, newest first.
    List(ListArgs),

    /// Point current-release at an older release.
    Rollback(RollbackArgs),
}

/// Settings shared by every command.
#[derive(Args, Clone)]
pub struct SiteArgs {
    /// Directory holding the releases directory and the current-release link.
    #[arg(long = "root", value_name = "DIR", default_value = ".", global = true)]
    pub root: PathBuf,

    /// Configuration file (default: <ROOT>/wp-release.toml when present).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Number of releases and archives to keep.
    #[arg(long = "keep", value_name = "N", global = true)]
    pub keep: Option<usize>,

    /// Print machine-readable JSON instead of tables.
    #[arg(long = "json", global = true)]
    pub json: bool,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Release archive to deploy.
    #[arg(value_name = "ARCHIVE", default_value = "release.tar.gz")]
    pub archive: PathBuf,

    /// Releases directory, relative to --root.
    #[arg(value_name = "RELEASES_DIR")]
    pub releases_dir: Option<PathBuf>,

    /// Validate and name the release without writing anything.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Refuse the archive unless its SHA256 matches.
    #[arg(long = "sha256", value_name = "HEX")]
    pub sha256: Option<String>,

    /// Release date (YYYY-MM-DD) instead of today.
    #[arg(long = "date", value_name = "DATE")]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Releases directory, relative to --root.
    #[arg(value_name = "RELEASES_DIR")]
    pub releases_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct RollbackArgs {
    /// Releases directory, relative to --root.
    #[arg(value_name = "RELEASES_DIR")]
    pub releases_dir: Option<PathBuf>,

    /// Release to activate (default: the one before the current release).
    #[arg(long = "to", value_name = "NAME")]
    pub to: Option<String>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => Self::ERROR,
            LogLevelArg::Warn => Self::WARN,
            LogLevelArg::Info => Self::INFO,
            LogLevelArg::Debug => Self::DEBUG,
            LogLevelArg::Trace => Self::TRACE,
        }
    }
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}
