//! CLI arguments and subcommands for nvsmi-watch.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Version string shown by `--version`, with the git revision when known.
fn long_version() -> &'static str {
    let sha = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown revision");
    Box::leak(format!("{} ({sha})", env!("CARGO_PKG_VERSION")).into_boxed_str())
}

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "nvsmi-watch",
    about = "Watch NVIDIA GPU power, utilization and compute processes",
    long_about = "Watch NVIDIA GPU power, utilization and compute processes.\n\n\
                  Polls nvidia-smi on a fixed cadence, reports compute processes as they \
                  start and finish, and prints per-device utilization with power totals \
                  while any process is running.",
    version,
    long_version = long_version(),
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Seconds between ticks (fractional allowed) [default: 1]
    #[arg(short = 'd', long)]
    pub delay: Option<f64>,

    /// Decimal digits for power values [default: 2]
    #[arg(short = 'p', long)]
    pub precision: Option<usize>,

    /// Path to the nvidia-smi executable
    #[arg(long)]
    pub smi_path: Option<String>,

    /// Prefix every line with the local time
    #[arg(long)]
    pub timestamps: bool,

    /// Do not print the GPU list at startup
    #[arg(long)]
    pub no_device_list: bool,

    /// Log level [default: warn]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and nvidia-smi availability
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run a fixed number of ticks and exit
    Test {
        /// Number of ticks
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Print timing for every tick
        #[arg(long)]
        verbose: bool,
    },

    /// List detected GPUs with their current utilization and power
    Devices,
}
