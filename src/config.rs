//! Configuration management for nvsmi-watch.
//!
//! Precedence is CLI (if provided) > config file > default. Config files may
//! be YAML, JSON or TOML; the format is picked from the file extension.

use anyhow::{anyhow, bail, Context, Result};
use nvsmi_watch::query::DEFAULT_SMI_PATH;
use nvsmi_watch::WatchSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_DELAY_SECONDS: f64 = 1.0;
pub const DEFAULT_PRECISION: usize = 2;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Locations searched when no `--config` is given, first match wins.
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/nvsmi-watch/config.yaml",
    "/etc/nvsmi-watch/config.yml",
    "/etc/nvsmi-watch/config.json",
    "/etc/nvsmi-watch/config.toml",
    "./nvsmi-watch.yaml",
    "./nvsmi-watch.yml",
    "./nvsmi-watch.json",
    "./nvsmi-watch.toml",
];

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Effective configuration. Every field is optional in files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Loop
    #[serde(alias = "delay")]
    pub delay_seconds: Option<f64>,
    pub precision: Option<usize>,

    // Tool
    #[serde(alias = "smi-path")]
    pub smi_path: Option<String>,

    // Output
    pub timestamps: Option<bool>,
    #[serde(alias = "list-devices-on-start")]
    pub list_devices_on_start: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delay_seconds: Some(DEFAULT_DELAY_SECONDS),
            precision: Some(DEFAULT_PRECISION),
            smi_path: Some(DEFAULT_SMI_PATH.to_string()),
            timestamps: Some(false),
            list_devices_on_start: Some(true),
            log_level: Some(DEFAULT_LOG_LEVEL.into()),
        }
    }
}

impl Config {
    pub fn smi_path(&self) -> &str {
        self.smi_path.as_deref().unwrap_or(DEFAULT_SMI_PATH)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    fn delay(&self) -> Result<Duration> {
        let secs = self.delay_seconds.unwrap_or(DEFAULT_DELAY_SECONDS);
        if !secs.is_finite() || secs <= 0.0 {
            bail!("delay_seconds must be > 0, got {secs}");
        }
        Duration::try_from_secs_f64(secs)
            .map_err(|e| anyhow!("delay_seconds {secs} is out of range: {e}"))
    }

    /// Settings for the watch loop. Call after validation.
    pub fn watch_settings(&self) -> Result<WatchSettings> {
        Ok(WatchSettings {
            delay: self.delay()?,
            precision: self.precision.unwrap_or(DEFAULT_PRECISION),
            timestamps: self.timestamps.unwrap_or(false),
        })
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    cfg.delay()?;

    if cfg.smi_path().trim().is_empty() {
        bail!("smi_path must not be empty");
    }

    let level = cfg.log_level();
    if !LOG_LEVELS.contains(&level) {
        bail!(
            "Invalid log_level '{}', expected one of {}",
            level,
            LOG_LEVELS.join(", ")
        );
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if args.delay.is_some() {
        config.delay_seconds = args.delay;
    }
    if args.precision.is_some() {
        config.precision = args.precision;
    }
    if let Some(path) = &args.smi_path {
        config.smi_path = Some(path.clone());
    }
    if args.timestamps {
        config.timestamps = Some(true);
    }
    if args.no_device_list {
        config.list_devices_on_start = Some(false);
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    Ok(config)
}

/// Loads a config file, or the first default location that exists.
/// No file at all means defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("Config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
        {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    // Fields absent from the file keep their defaults via #[serde(default)].
    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders a config in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
