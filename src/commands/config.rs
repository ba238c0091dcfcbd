//! `config` command: writes a default configuration file.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files
pub fn command_config(output: Option<PathBuf>, format: ConfigFormat, commented: bool) -> Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from(default_file_name(format)));

    let mut content = render_config(&config, format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{content}");
    } else {
        fs::write(&output, content)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

fn default_file_name(format: ConfigFormat) -> &'static str {
    match format {
        ConfigFormat::Yaml => "nvsmi-watch.yaml",
        ConfigFormat::Json => "nvsmi-watch.json",
        ConfigFormat::Toml => "nvsmi-watch.toml",
    }
}

fn add_config_comments(yaml: String) -> String {
    let comments = r#"# nvsmi-watch configuration
#
# Searched in /etc/nvsmi-watch/config.{yaml,yml,json,toml} and
# ./nvsmi-watch.{yaml,yml,json,toml} unless --config is given.
# Command-line flags override every value below.
#
# delay_seconds: 1.0             # Tick budget in seconds, fractional allowed, > 0
# precision: 2                   # Decimal digits for power values
# smi_path: nvidia-smi           # Executable to query
# timestamps: false              # Prefix console lines with local time
# list_devices_on_start: true    # Print `nvidia-smi -L` output once at startup
# log_level: warn                # off | error | warn | info | debug | trace
"#;

    format!("{comments}\n{yaml}")
}
