//! `devices` command: one-shot listing of GPUs with power and utilization.

use anyhow::Result;
use nvsmi_watch::{summarize, CommandRunner, SmiQuery, SmiRunner};
use std::io::{self, Write};
use std::time::Duration;

use crate::config::Config;

pub async fn command_devices(config: &Config) -> Result<()> {
    let query = SmiQuery::new(CommandRunner::new(config.smi_path()));
    let precision = config.watch_settings()?.precision;
    print_devices(&query, precision, &mut io::stdout()).await
}

async fn print_devices<R: SmiRunner, W: Write>(
    query: &SmiQuery<R>,
    precision: usize,
    out: &mut W,
) -> Result<()> {
    let names = query.discover_devices().await?;
    if names.is_empty() {
        writeln!(out, "No GPUs reported by nvidia-smi")?;
        return Ok(());
    }

    writeln!(out, "Detected GPUs:")?;
    for name in &names {
        writeln!(out, "{name}")?;
    }

    let devices = query.query_devices().await?;
    let report = summarize(&devices, precision, Duration::ZERO)?;
    // Skip the "since launch" heading, meaningless for a one-shot listing.
    for line in report.lines().iter().skip(1) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
