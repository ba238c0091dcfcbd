//! `nvidia-smi` invocation and result decoding.
//!
//! [`SmiQuery`] owns the three fixed command shapes the watcher needs. The
//! actual process spawning sits behind [`SmiRunner`] so the loop can be
//! driven by canned output in tests.

use std::future::Future;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument, trace};

use crate::error::{Result, WatchError};
use crate::record::{DeviceRecord, ProcessRecord};
use crate::table::{parse_table, parse_table_with};

/// Executable used when no path is configured.
pub const DEFAULT_SMI_PATH: &str = "nvidia-smi";

/// Fields requested from `--query-compute-apps`.
pub const PROCESS_FIELDS: &[&str] = &["pid", "process_name", "gpu_uuid"];

/// Fields requested from `--query-gpu`. `index` is needed for report lines.
pub const DEVICE_FIELDS: &[&str] = &[
    "index",
    "gpu_uuid",
    "utilization.gpu",
    "power.draw",
    "power.max_limit",
];

/// Runs the query tool with the given arguments and returns its stdout.
///
/// Implementations must map a missing executable or a nonzero exit to
/// [`WatchError::ExternalTool`].
pub trait SmiRunner {
    fn run(&self, args: &[String]) -> impl Future<Output = Result<String>> + Send;
}

/// Spawns the real executable through `tokio::process`.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SMI_PATH)
    }
}

impl SmiRunner for CommandRunner {
    async fn run(&self, args: &[String]) -> Result<String> {
        let command = self.command_line(args);
        debug!("Running {}", command);

        // The child is killed if the tick is cancelled mid-invocation.
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| WatchError::ExternalTool {
                command: command.clone(),
                status: format!("could not be started: {e}"),
                output: String::new(),
            })?;

        if !output.status.success() {
            let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
            captured.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(WatchError::ExternalTool {
                command,
                status: output.status.to_string(),
                output: captured.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("{} returned {} bytes", command, stdout.len());
        Ok(stdout)
    }
}

/// The three queries the watcher issues each run.
#[derive(Debug, Clone)]
pub struct SmiQuery<R> {
    runner: R,
}

impl<R: SmiRunner> SmiQuery<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// `nvidia-smi -L`: one identity line per GPU. No GPUs is not an error.
    #[instrument(skip(self))]
    pub async fn discover_devices(&self) -> Result<Vec<String>> {
        let text = self.runner.run(&["-L".to_string()]).await?;
        let devices: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        debug!("Discovered {} devices", devices.len());
        Ok(devices)
    }

    /// Active compute processes across all GPUs.
    #[instrument(skip(self))]
    pub async fn query_processes(&self) -> Result<Vec<ProcessRecord>> {
        let args = query_args("--query-compute-apps", PROCESS_FIELDS);
        let text = self.runner.run(&args).await?;
        // Command lines may contain commas; the tool does not quote them.
        let records = parse_table_with(&text, Some("process_name"))?;
        let processes = records
            .iter()
            .map(ProcessRecord::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Observed {} compute processes", processes.len());
        Ok(processes)
    }

    /// Utilization and power for every GPU.
    #[instrument(skip(self))]
    pub async fn query_devices(&self) -> Result<Vec<DeviceRecord>> {
        let args = query_args("--query-gpu", DEVICE_FIELDS);
        let text = self.runner.run(&args).await?;
        let records = parse_table(&text)?;
        let devices = records
            .iter()
            .map(DeviceRecord::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Queried {} devices", devices.len());
        Ok(devices)
    }
}

fn query_args(flag: &str, fields: &[&str]) -> Vec<String> {
    vec![
        format!("{}={}", flag, fields.join(",")),
        "--format=csv".to_string(),
    ]
}
