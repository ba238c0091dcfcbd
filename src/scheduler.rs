//! The fixed-cadence watch loop.
//!
//! Each tick queries the compute processes, reports presence changes and,
//! while anything runs on a GPU, a power summary. The tick then sleeps for
//! whatever is left of its budget. A tick that overran its budget is
//! reported and the next one starts at once; ticks are never skipped.

use chrono::Local;
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::query::{SmiQuery, SmiRunner};
use crate::report::{summarize, SummaryReport};
use crate::tracker::{PresenceEvent, PresenceTracker};

/// Line printed after every summary.
pub const SEPARATOR: &str = "---";

/// Runtime knobs for the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSettings {
    /// Budget for one tick. Must be non-zero.
    pub delay: Duration,
    /// Decimal digits for power values.
    pub precision: usize,
    /// Prefix console lines with local wall-clock time.
    pub timestamps: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            precision: 2,
            timestamps: false,
        }
    }
}

/// What one tick observed and how long it took.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub events: Vec<PresenceEvent>,
    pub summary: Option<SummaryReport>,
    pub elapsed: Duration,
    /// Set when `elapsed` reached the budget; no sleep happened.
    pub overrun: Option<Duration>,
}

/// Drives ticks and writes the console report to `out`.
pub struct Scheduler<R, W> {
    query: SmiQuery<R>,
    tracker: PresenceTracker,
    settings: WatchSettings,
    out: W,
    launched_at: Instant,
    ticks: u64,
}

impl<R: SmiRunner, W: Write> Scheduler<R, W> {
    pub fn new(query: SmiQuery<R>, settings: WatchSettings, out: W) -> Self {
        Self {
            query,
            tracker: PresenceTracker::new(),
            settings,
            out,
            launched_at: Instant::now(),
            ticks: 0,
        }
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Prints the GPUs `nvidia-smi -L` reports, once, before the first tick.
    pub async fn announce_devices(&mut self) -> Result<Vec<String>> {
        let devices = self.query.discover_devices().await?;
        self.emit("Detected GPUs:")?;
        for dev in &devices {
            self.emit(dev)?;
        }
        Ok(devices)
    }

    /// Runs ticks until an error occurs. Cancel the future to stop.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Watching with {:.3}s delay, precision {}",
            self.settings.delay.as_secs_f64(),
            self.settings.precision
        );
        loop {
            self.tick().await?;
        }
    }

    /// Optionally announces the devices, then ticks until `shutdown` resolves
    /// or a tick fails. An in-flight invocation is dropped on shutdown, which
    /// kills the child process.
    ///
    /// Returns `true` when stopped by `shutdown`, after printing
    /// "Program interrupted".
    pub async fn run_until<F>(&mut self, announce: bool, shutdown: F) -> Result<bool>
    where
        F: Future<Output = ()>,
    {
        let interrupted = {
            let watch = async {
                if announce && self.announce_devices().await?.is_empty() {
                    warn!("nvidia-smi reports no GPUs; watching anyway");
                }
                self.run().await
            };

            tokio::select! {
                result = watch => {
                    result?;
                    false
                }
                _ = shutdown => true,
            }
        };

        if interrupted {
            self.emit("Program interrupted")?;
        }
        Ok(interrupted)
    }

    /// Runs exactly `iterations` ticks.
    pub async fn run_for(&mut self, iterations: usize) -> Result<()> {
        for _ in 0..iterations {
            self.tick().await?;
        }
        Ok(())
    }

    /// One iteration, including its trailing sleep.
    #[instrument(skip(self), fields(tick = self.ticks))]
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let start = Instant::now();
        self.ticks += 1;

        let observed = self.query.query_processes().await?;
        let events = self.tracker.reconcile(&observed);
        for event in &events {
            self.emit(&event.to_string())?;
        }

        let summary = if observed.is_empty() {
            None
        } else {
            let devices = self.query.query_devices().await?;
            let report = summarize(
                &devices,
                self.settings.precision,
                self.launched_at.elapsed(),
            )?;
            for line in report.lines() {
                self.emit(&line)?;
            }
            self.emit(SEPARATOR)?;
            Some(report)
        };

        let elapsed = start.elapsed();
        let overrun = self.settle(elapsed).await?;

        Ok(TickOutcome {
            events,
            summary,
            elapsed,
            overrun,
        })
    }

    /// Sleeps for the rest of the budget, or reports the overrun.
    async fn settle(&mut self, elapsed: Duration) -> Result<Option<Duration>> {
        let budget = self.settings.delay;
        if elapsed < budget {
            let remaining = budget - elapsed;
            debug!(
                "Tick took {:.3}ms, sleeping {:.3}ms",
                elapsed.as_secs_f64() * 1000.0,
                remaining.as_secs_f64() * 1000.0
            );
            sleep(remaining).await;
            return Ok(None);
        }

        let overrun = elapsed - budget;
        debug!(
            "Tick took {:.3}ms, over budget by {:.3}ms",
            elapsed.as_secs_f64() * 1000.0,
            overrun.as_secs_f64() * 1000.0
        );
        self.emit(&format!(
            "Warning: overlap iteration {:.3} s",
            overrun.as_secs_f64()
        ))?;
        Ok(Some(overrun))
    }

    fn emit(&mut self, line: &str) -> Result<()> {
        if self.settings.timestamps {
            writeln!(self.out, "{} {}", Local::now().format("%H:%M:%S%.3f"), line)?;
        } else {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()?;
        Ok(())
    }
}
