//! Per-device power/utilization summary.
//!
//! Power values are rendered with `{:.N}` formatting, which rounds the exact
//! binary value half to even. The same rendering is used for every device
//! line and for the totals.

use std::time::Duration;

use crate::error::{Result, WatchError};
use crate::record::DeviceRecord;

/// One device's contribution to a summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLine {
    pub index: String,
    pub utilization: Option<f64>,
    pub power_draw: f64,
    pub power_limit: f64,
}

/// Summary of all devices for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub devices: Vec<DeviceLine>,
    pub total_draw: f64,
    pub total_limit: f64,
    pub precision: usize,
    pub since_launch: Duration,
}

/// Builds the summary. A device reporting N/A power is an error naming that
/// device: totals are never computed over a subset.
pub fn summarize(
    devices: &[DeviceRecord],
    precision: usize,
    since_launch: Duration,
) -> Result<SummaryReport> {
    let mut lines = Vec::with_capacity(devices.len());
    for dev in devices {
        let power_draw = dev.power_draw.ok_or_else(|| WatchError::Aggregation {
            device: dev.index.clone(),
            field: "power.draw",
        })?;
        let power_limit = dev.power_limit.ok_or_else(|| WatchError::Aggregation {
            device: dev.index.clone(),
            field: "power.max_limit",
        })?;
        lines.push(DeviceLine {
            index: dev.index.clone(),
            utilization: dev.utilization,
            power_draw,
            power_limit,
        });
    }

    Ok(SummaryReport {
        // An empty f64 `sum()` is -0.0; fold from +0.0 instead.
        total_draw: lines.iter().fold(0.0, |acc, l| acc + l.power_draw),
        total_limit: lines.iter().fold(0.0, |acc, l| acc + l.power_limit),
        devices: lines,
        precision,
        since_launch,
    })
}

impl SummaryReport {
    /// `"<draw>/<limit> W"` for the totals.
    pub fn total_text(&self) -> String {
        self.power_text(self.total_draw, self.total_limit)
    }

    fn power_text(&self, draw: f64, limit: f64) -> String {
        let p = self.precision;
        format!("{draw:.p$}/{limit:.p$} W")
    }

    /// Console lines: heading, one line per device, totals.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.devices.len() + 2);
        out.push(format!(
            "@ {:.1}s since launch",
            self.since_launch.as_secs_f64()
        ));
        for dev in &self.devices {
            let util = match dev.utilization {
                Some(u) => format!("{u}%"),
                None => "N/A".to_string(),
            };
            out.push(format!(
                "{}: {} {}",
                dev.index,
                util,
                self.power_text(dev.power_draw, dev.power_limit)
            ));
        }
        out.push(format!("Total: {}", self.total_text()));
        out
    }
}
