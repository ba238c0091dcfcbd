//! nvsmi-watch library.
//!
//! Polls `nvidia-smi` on a fixed cadence, tracks which compute processes are
//! running on the GPUs and summarizes per-device power while any are.
//!
//! The binary adds CLI parsing, configuration files and signal handling on
//! top of [`scheduler::Scheduler`].

pub mod error;
pub mod query;
pub mod record;
pub mod report;
pub mod scheduler;
pub mod table;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{MalformedTableError, Result, WatchError};
pub use query::{CommandRunner, SmiQuery, SmiRunner};
pub use record::{DeviceRecord, ProcessRecord};
pub use report::{summarize, SummaryReport};
pub use scheduler::{Scheduler, TickOutcome, WatchSettings};
pub use tracker::{PresenceEvent, PresenceTracker};
