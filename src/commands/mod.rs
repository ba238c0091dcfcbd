//! CLI command implementations for nvsmi-watch.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: nvidia-smi and configuration validation
//! - `config`: Configuration file generation
//! - `test`: Run a fixed number of ticks
//! - `devices`: One-shot device listing

pub mod check;
pub mod config;
pub mod devices;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use devices::command_devices;
pub use test::command_test;
