//! Error types for nvsmi-watch.
//!
//! Every failure inside a tick is fatal to the watch loop, so the variants
//! here exist to tell the operator *what* drifted: the tool's output format,
//! the tool itself, or the numbers it reported.

use thiserror::Error;

/// The CSV text returned by `nvidia-smi` did not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedTableError {
    #[error("line {line}: expected {expected} cells, found {found}")]
    ArityMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("field '{field}': cannot parse '{cell}' as a number")]
    InvalidNumber { field: String, cell: String },

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}': unexpected value '{value}'")]
    InvalidValue { field: String, value: String },
}

/// Errors that terminate the watch loop.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("malformed nvidia-smi output: {0}")]
    MalformedTable(#[from] MalformedTableError),

    #[error("command '{command}' failed ({status}): {output}")]
    ExternalTool {
        command: String,
        status: String,
        output: String,
    },

    #[error("device {device} reports N/A for '{field}', cannot compute power totals")]
    Aggregation { device: String, field: &'static str },

    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type alias for the watch library.
pub type Result<T> = std::result::Result<T, WatchError>;
