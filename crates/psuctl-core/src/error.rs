//! Error types for PSU control.
//!
//! Every failure the library can surface folds into [`PsuError`]. The
//! variants mirror the layers of the tool: device I/O, protocol-level reply
//! verification, numeric reply parsing, the telemetry log file, and run
//! parameter validation. None of them is retried anywhere — a failed
//! operation is reported and the tool is re-invoked by hand.

use thiserror::Error;

/// Convenience alias for results using the library error type.
pub type Result<T> = std::result::Result<T, PsuError>;

#[derive(Error, Debug)]
pub enum PsuError {
    /// Device open/read/write failure. Fatal to the current operation.
    #[error("device I/O error: {0}")]
    Transport(#[from] std::io::Error),

    /// A reply failed shape or status verification. Fatal to the whole
    /// invocation at bring-up, to the current operation elsewhere.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A reply was not a valid number where one was expected.
    #[error("could not parse reply '{reply}' as a number: {source}")]
    Parse {
        reply: String,
        source: std::num::ParseFloatError,
    },

    /// The telemetry log file could not be created or written.
    #[error("telemetry log error: {0}")]
    Sink(#[source] std::io::Error),

    /// A run parameter was out of range before any I/O was attempted.
    #[error("invalid configuration: {0}")]
    Config(String),
}
