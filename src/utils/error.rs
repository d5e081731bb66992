//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while launching or supervising the child process
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Command line is empty, nothing to run")]
    EmptyCommand,

    #[error("Failed to create pipe: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Child process exited unsuccessfully: {0}")]
    ExitStatus(ExitStatus),

    #[error("Child process was cancelled")]
    Cancelled,

    #[error("Pipe writer was already consumed by a previous run")]
    AlreadyRun,
}

/// Errors that can terminate the trace parser loop
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read trace source: {0}")]
    Read(#[from] std::io::Error),

    #[error("Parser was cancelled")]
    Cancelled,

    #[error("Consumer of the {0} channel went away")]
    Disconnected(&'static str),
}

/// Errors that can occur while compiling the trace grammars
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Invalid {name} pattern: {source}")]
    Compile {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Errors that can occur while writing events to a sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write event: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}
