//! Error types for the script debugger
//!
//! Errors raised inside the interactive command loop never reach this type:
//! they are user-facing messages printed to the error stream (see
//! [`crate::debugger::CommandError`]). This type covers everything that can
//! fail around the core: configuration, trace files, scenarios and IO.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the script debugger
#[derive(Error, Debug)]
pub enum Error {
    // === Runtime/Trace Errors ===
    #[error("Script {0} is not defined in the trace")]
    UnknownScript(i64),

    #[error("Function '{0}' is not defined in the trace")]
    UnknownFunction(String),

    #[error("Invalid trace: {0}")]
    InvalidTrace(String),

    #[error("Failed to parse trace: {0}")]
    TraceParse(String),

    // === Breakpoint Errors ===
    #[error("Invalid breakpoint location: {0}")]
    InvalidLocation(String),

    #[error("'{0}' is not a callable value")]
    NotCallable(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file read error for the given path
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create an invalid trace error
    pub fn invalid_trace<S: Into<String>>(message: S) -> Self {
        Self::InvalidTrace(message.into())
    }
}
