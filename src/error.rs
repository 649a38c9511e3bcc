//! Error types for the launcher.

use std::path::PathBuf;

/// Result type alias for launcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for an unexpected runtime fault.
pub const EXIT_FAULT: i32 = 1;
/// Exit code for malformed command line input.
pub const EXIT_SYNTAX: i32 = 2;
/// Exit code for semantically invalid configuration.
pub const EXIT_CONFIG: i32 = 3;
/// Exit code for a failed execution.
pub const EXIT_EXECUTION: i32 = 4;

/// Errors that can occur in the launcher.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Command Line Errors
    // =========================================================================
    /// Malformed command line tokens.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Semantically invalid inputs (bad paths, unparseable values, conflicts).
    #[error("invalid configuration: {0}")]
    Config(String),

    // =========================================================================
    // Instance Errors
    // =========================================================================
    /// The instance lock is held by another process.
    #[error("instance is busy: {0}")]
    InstanceBusy(PathBuf),

    /// An on-disk instance operation failed.
    #[error("instance I/O failure at {path}: {reason}")]
    InstanceIo { path: PathBuf, reason: String },

    // =========================================================================
    // Container Errors
    // =========================================================================
    /// A container lifecycle operation failed.
    #[error("container {operation} failed: {reason}")]
    Container { operation: String, reason: String },

    /// A single bundle operation failed. Logged per bundle during plan
    /// execution, never propagated out of it.
    #[error("bundle operation failed for '{location}': {reason}")]
    BundleOp { location: String, reason: String },

    // =========================================================================
    // Command Channel Errors
    // =========================================================================
    /// The cipher or digest support is not usable.
    #[error("crypto unavailable: {0}")]
    CryptoUnavailable(String),

    /// UDP send/recv or bind failure.
    #[error("transport failure: {0}")]
    Transport(String),

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// The operation was cancelled before it started running.
    #[error("cancelled")]
    Cancelled,

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Maps the error to the process exit code. Used only at the top level
    /// of the command binary; library code never inspects exit codes.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Syntax(_) => EXIT_SYNTAX,
            Error::Config(_) | Error::CryptoUnavailable(_) => EXIT_CONFIG,
            Error::InstanceBusy(_)
            | Error::InstanceIo { .. }
            | Error::Container { .. }
            | Error::BundleOp { .. }
            | Error::Transport(_)
            | Error::Io(_) => EXIT_EXECUTION,
            Error::Cancelled => EXIT_SUCCESS,
        }
    }

    /// Convenience constructor for instance I/O failures.
    pub fn instance_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Error::InstanceIo {
            path: path.into(),
            reason: error.to_string(),
        }
    }
}
