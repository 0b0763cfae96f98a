//! Error types for vbox-vm.

use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for vbox-vm operations.
pub type Result<T> = std::result::Result<T, VmError>;

/// Errors that can occur while driving VBoxManage.
#[derive(Debug, Error)]
pub enum VmError {
    /// The addressed machine is not registered
    #[error("machine not found: {0}")]
    NotFound(String),

    /// A machine with this name is already registered
    #[error("machine already exists: {0}")]
    AlreadyExists(String),

    /// VBoxManage exited with a failure status
    #[error("VBoxManage {command} failed (exit code {code:?}): {stderr}")]
    Command {
        /// Subcommand and arguments that were run
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error, verbatim
        stderr: String,
    },

    /// A numeric field in machine-readable output did not parse
    #[error("invalid value {value:?} for {key}: {source}")]
    Parse {
        /// Key of the offending line
        key: String,
        /// Raw value text
        value: String,
        /// Underlying integer parse error
        #[source]
        source: ParseIntError,
    },

    /// Argument rejected before any invocation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// UUID supplied by the caller is malformed
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// Graceful stop never observed the machine powered off
    #[error("machine did not power off after {attempts} attempts ({waited:?})")]
    Timeout {
        /// Power-button presses issued
        attempts: u32,
        /// Total time spent polling
        waited: Duration,
    },

    /// The VBoxManage binary could not be located
    #[error("VBoxManage not found at {0}")]
    ToolNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VmError {
    /// Check if this error indicates an unregistered machine.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VmError::NotFound(_))
    }

    /// Check if retrying the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VmError::Timeout { .. } | VmError::Io(_))
    }
}
