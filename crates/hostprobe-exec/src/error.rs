//! Error types for hostprobe-exec

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a transport while trying to run a command
///
/// Every variant means the target never delivered a command result. A
/// command that runs and exits non-zero is not an error at this layer; it
/// is reported through `CommandResult::status`.
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to connect to the target
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Command timed out
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// SSH key or credential error
    #[error("SSH key error: {0}")]
    SshKeyError(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error during execution
    #[error("I/O error: {0}")]
    IoError(String),

    /// Connection not established
    #[error("not connected")]
    NotConnected,
}
