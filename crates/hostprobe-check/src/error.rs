//! Error types for hostprobe-check

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a single inspection
///
/// A false predicate is never an error. These variants describe queries
/// that could not produce a result at all; each is scoped to one case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Transport could not connect or deliver the command
    #[error("{target}: target unreachable: {reason}")]
    TargetUnreachable {
        /// Target identifier
        target: String,
        /// Transport error
        reason: String,
    },

    /// The inspection command itself errored
    #[error("{target}: `{command}` failed with status {status}")]
    CommandFailed {
        /// Target identifier
        target: String,
        /// Command that failed
        command: String,
        /// Exit status
        status: i32,
        /// Raw diagnostic output
        output: String,
    },

    /// Output did not have the expected format
    #[error("{target}: unparsable output from `{command}`: {reason}")]
    UnparsableOutput {
        /// Target identifier
        target: String,
        /// Command whose output was rejected
        command: String,
        /// What did not match
        reason: String,
        /// Raw diagnostic output
        output: String,
    },

    /// Query subject missing or malformed
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Serializable classification of `CheckError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TargetUnreachable,
    CommandFailed,
    UnparsableOutput,
    InvalidQuery,
}

impl CheckError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckError::TargetUnreachable { .. } => ErrorKind::TargetUnreachable,
            CheckError::CommandFailed { .. } => ErrorKind::CommandFailed,
            CheckError::UnparsableOutput { .. } => ErrorKind::UnparsableOutput,
            CheckError::InvalidQuery(_) => ErrorKind::InvalidQuery,
        }
    }

    /// Raw command output attached to the error, if any
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            CheckError::CommandFailed { output, .. }
            | CheckError::UnparsableOutput { output, .. } => Some(output),
            CheckError::TargetUnreachable { .. } | CheckError::InvalidQuery(_) => None,
        }
    }
}

/// Errors raised while loading a suite
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuiteError {
    /// Suite file could not be read
    #[error("cannot read suite {path}: {reason}")]
    Io {
        /// Suite path
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },

    /// TOML syntax or schema error
    #[error("suite parse error: {0}")]
    Parse(String),

    /// A check is inconsistent
    #[error("check '{name}': {reason}")]
    InvalidCheck {
        /// Check name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Suite has no checks
    #[error("suite declares no checks")]
    Empty,
}
