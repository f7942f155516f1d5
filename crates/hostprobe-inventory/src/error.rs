//! Error types for hostprobe-inventory

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving targets
///
/// All of them are fatal for a session: no partial target list is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Inventory file missing or unreadable
    #[error("inventory not found: {path}: {reason}")]
    NotFound {
        /// Path that was tried
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },

    /// Inventory could not be parsed or has the wrong structure
    #[error("malformed inventory: {0}")]
    Malformed(String),

    /// Inventory declares no hosts at all
    #[error("inventory declares no hosts")]
    Empty,

    /// Host pattern selected nothing
    #[error("no hosts match pattern '{0}'")]
    NoMatchingHosts(String),

    /// Declared connection type has no available backend
    #[error("host {host} uses unsupported transport '{transport}'")]
    UnsupportedTransport {
        /// Host identifier
        host: String,
        /// Connection type as declared
        transport: String,
    },

    /// Inventory path variable missing from the environment
    #[error("environment variable {0} not set")]
    EnvNotSet(String),
}
