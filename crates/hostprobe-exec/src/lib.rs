//! hostprobe-exec: command transports
//!
//! Provides the `RemoteExecutor` trait and its backends: the local shell,
//! SSH sessions and `docker`/`podman` exec into running containers.

pub mod container;
pub mod error;
pub mod keys;
pub mod local;
pub mod result;
pub mod ssh;
pub mod traits;

pub use container::{ContainerExecutor, ContainerRuntime};
pub use error::ExecError;
pub use keys::{Credentials, KeyError, ResolvedAuth};
pub use local::LocalExecutor;
pub use result::{CommandResult, ConnectionInfo};
pub use ssh::SshExecutor;
pub use traits::RemoteExecutor;

/// Quote a value for safe interpolation into a POSIX shell command
///
/// Wraps the value in single quotes; embedded single quotes become `'"'"'`.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\"'\"'"))
}
