//! Remote executor trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// A transport able to run shell commands on one target
///
/// Implementations return `Ok` for any command that ran, whatever its exit
/// status, and `Err` only when the transport itself failed.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a shell command
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError>;

    /// Run a shell command, failing with `ExecError::Timeout` past `timeout`
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Whether a live session exists (always true for sessionless transports)
    fn is_connected(&self) -> bool {
        true
    }

    /// Short transport name for logs
    fn executor_type(&self) -> &'static str;
}
