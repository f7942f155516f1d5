//! Inspection commands on the machine running hostprobe

use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::CommandResult;
use crate::traits::RemoteExecutor;

/// Runs commands through `sh -c` on this machine
///
/// Used for `ansible_connection=local` hosts and as the process layer under
/// [`ContainerExecutor`](crate::ContainerExecutor). Commands run under the C
/// locale with stdin closed, so tools print the untranslated messages the
/// inspection strategies match on and never wait for input.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn command(cmd: &str) -> Command {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(cmd)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    #[instrument(skip(self), level = "debug")]
    async fn execute(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        let output = Self::command(cmd)
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let result = CommandResult {
            status: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        };

        debug!(
            command = %cmd,
            status = result.status,
            duration = ?result.duration,
            "local command completed"
        );

        Ok(result)
    }
}

/// Exit code as a shell reports it: `128 + N` when killed by signal N
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        self.execute(cmd).await
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout_duration: Duration,
    ) -> Result<CommandResult, ExecError> {
        // dropping the future kills the child
        timeout(timeout_duration, self.execute(cmd))
            .await
            .unwrap_or_else(|_| {
                error!(command = %cmd, timeout = ?timeout_duration, "local command timed out");
                Err(ExecError::Timeout {
                    timeout: timeout_duration,
                })
            })
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell_quote;

    #[tokio::test]
    async fn test_pipeline_runs_in_shell() {
        let result = LocalExecutor::new()
            .run("printf 'nginx\\nsshd\\n' | grep -c d")
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, "1\n");
    }

    #[tokio::test]
    async fn test_quoted_subject_reaches_command_verbatim() {
        let subject = "it's here; echo pwned";
        let result = LocalExecutor::new()
            .run(&format!("printf %s {}", shell_quote(subject)))
            .await
            .unwrap();

        assert_eq!(result.stdout, subject);
    }

    #[tokio::test]
    async fn test_exit_status_is_preserved() {
        // `service NAME status` exits 3 for a stopped service
        let result = LocalExecutor::new().run("exit 3").await.unwrap();

        assert!(!result.success());
        assert_eq!(result.status, 3);
    }

    #[tokio::test]
    async fn test_signal_death_reports_shell_status() {
        let result = LocalExecutor::new().run("kill -TERM $$").await.unwrap();

        assert_eq!(result.status, 128 + 15);
    }

    #[tokio::test]
    async fn test_stderr_is_untranslated() {
        let result = LocalExecutor::new()
            .run("LANG=de_DE.UTF-8 ls /nonexistent-hostprobe-path")
            .await
            .unwrap();

        assert!(!result.success());
        assert!(result.stdout.is_empty());
        assert!(result.stderr.contains("No such file or directory"));
    }

    #[tokio::test]
    async fn test_stdin_is_closed() {
        let result = LocalExecutor::new()
            .run_with_timeout("cat", Duration::from_secs(5))
            .await
            .unwrap();

        assert!(result.success());
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_slow_command_times_out() {
        let result = LocalExecutor::new()
            .run_with_timeout("sleep 5", Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(ExecError::Timeout { .. })));
    }
}
