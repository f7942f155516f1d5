//! Container exec through the `docker` or `podman` CLI

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::error::ExecError;
use crate::local::LocalExecutor;
use crate::result::CommandResult;
use crate::shell_quote;
use crate::traits::RemoteExecutor;

/// Exit status the container CLIs use for their own failures
const RUNTIME_FAILURE_STATUS: i32 = 125;

/// Container runtime CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    /// CLI binary name
    #[must_use]
    pub fn binary(self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }
}

impl std::fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

/// Runs commands inside a running container via `<runtime> exec`
#[derive(Debug, Clone)]
pub struct ContainerExecutor {
    runtime: ContainerRuntime,
    container: String,
    user: Option<String>,
    local: LocalExecutor,
}

impl ContainerExecutor {
    /// Create an executor for a named container
    pub fn new(runtime: ContainerRuntime, container: impl Into<String>) -> Self {
        Self {
            runtime,
            container: container.into(),
            user: None,
            local: LocalExecutor::new(),
        }
    }

    /// Run commands as a specific user inside the container
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Container name or id
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Build the host-side command line wrapping `cmd`
    ///
    /// The locale is pinned inside the container as well.
    fn exec_cmd(&self, cmd: &str) -> String {
        let user = self
            .user
            .as_deref()
            .map(|u| format!("-u {} ", shell_quote(u)))
            .unwrap_or_default();
        format!(
            "{} exec -e LC_ALL=C {user}{} sh -c {}",
            self.runtime.binary(),
            shell_quote(&self.container),
            shell_quote(cmd)
        )
    }

    /// Separate runtime failures (container missing, daemon down) from the
    /// inner command's own exit status
    fn check_runtime(&self, result: CommandResult) -> Result<CommandResult, ExecError> {
        let daemon_error = result.stderr.contains("Error response from daemon")
            || result.stderr.contains("No such container")
            || result.stderr.contains("Cannot connect to the")
            || result.stderr.contains("no container with name or ID");

        if result.status == RUNTIME_FAILURE_STATUS || (daemon_error && !result.success()) {
            warn!(
                runtime = %self.runtime,
                container = %self.container,
                stderr = %result.stderr.trim(),
                "container exec failed"
            );
            return Err(ExecError::ConnectionFailed(format!(
                "{} exec into {}: {}",
                self.runtime,
                self.container,
                result.stderr.trim()
            )));
        }

        Ok(result)
    }
}

#[async_trait]
impl RemoteExecutor for ContainerExecutor {
    #[instrument(skip(self), fields(container = %self.container))]
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        let result = self.local.run(&self.exec_cmd(cmd)).await?;
        self.check_runtime(result)
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        let result = self
            .local
            .run_with_timeout(&self.exec_cmd(cmd), timeout)
            .await?;
        self.check_runtime(result)
    }

    fn executor_type(&self) -> &'static str {
        match self.runtime {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: i32, stderr: &str) -> CommandResult {
        CommandResult {
            status,
            stdout: String::new(),
            stderr: stderr.to_string(),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_exec_cmd_quotes_inner_command() {
        let executor = ContainerExecutor::new(ContainerRuntime::Docker, "instance");
        assert_eq!(
            executor.exec_cmd("systemctl is-active 'nginx'"),
            "docker exec -e LC_ALL=C 'instance' sh -c 'systemctl is-active '\"'\"'nginx'\"'\"''"
        );
    }

    #[test]
    fn test_exec_cmd_with_user() {
        let executor =
            ContainerExecutor::new(ContainerRuntime::Podman, "web1").with_user("www-data");
        assert_eq!(
            executor.exec_cmd("id"),
            "podman exec -e LC_ALL=C -u 'www-data' 'web1' sh -c 'id'"
        );
    }

    #[test]
    fn test_missing_container_is_connection_failure() {
        let executor = ContainerExecutor::new(ContainerRuntime::Docker, "gone");
        let err = executor
            .check_runtime(result(1, "Error response from daemon: No such container: gone"))
            .unwrap_err();
        assert!(matches!(err, ExecError::ConnectionFailed(_)));
    }

    #[test]
    fn test_inner_failure_is_passed_through() {
        let executor = ContainerExecutor::new(ContainerRuntime::Docker, "instance");
        let passed = executor
            .check_runtime(result(3, "Unit nginx.service could not be found."))
            .unwrap();
        assert_eq!(passed.status, 3);
    }
}
