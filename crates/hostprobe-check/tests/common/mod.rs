//! Scripted executors shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hostprobe_check::{CheckError, Connector, Host};
use hostprobe_exec::{CommandResult, ExecError, RemoteExecutor};
use hostprobe_inventory::Target;

pub const SYSTEMD: &str = "if command -v systemctl";
pub const PKG_TOOLS: &str = "for m in dpkg-query rpm apk pacman";
pub const SOCKET_TOOLS: &str = "if command -v ss";

/// Answers commands by prefix; anything unscripted exits 127
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Vec<(String, CommandResult)>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, prefix: &str, status: i32, stdout: &str, stderr: &str) -> Self {
        self.rules.push((
            prefix.to_string(),
            CommandResult {
                status,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                duration: Duration::from_millis(1),
            },
        ));
        self
    }

    /// A Debian-like host: dpkg, systemd and ss available
    pub fn debian() -> Self {
        Self::new()
            .on(PKG_TOOLS, 0, "dpkg-query\n", "")
            .on(SYSTEMD, 0, "systemd\n", "")
            .on(SOCKET_TOOLS, 0, "ss\n", "")
    }

    /// An init-script host: no systemd, so services go through `service`
    pub fn sysv() -> Self {
        Self::new().on(SYSTEMD, 0, "sysv\n", "")
    }

    pub fn commands(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        self.seen.lock().unwrap().push(cmd.to_string());
        let result = self
            .rules
            .iter()
            .find(|(prefix, _)| cmd.starts_with(prefix.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| CommandResult {
                status: 127,
                stdout: String::new(),
                stderr: format!("sh: {cmd}: not found"),
                duration: Duration::from_millis(1),
            });
        Ok(result)
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        _timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        self.run(cmd).await
    }

    fn executor_type(&self) -> &'static str {
        "scripted"
    }
}

/// Transport that never reaches its target
pub struct DownExecutor;

#[async_trait]
impl RemoteExecutor for DownExecutor {
    async fn run(&self, _cmd: &str) -> Result<CommandResult, ExecError> {
        Err(ExecError::ConnectionFailed("connection refused".to_string()))
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        _timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        self.run(cmd).await
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn executor_type(&self) -> &'static str {
        "down"
    }
}

pub fn host(id: &str, executor: impl RemoteExecutor + 'static) -> Host {
    Host::with_executor(Target::local(id), Arc::new(executor))
}

/// Hands out a scripted executor per target id; unknown targets fail to connect
pub struct ScriptedConnector {
    executors: Vec<(String, Arc<dyn RemoteExecutor>)>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            executors: Vec::new(),
        }
    }

    pub fn with(mut self, id: &str, executor: impl RemoteExecutor + 'static) -> Self {
        self.executors.push((id.to_string(), Arc::new(executor)));
        self
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, target: Target) -> Result<Host, CheckError> {
        let executor = self
            .executors
            .iter()
            .find(|(id, _)| *id == target.id)
            .map(|(_, executor)| Arc::clone(executor))
            .ok_or_else(|| CheckError::TargetUnreachable {
                target: target.id.clone(),
                reason: "no route to host".to_string(),
            })?;
        Ok(Host::with_executor(target, executor))
    }
}
