//! Connected targets

use std::sync::Arc;
use std::time::Duration;

use hostprobe_exec::{
    CommandResult, ConnectionInfo, ContainerExecutor, Credentials, ExecError, LocalExecutor,
    RemoteExecutor, SshExecutor,
};
use hostprobe_inventory::{Target, Transport};
use tracing::debug;

use crate::error::CheckError;
use crate::inspector;
use crate::query::StateQuery;
use crate::result::StateResult;

/// Transport-level execution options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Upper bound on any single command, including SSH connection setup
    pub command_timeout: Option<Duration>,
}

/// A target paired with the executor that reaches it
pub struct Host {
    target: Target,
    executor: Arc<dyn RemoteExecutor>,
    options: ExecOptions,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("target", &self.target.id)
            .field("executor", &self.executor.executor_type())
            .field("options", &self.options)
            .finish()
    }
}

impl Host {
    /// Build the executor for a target's transport
    ///
    /// SSH sessions are opened lazily by the first command, so this only
    /// fails when credentials cannot be resolved.
    ///
    /// # Errors
    /// Returns `CheckError::TargetUnreachable` if the transport cannot be set up
    pub fn connect(target: Target, options: ExecOptions) -> Result<Self, CheckError> {
        let executor = build_executor(&target)?;
        debug!(target = %target.id, executor = executor.executor_type(), "host ready");
        Ok(Self {
            target,
            executor,
            options,
        })
    }

    /// Pair a target with an existing executor
    pub fn with_executor(target: Target, executor: Arc<dyn RemoteExecutor>) -> Self {
        Self {
            target,
            executor,
            options: ExecOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> &str {
        &self.target.id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn executor_type(&self) -> &'static str {
        self.executor.executor_type()
    }

    /// Run a command, honoring the configured timeout
    ///
    /// # Errors
    /// Returns the transport's `ExecError`
    pub async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        match self.options.command_timeout {
            Some(timeout) => self.executor.run_with_timeout(cmd, timeout).await,
            None => self.executor.run(cmd).await,
        }
    }

    /// Inspect one aspect of this host
    ///
    /// # Errors
    /// See [`inspector::inspect`]
    pub async fn inspect(&self, query: &StateQuery) -> Result<StateResult, CheckError> {
        inspector::inspect(self, query).await
    }
}

/// Turns targets into hosts; the seam the suite runner connects through
pub trait Connector: Send + Sync {
    /// Prepare a host for a target
    ///
    /// # Errors
    /// Returns `CheckError::TargetUnreachable` if the transport cannot be set up
    fn connect(&self, target: Target) -> Result<Host, CheckError>;
}

/// Connector backed by the real transports
#[derive(Debug, Clone, Default)]
pub struct TransportConnector {
    options: ExecOptions,
}

impl TransportConnector {
    pub fn new(options: ExecOptions) -> Self {
        Self { options }
    }
}

impl Connector for TransportConnector {
    fn connect(&self, target: Target) -> Result<Host, CheckError> {
        Host::connect(target, self.options.clone())
    }
}

fn build_executor(target: &Target) -> Result<Arc<dyn RemoteExecutor>, CheckError> {
    match &target.transport {
        Transport::Local => Ok(Arc::new(LocalExecutor::new())),
        Transport::Ssh(ssh) => {
            let credentials = match (&ssh.private_key_file, &ssh.password) {
                (Some(path), _) => Credentials::KeyPath(path.clone()),
                (None, Some(password)) => Credentials::Password(password.clone()),
                (None, None) => Credentials::DefaultKeys,
            };
            let conn_info = ConnectionInfo::new(&ssh.address, &ssh.user).with_port(ssh.port);
            let executor = SshExecutor::new(conn_info, &credentials).map_err(|e| {
                CheckError::TargetUnreachable {
                    target: target.id.clone(),
                    reason: e.to_string(),
                }
            })?;
            Ok(Arc::new(executor))
        }
        Transport::Container {
            runtime,
            container,
            user,
        } => {
            let mut executor = ContainerExecutor::new(*runtime, container.clone());
            if let Some(user) = user {
                executor = executor.with_user(user.clone());
            }
            Ok(Arc::new(executor))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use hostprobe_exec::ContainerRuntime;
    use hostprobe_inventory::SshParams;

    use super::*;

    #[test]
    fn test_local_target_uses_local_executor() {
        let host = Host::connect(Target::local("web1"), ExecOptions::default()).unwrap();
        assert_eq!(host.executor_type(), "local");
        assert_eq!(host.id(), "web1");
    }

    #[test]
    fn test_container_target() {
        let mut target = Target::local("db1");
        target.transport = Transport::Container {
            runtime: ContainerRuntime::Podman,
            container: "molecule-db1".into(),
            user: None,
        };
        let host = Host::connect(target, ExecOptions::default()).unwrap();
        assert_eq!(host.executor_type(), "podman");
    }

    #[test]
    fn test_ssh_with_missing_key_is_unreachable() {
        let mut target = Target::local("web2");
        target.transport = Transport::Ssh(SshParams {
            address: "10.0.0.2".into(),
            port: 22,
            user: "deploy".into(),
            private_key_file: Some(PathBuf::from("/nonexistent/id_ed25519")),
            password: None,
        });

        let err = TransportConnector::default().connect(target).unwrap_err();
        assert!(matches!(err, CheckError::TargetUnreachable { target, .. } if target == "web2"));
    }
}
