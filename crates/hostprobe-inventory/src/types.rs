//! Target type definitions

use std::collections::BTreeMap;
use std::path::PathBuf;

use hostprobe_exec::ContainerRuntime;
use serde::{Deserialize, Serialize};

/// One addressable host or container under test
///
/// Created by the resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Inventory host name
    pub id: String,
    /// How commands reach the target
    pub transport: Transport,
    /// Groups the host belongs to, outermost first
    #[serde(default)]
    pub groups: Vec<String>,
    /// Effective inventory variables (group vars overridden by host vars)
    #[serde(default)]
    pub vars: BTreeMap<String, serde_yaml::Value>,
}

impl Target {
    /// Target using the local shell
    pub fn local(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transport: Transport::Local,
            groups: Vec::new(),
            vars: BTreeMap::new(),
        }
    }

    /// Whether the target belongs to a group
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Human-readable address for listings
    #[must_use]
    pub fn address(&self) -> String {
        match &self.transport {
            Transport::Local => "localhost".to_string(),
            Transport::Ssh(ssh) => format!("{}@{}:{}", ssh.user, ssh.address, ssh.port),
            Transport::Container {
                runtime, container, ..
            } => format!("{runtime}://{container}"),
        }
    }
}

/// Connection mechanism for a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transport {
    /// Commands run on this machine
    Local,
    /// Commands run over SSH
    Ssh(SshParams),
    /// Commands run through `<runtime> exec`
    Container {
        runtime: ContainerRuntime,
        container: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
    },
}

impl Transport {
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Local => TransportKind::Local,
            Transport::Ssh(_) => TransportKind::Ssh,
            Transport::Container {
                runtime: ContainerRuntime::Docker,
                ..
            } => TransportKind::Docker,
            Transport::Container {
                runtime: ContainerRuntime::Podman,
                ..
            } => TransportKind::Podman,
        }
    }
}

/// SSH connection parameters
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshParams {
    /// Host name or IP address
    pub address: String,
    /// Port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Private key file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_file: Option<PathBuf>,
    /// Login password (never serialized)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl std::fmt::Debug for SshParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshParams")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("private_key_file", &self.private_key_file)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Transport backends the resolver can hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Local,
    Ssh,
    Docker,
    Podman,
}

impl TransportKind {
    /// Every supported backend
    pub const ALL: [TransportKind; 4] = [
        TransportKind::Local,
        TransportKind::Ssh,
        TransportKind::Docker,
        TransportKind::Podman,
    ];
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Local => write!(f, "local"),
            TransportKind::Ssh => write!(f, "ssh"),
            TransportKind::Docker => write!(f, "docker"),
            TransportKind::Podman => write!(f, "podman"),
        }
    }
}
