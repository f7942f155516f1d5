//! Target resolution

use std::collections::BTreeSet;
use std::path::PathBuf;

use hostprobe_exec::ContainerRuntime;
use serde_yaml::Value;
use tracing::{debug, info, instrument};

use crate::ansible::{self, HostEntry};
use crate::error::InventoryError;
use crate::source::InventorySource;
use crate::types::{SshParams, Target, Transport, TransportKind};

const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_SSH_USER: &str = "root";

/// Secrets kept out of `Target::vars`; the transport carries what it needs
const CREDENTIAL_VARS: [&str; 5] = [
    "ansible_password",
    "ansible_ssh_pass",
    "ansible_become_password",
    "ansible_become_pass",
    "ansible_sudo_pass",
];

/// Resolver settings
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Inventory location
    pub source: InventorySource,
    /// Host pattern (`all`, `*`, or `:`/`,` separated group and host names)
    pub pattern: String,
    /// Transport backends available to this session
    pub transports: BTreeSet<TransportKind>,
}

impl ResolverConfig {
    /// Select every host, all transports enabled
    pub fn new(source: InventorySource) -> Self {
        Self {
            source,
            pattern: "all".to_string(),
            transports: TransportKind::ALL.into_iter().collect(),
        }
    }

    /// Set host pattern
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Restrict the enabled transport backends
    #[must_use]
    pub fn with_transports(mut self, transports: impl IntoIterator<Item = TransportKind>) -> Self {
        self.transports = transports.into_iter().collect();
        self
    }
}

/// Produces the targets of a verification session
#[derive(Debug, Clone)]
pub struct TargetResolver {
    config: ResolverConfig,
}

impl TargetResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the inventory into targets, in declaration order
    ///
    /// # Errors
    /// - `NotFound` if the inventory cannot be read
    /// - `Malformed` if it does not parse
    /// - `Empty` if it declares no hosts, `NoMatchingHosts` if the pattern
    ///   selects none
    /// - `UnsupportedTransport` if a selected host needs a backend that is
    ///   unknown or disabled
    #[instrument(skip(self), fields(source = %self.config.source, pattern = %self.config.pattern))]
    pub fn resolve(&self) -> Result<Vec<Target>, InventoryError> {
        let content = self.config.source.load()?;
        let hosts = ansible::parse(&content)?;

        if hosts.is_empty() {
            return Err(InventoryError::Empty);
        }

        let terms = pattern_terms(&self.config.pattern);
        let targets = hosts
            .into_iter()
            .filter(|host| matches_pattern(host, &terms))
            .map(|host| self.build_target(host))
            .collect::<Result<Vec<_>, _>>()?;

        if targets.is_empty() {
            return Err(InventoryError::NoMatchingHosts(self.config.pattern.clone()));
        }

        info!(count = targets.len(), "resolved targets");
        Ok(targets)
    }

    fn build_target(&self, host: HostEntry) -> Result<Target, InventoryError> {
        let transport = self.build_transport(&host)?;
        debug!(host = %host.name, transport = %transport.kind(), "resolved target");

        let mut vars = host.vars;
        vars.retain(|key, _| !CREDENTIAL_VARS.contains(&key.as_str()));

        Ok(Target {
            id: host.name,
            transport,
            groups: host.groups,
            vars,
        })
    }

    fn build_transport(&self, host: &HostEntry) -> Result<Transport, InventoryError> {
        let declared = string_var(host, &["ansible_connection"])?;
        let declared = declared.as_deref().unwrap_or("ssh");

        let kind = match declared {
            "local" | "ansible.builtin.local" => TransportKind::Local,
            "ssh" | "smart" | "paramiko" | "paramiko_ssh" | "ansible.builtin.ssh"
            | "ansible.builtin.paramiko_ssh" => TransportKind::Ssh,
            "docker" | "community.docker.docker" | "community.general.docker" => {
                TransportKind::Docker
            }
            "podman" | "containers.podman.podman" => TransportKind::Podman,
            _ => return Err(unsupported(host, declared)),
        };

        if !self.config.transports.contains(&kind) {
            return Err(unsupported(host, declared));
        }

        let address = string_var(host, &["ansible_host"])?.unwrap_or_else(|| host.name.clone());
        let user = string_var(host, &["ansible_user", "ansible_ssh_user"])?;

        Ok(match kind {
            TransportKind::Local => Transport::Local,
            TransportKind::Ssh => Transport::Ssh(SshParams {
                address,
                port: port_var(host)?.unwrap_or(DEFAULT_SSH_PORT),
                user: user.unwrap_or_else(|| DEFAULT_SSH_USER.to_string()),
                private_key_file: string_var(
                    host,
                    &["ansible_ssh_private_key_file", "ansible_private_key_file"],
                )?
                .map(PathBuf::from),
                password: string_var(host, &["ansible_password", "ansible_ssh_pass"])?,
            }),
            TransportKind::Docker => Transport::Container {
                runtime: ContainerRuntime::Docker,
                container: address,
                user,
            },
            TransportKind::Podman => Transport::Container {
                runtime: ContainerRuntime::Podman,
                container: address,
                user,
            },
        })
    }
}

/// Resolve every host of an inventory with the default configuration
///
/// # Errors
/// See [`TargetResolver::resolve`]
pub fn resolve(source: &InventorySource) -> Result<Vec<Target>, InventoryError> {
    TargetResolver::new(ResolverConfig::new(source.clone())).resolve()
}

fn unsupported(host: &HostEntry, declared: &str) -> InventoryError {
    InventoryError::UnsupportedTransport {
        host: host.name.clone(),
        transport: declared.to_string(),
    }
}

/// Split a host pattern; an empty result means "everything"
fn pattern_terms(pattern: &str) -> Vec<&str> {
    let terms: Vec<&str> = pattern
        .split([':', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    if terms.iter().any(|t| *t == "all" || *t == "*") {
        Vec::new()
    } else {
        terms
    }
}

fn matches_pattern(host: &HostEntry, terms: &[&str]) -> bool {
    terms.is_empty()
        || terms
            .iter()
            .any(|term| host.name == *term || host.groups.iter().any(|g| g == term))
}

/// First present variable among `keys`, as a string
fn string_var(host: &HostEntry, keys: &[&str]) -> Result<Option<String>, InventoryError> {
    for key in keys {
        match host.vars.get(*key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => return Ok(Some(s.clone())),
            Some(Value::Number(n)) => return Ok(Some(n.to_string())),
            Some(_) => {
                return Err(InventoryError::Malformed(format!(
                    "host '{}': {key} must be a string",
                    host.name
                )));
            }
        }
    }
    Ok(None)
}

fn port_var(host: &HostEntry) -> Result<Option<u16>, InventoryError> {
    let invalid = || {
        InventoryError::Malformed(format!(
            "host '{}': ansible_port must be a port number",
            host.name
        ))
    };

    for key in ["ansible_port", "ansible_ssh_port"] {
        match host.vars.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) => {
                let port = n.as_u64().and_then(|p| u16::try_from(p).ok());
                return port.map(Some).ok_or_else(invalid);
            }
            Some(Value::String(s)) => return s.trim().parse().map(Some).map_err(|_| invalid()),
            Some(_) => return Err(invalid()),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, groups: &[&str]) -> HostEntry {
        HostEntry {
            name: name.to_string(),
            groups: groups.iter().map(ToString::to_string).collect(),
            vars: Default::default(),
        }
    }

    #[test]
    fn test_pattern_all() {
        assert!(pattern_terms("all").is_empty());
        assert!(pattern_terms("*").is_empty());
        assert!(pattern_terms("web:all").is_empty());
        assert!(pattern_terms("").is_empty());
    }

    #[test]
    fn test_pattern_union() {
        let terms = pattern_terms("web, db1");
        assert!(matches_pattern(&entry("web1", &["all", "web"]), &terms));
        assert!(matches_pattern(&entry("db1", &["all", "db"]), &terms));
        assert!(!matches_pattern(&entry("cache1", &["all", "cache"]), &terms));
    }

    #[test]
    fn test_port_var_variants() {
        let mut host = entry("web1", &["all"]);
        host.vars.insert("ansible_port".into(), Value::from(2222));
        assert_eq!(port_var(&host).unwrap(), Some(2222));

        host.vars.insert("ansible_port".into(), Value::from("2200"));
        assert_eq!(port_var(&host).unwrap(), Some(2200));

        host.vars.insert("ansible_port".into(), Value::from(70000));
        assert!(matches!(port_var(&host), Err(InventoryError::Malformed(_))));
    }
}
