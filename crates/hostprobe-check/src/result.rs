//! Normalized inspection results

use serde::{Deserialize, Serialize};

use crate::query::StateQuery;

/// Outcome of one query against one target
///
/// Always carries the target and query that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResult {
    /// Target identifier
    pub target: String,
    /// Originating query
    pub query: StateQuery,
    /// Variant-specific state
    pub state: State,
    /// Every command issued and its raw output, verbatim
    pub diagnostic: String,
}

impl StateResult {
    /// The query's primary predicate (`is_installed`, `is_running`, ...)
    #[must_use]
    pub fn primary_predicate(&self) -> bool {
        match &self.state {
            State::Package(p) => p.is_installed,
            State::Service(s) => s.is_running,
            State::Socket(s) => s.is_listening,
            State::User(u) => u.exists,
            State::File(f) => f.exists,
        }
    }

    /// Look up a predicate by name; `None` if the variant has no such predicate
    #[must_use]
    pub fn predicate(&self, name: &str) -> Option<bool> {
        match (&self.state, name) {
            (State::Package(p), "is_installed") => Some(p.is_installed),
            (State::Service(s), "is_running") => Some(s.is_running),
            (State::Service(s), "is_enabled") => Some(s.is_enabled),
            (State::Socket(s), "is_listening") => Some(s.is_listening),
            (State::User(u), "exists") => Some(u.exists),
            (State::File(f), "exists") => Some(f.exists),
            (State::File(f), "is_file") => Some(f.kind == Some(FileKind::RegularFile)),
            (State::File(f), "is_directory") => Some(f.kind == Some(FileKind::Directory)),
            (State::File(f), "is_symlink") => Some(f.kind == Some(FileKind::Symlink)),
            _ => None,
        }
    }
}

/// Variant-specific state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum State {
    Package(PackageState),
    Service(ServiceState),
    Socket(SocketState),
    User(UserState),
    File(FileState),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageState {
    pub is_installed: bool,
    /// Installed version, when the package manager reports one
    pub version: Option<String>,
    pub manager: PackageManager,
}

/// Package database that answered the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    Dpkg,
    Rpm,
    Apk,
    Pacman,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub is_running: bool,
    pub is_enabled: bool,
    pub init: InitSystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSystem {
    Systemd,
    Sysv,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketState {
    pub is_listening: bool,
    /// Listening local addresses that satisfied the query
    pub listeners: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    pub exists: bool,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub home: Option<String>,
    pub shell: Option<String>,
}

impl UserState {
    pub(crate) fn missing() -> Self {
        Self {
            exists: false,
            uid: None,
            gid: None,
            home: None,
            shell: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub exists: bool,
    pub kind: Option<FileKind>,
    /// Permission bits, e.g. `0o644`
    pub mode: Option<u32>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub size: Option<u64>,
}

impl FileState {
    pub(crate) fn missing() -> Self {
        Self {
            exists: false,
            kind: None,
            mode: None,
            owner: None,
            group: None,
            size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    RegularFile,
    Directory,
    Symlink,
    Socket,
    Fifo,
    BlockDevice,
    CharDevice,
    Other,
}
