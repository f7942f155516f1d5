//! SSH credential resolution

use std::fmt;
use std::path::{Path, PathBuf};

/// Key files tried, in order, when no credential is configured
const DEFAULT_KEY_NAMES: [&str; 3] = ["id_ed25519", "id_ecdsa", "id_rsa"];

/// How an SSH session authenticates
#[derive(Clone)]
pub enum Credentials {
    /// Explicit path to a private key file
    KeyPath(PathBuf),
    /// Password authentication
    Password(String),
    /// First existing default key in `~/.ssh`
    DefaultKeys,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::KeyPath(path) => f.debug_tuple("KeyPath").field(path).finish(),
            Credentials::Password(_) => f.write_str("Password(<redacted>)"),
            Credentials::DefaultKeys => f.write_str("DefaultKeys"),
        }
    }
}

impl Credentials {
    /// Resolve credentials to something the SSH client can use
    ///
    /// # Errors
    /// Returns `KeyError` if the key cannot be located or has permissions
    /// that are too open
    pub fn resolve(&self) -> Result<ResolvedAuth, KeyError> {
        match self {
            Credentials::KeyPath(path) => {
                validate_key_permissions(path)?;
                Ok(ResolvedAuth::Key(path.clone()))
            }
            Credentials::Password(password) => Ok(ResolvedAuth::Password(password.clone())),
            Credentials::DefaultKeys => {
                let ssh_dir = dirs::home_dir()
                    .map(|home| home.join(".ssh"))
                    .ok_or_else(|| KeyError::NotFound("home directory unknown".to_string()))?;
                let path = default_key_in(&ssh_dir)?;
                validate_key_permissions(&path)?;
                Ok(ResolvedAuth::Key(path))
            }
        }
    }
}

/// Resolved credential
pub enum ResolvedAuth {
    /// Path to key file
    Key(PathBuf),
    /// Password
    Password(String),
}

impl fmt::Debug for ResolvedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedAuth::Key(path) => f.debug_tuple("Key").field(path).finish(),
            ResolvedAuth::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

/// Credential resolution errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key file permissions too open: {0} (should be 600)")]
    BadPermissions(String),

    #[error("key file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Find the first default private key in an `.ssh` directory
fn default_key_in(ssh_dir: &Path) -> Result<PathBuf, KeyError> {
    DEFAULT_KEY_NAMES
        .iter()
        .map(|name| ssh_dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| KeyError::NotFound(format!("no default key in {}", ssh_dir.display())))
}

fn validate_key_permissions(path: &Path) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => KeyError::NotFound(path.display().to_string()),
        _ => KeyError::Io(e),
    })?;

    // group and other bits must be clear
    if metadata.permissions().mode() & 0o77 != 0 {
        return Err(KeyError::BadPermissions(path.display().to_string()));
    }

    Ok(())
}
