//! Result types for command execution

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of a command execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success, -1 when no status was reported)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Connection information for SSH
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Host address
    pub host: String,
    /// Port (default 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username
    pub user: String,
}

fn default_port() -> u16 {
    22
}

impl ConnectionInfo {
    /// Create new connection info
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: user.into(),
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_exit_zero() {
        let mut result = CommandResult {
            status: 0,
            stdout: "active\n".into(),
            stderr: String::new(),
            duration: Duration::ZERO,
        };
        assert!(result.success());

        result.status = 3;
        assert!(!result.success());
    }

    #[test]
    fn test_connection_info_default_port() {
        let info: ConnectionInfo =
            serde_json::from_str(r#"{"host":"10.0.0.5","user":"deploy"}"#).unwrap();
        assert_eq!(info.port, 22);
        assert_eq!(info, ConnectionInfo::new("10.0.0.5", "deploy"));
    }
}
