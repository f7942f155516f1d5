//! Configuration loading and types

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use eyre::WrapErr;
use hostprobe_check::ExecOptions;
use hostprobe_inventory::TransportKind;
use serde::{Deserialize, Serialize};

/// Top-level configuration, read from `hostprobe.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Transport settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecConfig {
    /// Upper bound on a single inspection command
    pub command_timeout_secs: Option<u64>,
}

impl ExecConfig {
    pub fn options(&self) -> ExecOptions {
        ExecOptions {
            command_timeout: self.command_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    /// Default host pattern
    #[serde(default = "default_hosts")]
    pub hosts: String,
    /// Transport backends targets may use
    #[serde(default = "default_transports")]
    pub transports: Vec<TransportKind>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            transports: default_transports(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_hosts() -> String {
    "all".to_string()
}

fn default_transports() -> Vec<TransportKind> {
    TransportKind::ALL.to_vec()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .wrap_err_with(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Load from an explicit path, else the first default path that
    /// exists, else defaults
    ///
    /// Returns the path the configuration came from, if any.
    ///
    /// # Errors
    /// Returns error if the chosen file cannot be read or parsed
    pub fn locate(explicit: Option<&Path>) -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let paths = [
            Some(PathBuf::from("hostprobe.toml")),
            dirs::config_dir().map(|p| p.join("hostprobe/hostprobe.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        Ok((Config::default(), None))
    }
}
