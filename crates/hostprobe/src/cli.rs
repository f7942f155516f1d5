//! CLI argument parsing with clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hostprobe_check::{CheckError, StateQuery};

use crate::config::LogFormat;

/// Verify host state across Ansible/Molecule inventories
#[derive(Debug, Parser)]
#[command(name = "hostprobe", version, propagate_version = true)]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "HOSTPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log line format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a check suite against the inventory
    Verify(VerifyArgs),

    /// List the targets an inventory resolves to
    Hosts(HostsArgs),

    /// Inspect one aspect of one host and print the result as JSON
    Inspect(InspectArgs),
}

/// Where targets come from
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Inventory file [fallback: HOSTPROBE_INVENTORY]
    #[arg(short, long, env = "MOLECULE_INVENTORY_FILE")]
    pub inventory: Option<PathBuf>,

    /// Host pattern: `all`, or group and host names separated by `:` or `,`
    #[arg(long = "hosts")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Suite file (TOML)
    #[arg(short, long)]
    pub suite: PathBuf,

    #[command(flatten)]
    pub targets: TargetArgs,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct HostsArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Target id as declared in the inventory
    #[arg(long)]
    pub host: String,

    #[arg(short, long, env = "MOLECULE_INVENTORY_FILE")]
    pub inventory: Option<PathBuf>,

    #[arg(value_enum)]
    pub kind: QueryArg,

    /// Package, service or user name; socket URL; or path
    pub subject: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryArg {
    Package,
    Service,
    Socket,
    User,
    File,
}

impl InspectArgs {
    /// # Errors
    /// Returns `CheckError::InvalidQuery` for a malformed socket URL
    pub fn query(&self) -> Result<StateQuery, CheckError> {
        let subject = self.subject.as_str();
        Ok(match self.kind {
            QueryArg::Package => StateQuery::package(subject),
            QueryArg::Service => StateQuery::service(subject),
            QueryArg::Socket => StateQuery::socket(subject)?,
            QueryArg::User => StateQuery::user(subject),
            QueryArg::File => StateQuery::file(subject),
        })
    }
}
