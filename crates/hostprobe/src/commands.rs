//! Subcommand implementations
//!
//! Each returns the process exit code on completion. Errors bubbled up as
//! `eyre::Report` are session-fatal (inventory, suite or config problems)
//! and exit with [`EXIT_CONFIG`].

use std::process::ExitCode;
use std::sync::Arc;

use eyre::{WrapErr, eyre};
use hostprobe_check::{Host, Suite, TransportConnector, run_suite};
use hostprobe_inventory::{InventorySource, ResolverConfig, Target, TargetResolver};
use tracing::{info, warn};

use crate::cli::{HostsArgs, InspectArgs, OutputFormat, TargetArgs, VerifyArgs};
use crate::config::Config;

/// Inventory path variable consulted after `MOLECULE_INVENTORY_FILE`
pub const INVENTORY_ENV: &str = "HOSTPROBE_INVENTORY";

/// Exit status for failed or errored checks
pub const EXIT_FAILED: u8 = 1;
/// Exit status for inventory, suite or configuration errors
pub const EXIT_CONFIG: u8 = 2;

pub async fn verify(args: &VerifyArgs, config: &Config) -> eyre::Result<ExitCode> {
    let suite = Suite::load(&args.suite)
        .wrap_err_with(|| format!("cannot load suite {}", args.suite.display()))?;
    let targets = resolve(&args.targets, config)?;
    info!(targets = targets.len(), checks = suite.len(), "verifying");

    let connector = TransportConnector::new(config.exec.options());
    let report = run_suite(targets, Arc::new(suite), Arc::new(connector)).await;

    match args.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    })
}

pub fn hosts(args: &HostsArgs, config: &Config) -> eyre::Result<ExitCode> {
    let targets = resolve(&args.targets, config)?;

    match args.format {
        OutputFormat::Text => {
            let width = targets.iter().map(|t| t.id.len()).max().unwrap_or(0);
            for target in &targets {
                println!(
                    "{:<width$}  {:<7}  {}",
                    target.id,
                    target.transport.kind().to_string(),
                    target.address()
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&targets)?),
    }

    Ok(ExitCode::SUCCESS)
}

pub async fn inspect(args: &InspectArgs, config: &Config) -> eyre::Result<ExitCode> {
    let query = args.query()?;
    let target_args = TargetArgs {
        inventory: args.inventory.clone(),
        pattern: Some(args.host.clone()),
    };

    let target = resolve(&target_args, config)?
        .into_iter()
        .find(|t| t.id == args.host)
        .ok_or_else(|| eyre!("no host '{}' in inventory", args.host))?;

    let host = Host::connect(target, config.exec.options())?;
    match host.inspect(&query).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            warn!(error = %e, "inspection failed");
            eprintln!("{e}");
            if let Some(diagnostic) = e.diagnostic() {
                eprint!("{diagnostic}");
            }
            Ok(ExitCode::from(EXIT_FAILED))
        }
    }
}

fn resolve(args: &TargetArgs, config: &Config) -> eyre::Result<Vec<Target>> {
    let source = match &args.inventory {
        Some(path) => InventorySource::Path(path.clone()),
        None => InventorySource::from_env(INVENTORY_ENV).wrap_err(
            "no inventory given: pass --inventory or set MOLECULE_INVENTORY_FILE",
        )?,
    };

    let pattern = args.pattern.as_deref().unwrap_or(&config.inventory.hosts);
    let resolver = TargetResolver::new(
        ResolverConfig::new(source)
            .with_pattern(pattern)
            .with_transports(config.inventory.transports.iter().copied()),
    );

    let targets = resolver.resolve().wrap_err("cannot resolve targets")?;
    info!(count = targets.len(), "resolved targets");
    Ok(targets)
}
