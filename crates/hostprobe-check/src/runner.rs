//! Suite execution across targets

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use hostprobe_inventory::Target;
use tracing::{error, info, instrument, warn};

use crate::error::CheckError;
use crate::host::Connector;
use crate::report::{CaseReport, Outcome, Report};
use crate::suite::Suite;

/// Run every check of a suite against every target
///
/// Targets run concurrently, one task each; the checks of one target run
/// in suite order. A failing or erroring case never stops the others, and
/// a target that cannot be connected errors all of its cases. Cases come
/// back in target order, then check order.
#[instrument(skip_all, fields(targets = targets.len(), checks = suite.len()))]
pub async fn run_suite(
    targets: Vec<Target>,
    suite: Arc<Suite>,
    connector: Arc<dyn Connector>,
) -> Report {
    let started_at = Utc::now();
    info!("starting suite run");

    let mut handles = Vec::with_capacity(targets.len());
    for target in targets {
        let suite = Arc::clone(&suite);
        let connector = Arc::clone(&connector);
        let target_id = target.id.clone();

        let handle =
            tokio::spawn(async move { run_target(target, &suite, connector.as_ref()).await });
        handles.push((target_id, handle));
    }

    let mut cases = Vec::new();
    for (target_id, handle) in handles {
        match handle.await {
            Ok(target_cases) => cases.extend(target_cases),
            Err(e) => {
                error!(target = %target_id, error = %e, "target task panicked");
                let err = CheckError::TargetUnreachable {
                    target: target_id.clone(),
                    reason: format!("inspection task failed: {e}"),
                };
                cases.extend(errored_cases(&target_id, &suite, &err));
            }
        }
    }

    let report = Report {
        started_at,
        finished_at: Utc::now(),
        cases,
    };

    let summary = report.summary();
    info!(
        passed = summary.passed,
        failed = summary.failed,
        errored = summary.errored,
        skipped = summary.skipped,
        "suite run finished"
    );
    report
}

async fn run_target(target: Target, suite: &Suite, connector: &dyn Connector) -> Vec<CaseReport> {
    let target_id = target.id.clone();

    let host = match connector.connect(target) {
        Ok(host) => host,
        Err(e) => {
            warn!(target = %target_id, error = %e, "cannot connect target");
            return errored_cases(&target_id, suite, &e);
        }
    };
    info!(target = %target_id, executor = host.executor_type(), "running checks");

    let mut cases = Vec::with_capacity(suite.len());
    for check in &suite.checks {
        let start = Instant::now();
        let outcome = if check.skip {
            Outcome::Skipped
        } else {
            match host.inspect(&check.query).await {
                Ok(result) => Outcome::evaluate(check, &result),
                Err(e) => Outcome::from_error(&e),
            }
        };

        cases.push(CaseReport {
            target: target_id.clone(),
            check: check.name.clone(),
            query: check.query.clone(),
            outcome,
            duration: start.elapsed(),
        });
    }
    cases
}

fn errored_cases(target_id: &str, suite: &Suite, error: &CheckError) -> Vec<CaseReport> {
    suite
        .checks
        .iter()
        .map(|check| CaseReport {
            target: target_id.to_string(),
            check: check.name.clone(),
            query: check.query.clone(),
            outcome: if check.skip {
                Outcome::Skipped
            } else {
                Outcome::from_error(error)
            },
            duration: std::time::Duration::ZERO,
        })
        .collect()
}
