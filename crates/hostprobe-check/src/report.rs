//! Suite reports

use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CheckError, ErrorKind};
use crate::query::StateQuery;
use crate::result::StateResult;
use crate::suite::Check;

/// A predicate that did not have its expected value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub predicate: String,
    pub expected: bool,
    pub actual: bool,
}

/// Result of one check on one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every expectation held
    Passed,
    /// The query answered, but not as expected
    Failed {
        mismatches: Vec<Mismatch>,
        diagnostic: String,
    },
    /// The query produced no answer
    Errored {
        kind: ErrorKind,
        message: String,
        diagnostic: Option<String>,
    },
    Skipped,
}

impl Outcome {
    /// Compare a result against a check's expectations
    pub fn evaluate(check: &Check, result: &StateResult) -> Self {
        let mismatches: Vec<Mismatch> = check
            .expectations
            .iter()
            .filter_map(|expectation| {
                // suites are validated, so a missing predicate reads as false
                let actual = result.predicate(&expectation.predicate).unwrap_or(false);
                (actual != expectation.expected).then(|| Mismatch {
                    predicate: expectation.predicate.clone(),
                    expected: expectation.expected,
                    actual,
                })
            })
            .collect();

        if mismatches.is_empty() {
            Outcome::Passed
        } else {
            Outcome::Failed {
                mismatches,
                diagnostic: result.diagnostic.clone(),
            }
        }
    }

    pub fn from_error(error: &CheckError) -> Self {
        Outcome::Errored {
            kind: error.kind(),
            message: error.to_string(),
            diagnostic: error.diagnostic().map(str::to_string),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Failed { .. } => "FAILED",
            Outcome::Errored { .. } => "ERROR",
            Outcome::Skipped => "SKIPPED",
        }
    }
}

/// One (target, check) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    pub target: String,
    pub check: String,
    pub query: StateQuery,
    pub outcome: Outcome,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl CaseReport {
    /// `target::check`, the id shown in text output
    pub fn id(&self) -> String {
        format!("{}::{}", self.target, self.check)
    }
}

/// Case counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.errored + self.skipped
    }
}

/// Every case of a suite run, in target order then check order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cases: Vec<CaseReport>,
}

impl Report {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for case in &self.cases {
            match case.outcome {
                Outcome::Passed => summary.passed += 1,
                Outcome::Failed { .. } => summary.failed += 1,
                Outcome::Errored { .. } => summary.errored += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// No case failed or errored
    pub fn success(&self) -> bool {
        let summary = self.summary();
        summary.failed == 0 && summary.errored == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }

    /// Human-readable report, one line per case followed by failure details
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for case in &self.cases {
            let _ = writeln!(out, "{} {}", case.id(), case.outcome.label());
        }

        let problems: Vec<&CaseReport> = self
            .cases
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Failed { .. } | Outcome::Errored { .. }))
            .collect();

        if !problems.is_empty() {
            let _ = writeln!(out, "\n=== FAILURES ===");
            for case in problems {
                let _ = writeln!(out, "\n--- {} ---", case.id());
                let _ = writeln!(out, "target: {}", case.target);
                let _ = writeln!(out, "query:  {}", case.query);
                match &case.outcome {
                    Outcome::Failed {
                        mismatches,
                        diagnostic,
                    } => {
                        for m in mismatches {
                            let _ = writeln!(
                                out,
                                "expected {} == {}, got {}",
                                m.predicate, m.expected, m.actual
                            );
                        }
                        write_diagnostic(&mut out, diagnostic);
                    }
                    Outcome::Errored {
                        message,
                        diagnostic,
                        ..
                    } => {
                        let _ = writeln!(out, "error: {message}");
                        if let Some(diagnostic) = diagnostic {
                            write_diagnostic(&mut out, diagnostic);
                        }
                    }
                    Outcome::Passed | Outcome::Skipped => {}
                }
            }
        }

        let summary = self.summary();
        let elapsed = (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "\n{} passed, {} failed, {} errors, {} skipped in {:.2}s",
            summary.passed,
            summary.failed,
            summary.errored,
            summary.skipped,
            elapsed.as_secs_f64()
        );
        out
    }

    /// Report as pretty JSON, with the summary included
    ///
    /// # Errors
    /// Returns the serializer error
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            #[serde(flatten)]
            report: &'a Report,
            summary: Summary,
            success: bool,
        }

        serde_json::to_string_pretty(&JsonReport {
            report: self,
            summary: self.summary(),
            success: self.success(),
        })
    }
}

fn write_diagnostic(out: &mut String, diagnostic: &str) {
    if diagnostic.is_empty() {
        return;
    }
    out.push_str("diagnostic:\n");
    for line in diagnostic.lines() {
        let _ = writeln!(out, "  {line}");
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
