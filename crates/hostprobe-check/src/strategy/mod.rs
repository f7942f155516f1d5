//! Per-query inspection strategies
//!
//! Each strategy issues its commands through a `Probe`, which records a
//! verbatim transcript for diagnostics and maps transport faults onto
//! `CheckError`.

pub(crate) mod file;
pub(crate) mod package;
pub(crate) mod service;
pub(crate) mod socket;
pub(crate) mod user;

use std::fmt::Write;

use hostprobe_exec::CommandResult;
use tracing::debug;

use crate::error::CheckError;
use crate::host::Host;

/// Command session for one inspection
pub(crate) struct Probe<'a> {
    host: &'a Host,
    transcript: String,
}

impl<'a> Probe<'a> {
    pub(crate) fn new(host: &'a Host) -> Self {
        Self {
            host,
            transcript: String::new(),
        }
    }

    pub(crate) fn target(&self) -> &str {
        self.host.id()
    }

    /// Run a command; any exit status is returned, transport faults are errors
    pub(crate) async fn run(&mut self, cmd: &str) -> Result<CommandResult, CheckError> {
        let result = self
            .host
            .run(cmd)
            .await
            .map_err(|e| CheckError::TargetUnreachable {
                target: self.target().to_string(),
                reason: e.to_string(),
            })?;

        debug!(target = %self.target(), command = %cmd, status = result.status, "probe command");
        self.record(cmd, &result);
        Ok(result)
    }

    fn record(&mut self, cmd: &str, result: &CommandResult) {
        let _ = writeln!(self.transcript, "$ {cmd}");
        let _ = writeln!(self.transcript, "[exit {}]", result.status);
        for stream in [&result.stdout, &result.stderr] {
            if !stream.is_empty() {
                self.transcript.push_str(stream);
                if !stream.ends_with('\n') {
                    self.transcript.push('\n');
                }
            }
        }
    }

    pub(crate) fn command_failed(&self, cmd: &str, result: &CommandResult) -> CheckError {
        CheckError::CommandFailed {
            target: self.target().to_string(),
            command: cmd.to_string(),
            status: result.status,
            output: self.transcript.clone(),
        }
    }

    pub(crate) fn unparsable(&self, cmd: &str, reason: impl Into<String>) -> CheckError {
        CheckError::UnparsableOutput {
            target: self.target().to_string(),
            command: cmd.to_string(),
            reason: reason.into(),
            output: self.transcript.clone(),
        }
    }

    pub(crate) fn into_transcript(self) -> String {
        self.transcript
    }
}

/// First non-empty line of command output, trimmed
pub(crate) fn first_line(output: &str) -> &str {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}
