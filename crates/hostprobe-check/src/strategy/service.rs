//! Service lookup via systemd or SysV init

use hostprobe_exec::shell_quote;

use crate::error::CheckError;
use crate::result::{InitSystem, ServiceState};
use crate::strategy::{Probe, first_line};

const DETECT_CMD: &str = "if command -v systemctl >/dev/null 2>&1 && test -d /run/systemd/system; \
     then echo systemd; else echo sysv; fi";

/// Exit status of a shell that cannot find the command
const COMMAND_NOT_FOUND: i32 = 127;

pub(crate) async fn inspect(probe: &mut Probe<'_>, name: &str) -> Result<ServiceState, CheckError> {
    let detect = probe.run(DETECT_CMD).await?;
    let init = match first_line(&detect.stdout) {
        "systemd" => InitSystem::Systemd,
        "sysv" => InitSystem::Sysv,
        other => {
            return Err(probe.unparsable(DETECT_CMD, format!("unknown init system '{other}'")));
        }
    };

    let name = shell_quote(name);
    let (is_running, is_enabled) = match init {
        InitSystem::Systemd => {
            let active_cmd = format!("systemctl is-active {name}");
            let active = probe.run(&active_cmd).await?;
            let is_running = match parse_is_active(&active.stdout) {
                Some(running) => running,
                None if active.stdout.trim().is_empty() && !active.success() => {
                    return Err(probe.command_failed(&active_cmd, &active));
                }
                None => {
                    return Err(probe.unparsable(
                        &active_cmd,
                        format!("unknown unit state '{}'", first_line(&active.stdout)),
                    ));
                }
            };

            let enabled_cmd = format!("systemctl is-enabled {name}");
            let enabled = probe.run(&enabled_cmd).await?;
            let is_enabled = match parse_is_enabled(&enabled.stdout, &enabled.stderr) {
                Some(enabled) => enabled,
                None if enabled.stdout.trim().is_empty() && !enabled.success() => {
                    return Err(probe.command_failed(&enabled_cmd, &enabled));
                }
                None => {
                    return Err(probe.unparsable(
                        &enabled_cmd,
                        format!("unknown unit file state '{}'", first_line(&enabled.stdout)),
                    ));
                }
            };

            (is_running, is_enabled)
        }
        InitSystem::Sysv => {
            let status_cmd = format!("service {name} status");
            let status = probe.run(&status_cmd).await?;
            if status.status == COMMAND_NOT_FOUND {
                return Err(probe.command_failed(&status_cmd, &status));
            }

            let links_cmd = format!(
                "for f in /etc/rc?.d/S??{name}; do test -e \"$f\" && exit 0; done; exit 1"
            );
            let links = probe.run(&links_cmd).await?;
            let is_enabled = match links.status {
                0 => true,
                1 => false,
                _ => return Err(probe.command_failed(&links_cmd, &links)),
            };

            (status.success(), is_enabled)
        }
    };

    Ok(ServiceState {
        is_running,
        is_enabled,
        init,
    })
}

/// `systemctl is-active` prints one state word; a missing unit is `inactive`
fn parse_is_active(stdout: &str) -> Option<bool> {
    match first_line(stdout) {
        "active" | "reloading" | "refreshing" => Some(true),
        "inactive" | "failed" | "activating" | "deactivating" | "unknown" | "maintenance" => {
            Some(false)
        }
        _ => None,
    }
}

fn parse_is_enabled(stdout: &str, stderr: &str) -> Option<bool> {
    match first_line(stdout) {
        "enabled" | "enabled-runtime" | "alias" => Some(true),
        "disabled" | "static" | "masked" | "masked-runtime" | "linked" | "linked-runtime"
        | "indirect" | "generated" | "transient" | "bad" | "not-found" => Some(false),
        "" if stderr.contains("No such file or directory")
            || stderr.contains("not-found")
            || stderr.contains("does not exist") =>
        {
            Some(false)
        }
        _ => None,
    }
}
