//! Package lookup via the target's package database

use hostprobe_exec::shell_quote;

use crate::error::CheckError;
use crate::result::{PackageManager, PackageState};
use crate::strategy::{Probe, first_line};

const DETECT_CMD: &str = "for m in dpkg-query rpm apk pacman; do \
     command -v \"$m\" >/dev/null 2>&1 && { echo \"$m\"; exit 0; }; \
     done; exit 127";

pub(crate) async fn inspect(probe: &mut Probe<'_>, name: &str) -> Result<PackageState, CheckError> {
    let detect = probe.run(DETECT_CMD).await?;
    if !detect.success() {
        return Err(probe.command_failed(DETECT_CMD, &detect));
    }
    let manager = match first_line(&detect.stdout) {
        "dpkg-query" => PackageManager::Dpkg,
        "rpm" => PackageManager::Rpm,
        "apk" => PackageManager::Apk,
        "pacman" => PackageManager::Pacman,
        other => {
            return Err(probe.unparsable(DETECT_CMD, format!("unknown package tool '{other}'")));
        }
    };

    let cmd = query_cmd(manager, name);
    let result = probe.run(&cmd).await?;

    let parsed = match manager {
        PackageManager::Dpkg => parse_dpkg(result.status, &result.stdout, &result.stderr),
        PackageManager::Rpm => parse_rpm(result.status, &result.stdout),
        PackageManager::Apk => parse_apk(result.status),
        PackageManager::Pacman => parse_pacman(result.status, &result.stdout, &result.stderr),
    };

    match parsed {
        Parsed::Installed(version) => Ok(PackageState {
            is_installed: true,
            version,
            manager,
        }),
        Parsed::Missing => Ok(PackageState {
            is_installed: false,
            version: None,
            manager,
        }),
        Parsed::Failed => Err(probe.command_failed(&cmd, &result)),
        Parsed::Garbled(reason) => Err(probe.unparsable(&cmd, reason)),
    }
}

fn query_cmd(manager: PackageManager, name: &str) -> String {
    let name = shell_quote(name);
    match manager {
        PackageManager::Dpkg => format!("dpkg-query -f '${{Status}} ${{Version}}' -W {name}"),
        PackageManager::Rpm => format!("rpm -q --queryformat '%{{VERSION}}-%{{RELEASE}}' {name}"),
        PackageManager::Apk => format!("apk info -e {name}"),
        PackageManager::Pacman => format!("pacman -Q {name}"),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    Installed(Option<String>),
    Missing,
    Failed,
    Garbled(String),
}

/// `install ok installed 1.18.0-6ubuntu14`
fn parse_dpkg(status: i32, stdout: &str, stderr: &str) -> Parsed {
    if status != 0 {
        return if stderr.to_lowercase().contains("no packages found") {
            Parsed::Missing
        } else {
            Parsed::Failed
        };
    }

    let fields: Vec<&str> = first_line(stdout).split_whitespace().collect();
    match fields.as_slice() {
        [_want, _flag, "installed", version, ..] => Parsed::Installed(Some((*version).to_string())),
        [_want, _flag, "installed"] => Parsed::Installed(None),
        [_want, _flag, _state, ..] => Parsed::Missing,
        _ => Parsed::Garbled(format!("expected dpkg status line, got '{}'", stdout.trim())),
    }
}

fn parse_rpm(status: i32, stdout: &str) -> Parsed {
    match status {
        0 => {
            let version = first_line(stdout);
            if version.is_empty() {
                Parsed::Garbled("rpm printed no version".to_string())
            } else {
                Parsed::Installed(Some(version.to_string()))
            }
        }
        1 if stdout.contains("is not installed") => Parsed::Missing,
        _ => Parsed::Failed,
    }
}

fn parse_apk(status: i32) -> Parsed {
    match status {
        0 => Parsed::Installed(None),
        1 => Parsed::Missing,
        _ => Parsed::Failed,
    }
}

/// `nginx 1.24.0-1`
fn parse_pacman(status: i32, stdout: &str, stderr: &str) -> Parsed {
    if status != 0 {
        return if stderr.contains("was not found") {
            Parsed::Missing
        } else {
            Parsed::Failed
        };
    }

    match first_line(stdout).split_whitespace().collect::<Vec<_>>().as_slice() {
        [_name, version] => Parsed::Installed(Some((*version).to_string())),
        _ => Parsed::Garbled(format!("expected 'NAME VERSION', got '{}'", stdout.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpkg_installed() {
        assert_eq!(
            parse_dpkg(0, "install ok installed 1.18.0-6ubuntu14.4", ""),
            Parsed::Installed(Some("1.18.0-6ubuntu14.4".into()))
        );
        assert_eq!(
            parse_dpkg(0, "hold ok installed 2:8.2.2434-3", ""),
            Parsed::Installed(Some("2:8.2.2434-3".into()))
        );
    }

    #[test]
    fn test_dpkg_removed_but_configured() {
        assert_eq!(
            parse_dpkg(0, "deinstall ok config-files 1.18.0-6", ""),
            Parsed::Missing
        );
    }

    #[test]
    fn test_dpkg_unknown_package() {
        assert_eq!(
            parse_dpkg(1, "", "dpkg-query: no packages found matching nginx\n"),
            Parsed::Missing
        );
        assert_eq!(parse_dpkg(2, "", "dpkg-query: error: database locked"), Parsed::Failed);
    }

    #[test]
    fn test_dpkg_garbled() {
        assert!(matches!(parse_dpkg(0, "nginx", ""), Parsed::Garbled(_)));
    }

    #[test]
    fn test_rpm() {
        assert_eq!(
            parse_rpm(0, "1.20.1-14.el9"),
            Parsed::Installed(Some("1.20.1-14.el9".into()))
        );
        assert_eq!(parse_rpm(1, "package nginx is not installed\n"), Parsed::Missing);
        assert_eq!(parse_rpm(1, "error: rpmdb open failed"), Parsed::Failed);
    }

    #[test]
    fn test_apk_and_pacman() {
        assert_eq!(parse_apk(0), Parsed::Installed(None));
        assert_eq!(parse_apk(1), Parsed::Missing);
        assert_eq!(
            parse_pacman(0, "nginx 1.24.0-1\n", ""),
            Parsed::Installed(Some("1.24.0-1".into()))
        );
        assert_eq!(
            parse_pacman(1, "", "error: package 'nginx' was not found\n"),
            Parsed::Missing
        );
    }

    #[test]
    fn test_query_cmd_quotes_name() {
        assert_eq!(
            query_cmd(PackageManager::Dpkg, "nginx"),
            "dpkg-query -f '${Status} ${Version}' -W 'nginx'"
        );
        assert_eq!(
            query_cmd(PackageManager::Rpm, "nginx"),
            "rpm -q --queryformat '%{VERSION}-%{RELEASE}' 'nginx'"
        );
    }
}
