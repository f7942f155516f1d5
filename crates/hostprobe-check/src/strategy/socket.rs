//! Listening-socket probe via `ss`, falling back to `netstat`

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::CheckError;
use crate::query::{InetProtocol, SocketSpec};
use crate::result::SocketState;
use crate::strategy::{Probe, first_line};

const DETECT_CMD: &str = "if command -v ss >/dev/null 2>&1; then echo ss; \
     elif command -v netstat >/dev/null 2>&1; then echo netstat; else exit 127; fi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tool {
    Ss,
    Netstat,
}

/// A listening local address
#[derive(Debug, Clone, PartialEq, Eq)]
enum Listener {
    /// `host` is `None` for the `*` wildcard
    Inet { host: Option<IpAddr>, port: u16 },
    Unix(String),
}

impl std::fmt::Display for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Listener::Inet { host: None, port } => write!(f, "*:{port}"),
            Listener::Inet {
                host: Some(IpAddr::V4(ip)),
                port,
            } => write!(f, "{ip}:{port}"),
            Listener::Inet {
                host: Some(IpAddr::V6(ip)),
                port,
            } => write!(f, "[{ip}]:{port}"),
            Listener::Unix(path) => f.write_str(path),
        }
    }
}

pub(crate) async fn inspect(
    probe: &mut Probe<'_>,
    spec: &SocketSpec,
) -> Result<SocketState, CheckError> {
    let detect = probe.run(DETECT_CMD).await?;
    if !detect.success() {
        return Err(probe.command_failed(DETECT_CMD, &detect));
    }
    let tool = match first_line(&detect.stdout) {
        "ss" => Tool::Ss,
        "netstat" => Tool::Netstat,
        other => {
            return Err(probe.unparsable(DETECT_CMD, format!("unknown socket tool '{other}'")));
        }
    };

    let family = match spec {
        SocketSpec::Inet {
            protocol: InetProtocol::Tcp,
            ..
        } => "-t",
        SocketSpec::Inet {
            protocol: InetProtocol::Udp,
            ..
        } => "-u",
        SocketSpec::Unix { .. } => "-x",
    };
    let cmd = match tool {
        Tool::Ss => format!("ss -H -l -n {family}"),
        Tool::Netstat => format!("netstat -l -n {family}"),
    };

    let result = probe.run(&cmd).await?;
    if !result.success() {
        return Err(probe.command_failed(&cmd, &result));
    }

    let listeners = parse_listeners(&result.stdout, tool, matches!(spec, SocketSpec::Unix { .. }))
        .map_err(|reason| probe.unparsable(&cmd, reason))?;

    let matching: Vec<String> = listeners
        .iter()
        .filter(|listener| satisfies(spec, listener))
        .map(ToString::to_string)
        .collect();

    Ok(SocketState {
        is_listening: !matching.is_empty(),
        listeners: matching,
    })
}

fn satisfies(spec: &SocketSpec, listener: &Listener) -> bool {
    match (spec, listener) {
        (SocketSpec::Unix { path }, Listener::Unix(listening)) => path == listening,
        (
            SocketSpec::Inet {
                host: wanted,
                port: wanted_port,
                ..
            },
            Listener::Inet { host, port },
        ) => {
            if wanted_port != port {
                return false;
            }
            match (wanted, host) {
                (None, _) | (Some(_), None) => true,
                (Some(IpAddr::V4(want)), Some(IpAddr::V4(have))) => {
                    have == want || *have == Ipv4Addr::UNSPECIFIED
                }
                (Some(IpAddr::V6(want)), Some(IpAddr::V6(have))) => {
                    have == want || *have == Ipv6Addr::UNSPECIFIED
                }
                // `::` is dual-stack unless bindv6only is set
                (Some(IpAddr::V4(_)), Some(IpAddr::V6(have))) => *have == Ipv6Addr::UNSPECIFIED,
                _ => false,
            }
        }
        _ => false,
    }
}

fn parse_listeners(output: &str, tool: Tool, unix: bool) -> Result<Vec<Listener>, String> {
    let mut listeners = Vec::new();

    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = fields.first() else {
            continue;
        };

        // headers: ss without -H support, netstat banner and column titles
        if matches!(*first, "State" | "Netid" | "Active" | "Proto") {
            continue;
        }

        if unix {
            let path = match tool {
                // unix  2  [ ACC ]  STREAM  LISTENING  13567  /run/systemd/private
                Tool::Netstat => fields.last().copied(),
                // LISTEN 0 4096 /run/systemd/private 13567 * 0
                Tool::Ss => local_field(&fields),
            };
            match path {
                Some(path) if path.starts_with('/') || path.starts_with('@') => {
                    listeners.push(Listener::Unix(path.to_string()));
                }
                // unnamed sockets
                Some(_) => {}
                None => return Err(format!("cannot find socket path in '{line}'")),
            }
            continue;
        }

        let local = local_field(&fields)
            .ok_or_else(|| format!("cannot find local address in '{line}'"))?;
        listeners.push(parse_inet(local).ok_or_else(|| format!("bad local address '{local}'"))?);
    }

    Ok(listeners)
}

/// The local address follows the Recv-Q and Send-Q counters
fn local_field<'a>(fields: &[&'a str]) -> Option<&'a str> {
    fields
        .windows(3)
        .find(|w| w[0].parse::<u64>().is_ok() && w[1].parse::<u64>().is_ok())
        .map(|w| w[2])
}

/// `0.0.0.0:80`, `*:80`, `[::]:80`, `:::80`, `127.0.0.53%lo:53`
fn parse_inet(local: &str) -> Option<Listener> {
    let (host, port) = if let Some(bracketed) = local.strip_prefix('[') {
        bracketed.split_once("]:")?
    } else {
        local.rsplit_once(':')?
    };

    let port = port.parse().ok()?;
    let host = host.split('%').next().unwrap_or(host);

    let host = if host == "*" {
        None
    } else {
        Some(host.parse::<IpAddr>().ok()?.to_canonical())
    };

    Some(Listener::Inet { host, port })
}
