//! State queries

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CheckError;

/// One inspection request against a target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateQuery {
    /// Is a package installed
    Package(String),
    /// Is a service running / enabled
    Service(String),
    /// Is something listening on a socket
    Socket(SocketSpec),
    /// Does a user exist
    User(String),
    /// Does a path exist, and what is it
    File(String),
}

impl StateQuery {
    pub fn package(name: impl Into<String>) -> Self {
        StateQuery::Package(name.into())
    }

    pub fn service(name: impl Into<String>) -> Self {
        StateQuery::Service(name.into())
    }

    /// Socket query from a URL such as `tcp://127.0.0.1:80`
    ///
    /// # Errors
    /// Returns `CheckError::InvalidQuery` if the URL does not parse
    pub fn socket(url: &str) -> Result<Self, CheckError> {
        Ok(StateQuery::Socket(url.parse()?))
    }

    pub fn user(name: impl Into<String>) -> Self {
        StateQuery::User(name.into())
    }

    pub fn file(path: impl Into<String>) -> Self {
        StateQuery::File(path.into())
    }

    #[must_use]
    pub fn kind(&self) -> QueryKind {
        match self {
            StateQuery::Package(_) => QueryKind::Package,
            StateQuery::Service(_) => QueryKind::Service,
            StateQuery::Socket(_) => QueryKind::Socket,
            StateQuery::User(_) => QueryKind::User,
            StateQuery::File(_) => QueryKind::File,
        }
    }

    /// Reject queries whose subject is empty
    ///
    /// # Errors
    /// Returns `CheckError::InvalidQuery` for a blank subject
    pub fn validate(&self) -> Result<(), CheckError> {
        let subject = match self {
            StateQuery::Package(s)
            | StateQuery::Service(s)
            | StateQuery::User(s)
            | StateQuery::File(s) => s,
            StateQuery::Socket(SocketSpec::Unix { path }) => path,
            StateQuery::Socket(SocketSpec::Inet { .. }) => return Ok(()),
        };

        if subject.trim().is_empty() {
            return Err(CheckError::InvalidQuery(format!(
                "{} query needs a non-empty subject",
                self.kind()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for StateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateQuery::Package(name) => write!(f, "package({name:?})"),
            StateQuery::Service(name) => write!(f, "service({name:?})"),
            StateQuery::Socket(spec) => write!(f, "socket(\"{spec}\")"),
            StateQuery::User(name) => write!(f, "user({name:?})"),
            StateQuery::File(path) => write!(f, "file({path:?})"),
        }
    }
}

/// Query variant without its subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Package,
    Service,
    Socket,
    User,
    File,
}

impl QueryKind {
    /// Predicates a result of this kind exposes; the first is the primary one
    #[must_use]
    pub fn predicates(self) -> &'static [&'static str] {
        match self {
            QueryKind::Package => &["is_installed"],
            QueryKind::Service => &["is_running", "is_enabled"],
            QueryKind::Socket => &["is_listening"],
            QueryKind::User => &["exists"],
            QueryKind::File => &["exists", "is_file", "is_directory", "is_symlink"],
        }
    }

    #[must_use]
    pub fn primary_predicate(self) -> &'static str {
        self.predicates()[0]
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Package => write!(f, "package"),
            QueryKind::Service => write!(f, "service"),
            QueryKind::Socket => write!(f, "socket"),
            QueryKind::User => write!(f, "user"),
            QueryKind::File => write!(f, "file"),
        }
    }
}

/// Internet socket protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InetProtocol {
    Tcp,
    Udp,
}

/// Socket to probe, written as `tcp://HOST:PORT`, `tcp://PORT`,
/// `udp://...` or `unix:///path`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SocketSpec {
    /// TCP or UDP socket; no host means any address
    Inet {
        protocol: InetProtocol,
        host: Option<IpAddr>,
        port: u16,
    },
    /// Unix domain socket
    Unix { path: String },
}

impl FromStr for SocketSpec {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CheckError::InvalidQuery(format!("socket '{s}': {reason}"));

        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| invalid("expected PROTOCOL://ADDRESS"))?;

        let protocol = match scheme {
            "tcp" => InetProtocol::Tcp,
            "udp" => InetProtocol::Udp,
            "unix" => {
                if rest.is_empty() {
                    return Err(invalid("missing socket path"));
                }
                return Ok(SocketSpec::Unix {
                    path: rest.to_string(),
                });
            }
            _ => return Err(invalid("protocol must be tcp, udp or unix")),
        };

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (addr, port) = bracketed
                .split_once("]:")
                .ok_or_else(|| invalid("expected [IPV6]:PORT"))?;
            let addr: Ipv6Addr = addr.parse().map_err(|_| invalid("bad IPv6 address"))?;
            (Some(IpAddr::V6(addr)), port)
        } else if let Some((addr, port)) = rest.rsplit_once(':') {
            if addr.contains(':') {
                return Err(invalid("IPv6 addresses must be bracketed"));
            }
            let addr: IpAddr = addr.parse().map_err(|_| invalid("bad IP address"))?;
            (Some(addr), port)
        } else {
            (None, rest)
        };

        let port = port.parse().map_err(|_| invalid("bad port"))?;

        Ok(SocketSpec::Inet {
            protocol,
            host,
            port,
        })
    }
}

impl TryFrom<String> for SocketSpec {
    type Error = CheckError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SocketSpec> for String {
    fn from(spec: SocketSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for SocketSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketSpec::Unix { path } => write!(f, "unix://{path}"),
            SocketSpec::Inet {
                protocol,
                host,
                port,
            } => {
                let scheme = match protocol {
                    InetProtocol::Tcp => "tcp",
                    InetProtocol::Udp => "udp",
                };
                match host {
                    None => write!(f, "{scheme}://{port}"),
                    Some(IpAddr::V4(ip)) => write!(f, "{scheme}://{ip}:{port}"),
                    Some(IpAddr::V6(ip)) => write!(f, "{scheme}://[{ip}]:{port}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn test_parse_tcp_with_host() {
        let spec: SocketSpec = "tcp://127.0.0.1:80".parse().unwrap();
        assert_eq!(
            spec,
            SocketSpec::Inet {
                protocol: InetProtocol::Tcp,
                host: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
                port: 80,
            }
        );
        assert_eq!(spec.to_string(), "tcp://127.0.0.1:80");
    }

    #[test]
    fn test_parse_port_only_and_ipv6() {
        let any: SocketSpec = "udp://53".parse().unwrap();
        assert!(matches!(
            any,
            SocketSpec::Inet {
                protocol: InetProtocol::Udp,
                host: None,
                port: 53
            }
        ));

        let v6: SocketSpec = "tcp://[::1]:22".parse().unwrap();
        assert_eq!(v6.to_string(), "tcp://[::1]:22");
    }

    #[test]
    fn test_parse_unix() {
        let spec: SocketSpec = "unix:///run/php/php-fpm.sock".parse().unwrap();
        assert_eq!(
            spec,
            SocketSpec::Unix {
                path: "/run/php/php-fpm.sock".into()
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in [
            "127.0.0.1:80",
            "sctp://1.2.3.4:9",
            "tcp://localhost:80",
            "tcp://::1:22",
            "tcp://127.0.0.1:http",
            "tcp://70000",
            "unix://",
        ] {
            assert!(
                matches!(bad.parse::<SocketSpec>(), Err(CheckError::InvalidQuery(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_validate_blank_subject() {
        assert!(StateQuery::package("  ").validate().is_err());
        assert!(StateQuery::service("nginx").validate().is_ok());
        assert!(StateQuery::socket("tcp://80").unwrap().validate().is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(StateQuery::package("nginx").to_string(), "package(\"nginx\")");
        assert_eq!(
            StateQuery::socket("tcp://127.0.0.1:80").unwrap().to_string(),
            "socket(\"tcp://127.0.0.1:80\")"
        );
    }

    #[test]
    fn test_primary_predicates() {
        assert_eq!(QueryKind::Package.primary_predicate(), "is_installed");
        assert_eq!(QueryKind::Service.primary_predicate(), "is_running");
        assert_eq!(QueryKind::Socket.primary_predicate(), "is_listening");
        assert_eq!(QueryKind::User.primary_predicate(), "exists");
    }
}
