//! hostprobe-check: state inspection
//!
//! Runs read-only state queries (package, service, socket, user, file)
//! against connected targets, and evaluates suites of checks over a set of
//! targets.

pub mod error;
pub mod host;
pub mod inspector;
pub mod query;
pub mod report;
pub mod result;
pub mod runner;
pub mod suite;

mod strategy;

pub use error::{CheckError, ErrorKind, SuiteError};
pub use host::{Connector, ExecOptions, Host, TransportConnector};
pub use inspector::inspect;
pub use query::{InetProtocol, QueryKind, SocketSpec, StateQuery};
pub use report::{CaseReport, Mismatch, Outcome, Report, Summary};
pub use result::{
    FileKind, FileState, InitSystem, PackageManager, PackageState, ServiceState, SocketState,
    State, StateResult, UserState,
};
pub use runner::run_suite;
pub use suite::{Check, Expectation, Suite};
