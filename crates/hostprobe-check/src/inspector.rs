//! Query dispatch

use tracing::{debug, instrument, warn};

use crate::error::CheckError;
use crate::host::Host;
use crate::query::StateQuery;
use crate::result::{State, StateResult};
use crate::strategy::{Probe, file, package, service, socket, user};

/// Run one query against a host and normalize the outcome
///
/// Every call issues fresh commands; nothing is cached and nothing is
/// retried. A subject that does not exist yields a result whose primary
/// predicate is false.
///
/// # Errors
/// - `InvalidQuery` if the subject is blank
/// - `TargetUnreachable` if the transport fails
/// - `CommandFailed` if an inspection command errors
/// - `UnparsableOutput` if its output has an unexpected format
#[instrument(skip(host), fields(target = %host.id(), query = %query))]
pub async fn inspect(host: &Host, query: &StateQuery) -> Result<StateResult, CheckError> {
    query.validate()?;

    let mut probe = Probe::new(host);
    let state = match query {
        StateQuery::Package(name) => package::inspect(&mut probe, name).await.map(State::Package),
        StateQuery::Service(name) => service::inspect(&mut probe, name).await.map(State::Service),
        StateQuery::Socket(spec) => socket::inspect(&mut probe, spec).await.map(State::Socket),
        StateQuery::User(name) => user::inspect(&mut probe, name).await.map(State::User),
        StateQuery::File(path) => file::inspect(&mut probe, path).await.map(State::File),
    }
    .inspect_err(|e| warn!(error = %e, "inspection failed"))?;

    let result = StateResult {
        target: host.id().to_string(),
        query: query.clone(),
        state,
        diagnostic: probe.into_transcript(),
    };

    debug!(predicate = result.primary_predicate(), "inspection complete");
    Ok(result)
}
