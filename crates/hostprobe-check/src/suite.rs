//! Check suites
//!
//! A suite is an ordered list of named checks, each a state query plus the
//! predicate values it must have:
//!
//! ```toml
//! [[check]]
//! name = "nginx_running_and_enabled"
//! service = "nginx"
//! expect = { is_running = true, is_enabled = true }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SuiteError;
use crate::query::{SocketSpec, StateQuery};

/// One predicate a check asserts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    pub predicate: String,
    pub expected: bool,
}

/// A named query and its expectations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub query: StateQuery,
    pub expectations: Vec<Expectation>,
    /// Declared but not run
    #[serde(default)]
    pub skip: bool,
}

impl Check {
    /// Check that the query's primary predicate holds
    pub fn new(name: impl Into<String>, query: StateQuery) -> Self {
        let predicate = query.kind().primary_predicate().to_string();
        Self {
            name: name.into(),
            query,
            expectations: vec![Expectation {
                predicate,
                expected: true,
            }],
            skip: false,
        }
    }

    /// Replace the expectations
    ///
    /// # Errors
    /// Returns `SuiteError::InvalidCheck` if a predicate does not exist for
    /// the query kind, or no expectation is given
    pub fn expecting<I, S>(mut self, expectations: I) -> Result<Self, SuiteError>
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        self.expectations = expectations
            .into_iter()
            .map(|(predicate, expected)| Expectation {
                predicate: predicate.into(),
                expected,
            })
            .collect();
        self.validate()?;
        Ok(self)
    }

    #[must_use]
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    fn validate(&self) -> Result<(), SuiteError> {
        let invalid = |reason: String| SuiteError::InvalidCheck {
            name: self.name.clone(),
            reason,
        };

        self.query.validate().map_err(|e| invalid(e.to_string()))?;

        if self.expectations.is_empty() {
            return Err(invalid("no expectations".to_string()));
        }

        let known = self.query.kind().predicates();
        for expectation in &self.expectations {
            if !known.contains(&expectation.predicate.as_str()) {
                return Err(invalid(format!(
                    "{} has no predicate '{}' (known: {})",
                    self.query.kind(),
                    expectation.predicate,
                    known.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Ordered list of checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub checks: Vec<Check>,
}

impl Suite {
    /// Build a suite from checks
    ///
    /// # Errors
    /// Returns `SuiteError` for an empty suite, duplicate names or invalid checks
    pub fn new(checks: Vec<Check>) -> Result<Self, SuiteError> {
        if checks.is_empty() {
            return Err(SuiteError::Empty);
        }

        let mut seen = HashSet::new();
        for check in &checks {
            if !seen.insert(check.name.as_str()) {
                return Err(SuiteError::InvalidCheck {
                    name: check.name.clone(),
                    reason: "duplicate check name".to_string(),
                });
            }
            check.validate()?;
        }

        Ok(Self { checks })
    }

    /// Load a suite file
    ///
    /// # Errors
    /// Returns `SuiteError::Io` if the file cannot be read, otherwise see
    /// [`Suite::from_toml_str`]
    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let content = std::fs::read_to_string(path).map_err(|e| SuiteError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a suite from TOML
    ///
    /// # Errors
    /// Returns `SuiteError::Parse` for TOML errors and `InvalidCheck` for
    /// checks without exactly one query key or with unknown predicates
    pub fn from_toml_str(content: &str) -> Result<Self, SuiteError> {
        let raw: RawSuite = toml::from_str(content).map_err(|e| SuiteError::Parse(e.to_string()))?;
        let checks = raw
            .check
            .into_iter()
            .map(RawCheck::into_check)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(checks)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSuite {
    #[serde(default)]
    check: Vec<RawCheck>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCheck {
    name: String,
    package: Option<String>,
    service: Option<String>,
    socket: Option<String>,
    user: Option<String>,
    file: Option<String>,
    #[serde(default)]
    skip: bool,
    #[serde(default)]
    expect: BTreeMap<String, bool>,
}

impl RawCheck {
    fn into_check(self) -> Result<Check, SuiteError> {
        let name = self.name;
        let invalid = |reason: String| SuiteError::InvalidCheck {
            name: name.clone(),
            reason,
        };

        let mut queries = Vec::new();
        if let Some(package) = self.package {
            queries.push(StateQuery::Package(package));
        }
        if let Some(service) = self.service {
            queries.push(StateQuery::Service(service));
        }
        if let Some(socket) = self.socket {
            let spec: SocketSpec = socket.parse().map_err(|e| invalid(format!("{e}")))?;
            queries.push(StateQuery::Socket(spec));
        }
        if let Some(user) = self.user {
            queries.push(StateQuery::User(user));
        }
        if let Some(file) = self.file {
            queries.push(StateQuery::File(file));
        }

        let query = match queries.len() {
            1 => queries.remove(0),
            0 => {
                return Err(invalid(
                    "needs one of package, service, socket, user, file".to_string(),
                ));
            }
            _ => return Err(invalid("declares more than one query".to_string())),
        };

        let mut check = Check::new(name.clone(), query);
        if !self.expect.is_empty() {
            check = check.expecting(self.expect)?;
        }
        check.skip = self.skip;
        Ok(check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NGINX: &str = r#"
[[check]]
name = "user"
user = "www-data"
skip = true

[[check]]
name = "nginx_is_installed"
package = "nginx"

[[check]]
name = "nginx_running_and_enabled"
service = "nginx"
expect = { is_running = true, is_enabled = true }

[[check]]
name = "nginx_is_listening"
socket = "tcp://127.0.0.1:80"
"#;

    #[test]
    fn test_parse_suite() {
        let suite = Suite::from_toml_str(NGINX).unwrap();
        assert_eq!(suite.len(), 4);

        assert!(suite.checks[0].skip);
        assert_eq!(suite.checks[1].query, StateQuery::package("nginx"));
        assert_eq!(
            suite.checks[1].expectations,
            [Expectation {
                predicate: "is_installed".into(),
                expected: true
            }]
        );
        assert_eq!(suite.checks[2].expectations.len(), 2);
        assert_eq!(
            suite.checks[3].query,
            StateQuery::socket("tcp://127.0.0.1:80").unwrap()
        );
    }

    #[test]
    fn test_unknown_predicate() {
        let err = Suite::from_toml_str(
            "[[check]]\nname = \"x\"\npackage = \"nginx\"\nexpect = { is_running = true }\n",
        )
        .unwrap_err();
        assert!(matches!(err, SuiteError::InvalidCheck { name, .. } if name == "x"));
    }

    #[test]
    fn test_query_count() {
        assert!(matches!(
            Suite::from_toml_str("[[check]]\nname = \"none\"\n"),
            Err(SuiteError::InvalidCheck { .. })
        ));
        assert!(matches!(
            Suite::from_toml_str("[[check]]\nname = \"two\"\npackage = \"a\"\nservice = \"a\"\n"),
            Err(SuiteError::InvalidCheck { .. })
        ));
    }

    #[test]
    fn test_duplicate_names_and_empty_suite() {
        let dup = r#"
[[check]]
name = "a"
package = "x"

[[check]]
name = "a"
package = "y"
"#;
        assert!(matches!(
            Suite::from_toml_str(dup),
            Err(SuiteError::InvalidCheck { .. })
        ));
        assert_eq!(Suite::from_toml_str(""), Err(SuiteError::Empty));
    }

    #[test]
    fn test_bad_socket_and_unknown_key() {
        assert!(matches!(
            Suite::from_toml_str("[[check]]\nname = \"s\"\nsocket = \"127.0.0.1:80\"\n"),
            Err(SuiteError::InvalidCheck { .. })
        ));
        assert!(matches!(
            Suite::from_toml_str("[[check]]\nname = \"s\"\npackage = \"x\"\nexpected = 1\n"),
            Err(SuiteError::Parse(_))
        ));
    }

    #[test]
    fn test_builder() {
        let check = Check::new("nginx", StateQuery::service("nginx"))
            .expecting([("is_running", true), ("is_enabled", false)])
            .unwrap();
        assert_eq!(check.expectations[1].predicate, "is_enabled");
        assert!(
            Check::new("nginx", StateQuery::service("nginx"))
                .expecting([("exists", true)])
                .is_err()
        );
    }
}
