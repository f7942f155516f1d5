//! Ansible YAML inventory parsing
//!
//! Handles the layout Molecule writes: a top-level mapping of groups, each
//! with optional `hosts`, `vars` and `children`. A host listed under several
//! groups is reported once, at its first position.

use std::collections::{BTreeMap, HashMap};

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::error::InventoryError;

/// Maximum `children` nesting accepted
const MAX_DEPTH: usize = 32;

/// Variables keyed by name
pub type Vars = BTreeMap<String, Value>;

/// A host as declared in the inventory, with its effective variables
#[derive(Debug, Clone, PartialEq)]
pub struct HostEntry {
    /// Host name
    pub name: String,
    /// Groups containing the host, outermost first
    pub groups: Vec<String>,
    /// Group vars merged parent-to-child, then host vars on top
    pub vars: Vars,
}

/// Parse an inventory document into host entries in declaration order
///
/// # Errors
/// Returns `InventoryError::Malformed` for YAML errors or a structure that
/// is not an Ansible inventory
pub fn parse(content: &str) -> Result<Vec<HostEntry>, InventoryError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let root: Value =
        serde_yaml::from_str(content).map_err(|e| InventoryError::Malformed(e.to_string()))?;

    let groups = match root {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(groups) => groups,
        other => {
            return Err(InventoryError::Malformed(format!(
                "top level must be a mapping of groups, found {}",
                value_kind(&other)
            )));
        }
    };

    // every top-level group is implicitly a child of `all`
    let mut collector = Collector::default();
    for (name, body) in &groups {
        let name = key_name(name)?;
        if name == "all" {
            collector.walk(&name, body, &[], 0)?;
        } else {
            collector.walk(&name, body, &["all".to_string()], 0)?;
        }
    }

    let hosts = collector.finish();
    debug!(count = hosts.len(), "parsed inventory hosts");
    Ok(hosts)
}

#[derive(Default)]
struct PartialHost {
    groups: Vec<String>,
    host_vars: Vars,
}

/// A group's own variables and its distance from `all`
#[derive(Default)]
struct GroupInfo {
    depth: usize,
    vars: Vars,
}

#[derive(Default)]
struct Collector {
    order: Vec<String>,
    hosts: HashMap<String, PartialHost>,
    groups: HashMap<String, GroupInfo>,
}

impl Collector {
    fn walk(
        &mut self,
        name: &str,
        body: &Value,
        parents: &[String],
        depth: usize,
    ) -> Result<(), InventoryError> {
        if depth > MAX_DEPTH {
            return Err(InventoryError::Malformed(format!(
                "group nesting deeper than {MAX_DEPTH} at '{name}'"
            )));
        }

        let mut chain = parents.to_vec();
        chain.push(name.to_string());

        // a group nested under several parents takes its deepest position
        let info = self.groups.entry(name.to_string()).or_default();
        info.depth = info.depth.max(chain.len() - 1);

        let group = match body {
            Value::Null => return Ok(()),
            Value::Mapping(group) => group,
            other => {
                return Err(InventoryError::Malformed(format!(
                    "group '{name}' must be a mapping, found {}",
                    value_kind(other)
                )));
            }
        };

        for key in group.keys() {
            if !matches!(key.as_str(), Some("hosts" | "vars" | "children")) {
                warn!(group = name, key = ?key, "ignoring unknown inventory key");
            }
        }

        info.vars.extend(group_vars(group, name)?);

        match group.get("hosts") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(hosts)) => {
                for (host, host_body) in hosts {
                    let host = key_name(host)?;
                    let host_vars = mapping_vars(host_body, &format!("host '{host}'"))?;
                    self.add(host, &chain, host_vars);
                }
            }
            Some(other) => {
                return Err(InventoryError::Malformed(format!(
                    "hosts of group '{name}' must be a mapping, found {}",
                    value_kind(other)
                )));
            }
        }

        match group.get("children") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(children)) => {
                for (child, child_body) in children {
                    let child = key_name(child)?;
                    self.walk(&child, child_body, &chain, depth + 1)?;
                }
            }
            Some(other) => {
                return Err(InventoryError::Malformed(format!(
                    "children of group '{name}' must be a mapping, found {}",
                    value_kind(other)
                )));
            }
        }

        Ok(())
    }

    fn add(&mut self, name: String, chain: &[String], host_vars: Vars) {
        if !self.hosts.contains_key(&name) {
            self.order.push(name.clone());
        }
        let entry = self.hosts.entry(name).or_default();

        for group in chain {
            if !entry.groups.contains(group) {
                entry.groups.push(group.clone());
            }
        }
        entry.host_vars.extend(host_vars);
    }

    /// Merge group vars shallow to deep (name order within a depth), then
    /// host vars on top
    fn finish(self) -> Vec<HostEntry> {
        let Collector {
            order,
            mut hosts,
            groups,
        } = self;

        order
            .into_iter()
            .filter_map(|name| {
                let partial = hosts.remove(&name)?;

                let mut ranked: Vec<(usize, &str, &Vars)> = partial
                    .groups
                    .iter()
                    .filter_map(|g| groups.get(g).map(|info| (info.depth, g.as_str(), &info.vars)))
                    .collect();
                ranked.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

                let mut vars = Vars::new();
                for (_, _, own) in ranked {
                    vars.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                vars.extend(partial.host_vars);

                Some(HostEntry {
                    name,
                    groups: partial.groups,
                    vars,
                })
            })
            .collect()
    }
}

fn group_vars(group: &Mapping, name: &str) -> Result<Vars, InventoryError> {
    match group.get("vars") {
        Some(vars) => mapping_vars(vars, &format!("group '{name}'")),
        None => Ok(Vars::new()),
    }
}

fn mapping_vars(value: &Value, context: &str) -> Result<Vars, InventoryError> {
    match value {
        Value::Null => Ok(Vars::new()),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| Ok((key_name(k)?, v.clone())))
            .collect(),
        other => Err(InventoryError::Malformed(format!(
            "vars of {context} must be a mapping, found {}",
            value_kind(other)
        ))),
    }
}

fn key_name(key: &Value) -> Result<String, InventoryError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(InventoryError::Malformed(format!(
            "inventory keys must be strings, found {}",
            value_kind(other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
