//! Where inventory data comes from

use std::path::PathBuf;

use crate::error::InventoryError;

/// Inventory data location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventorySource {
    /// YAML file on disk
    Path(PathBuf),
    /// YAML document held in memory
    Inline(String),
}

impl InventorySource {
    /// Read the inventory path from an environment variable
    ///
    /// Meant for the process boundary only; library code takes an explicit
    /// source.
    ///
    /// # Errors
    /// Returns `InventoryError::EnvNotSet` if the variable is unset or empty
    pub fn from_env(var: &str) -> Result<Self, InventoryError> {
        match std::env::var_os(var) {
            Some(value) if !value.is_empty() => Ok(InventorySource::Path(PathBuf::from(value))),
            _ => Err(InventoryError::EnvNotSet(var.to_string())),
        }
    }

    /// Load the raw document
    ///
    /// # Errors
    /// Returns `InventoryError::NotFound` if the file cannot be read
    pub fn load(&self) -> Result<String, InventoryError> {
        match self {
            InventorySource::Path(path) => {
                std::fs::read_to_string(path).map_err(|e| InventoryError::NotFound {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            }
            InventorySource::Inline(content) => Ok(content.clone()),
        }
    }
}

impl std::fmt::Display for InventorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventorySource::Path(path) => write!(f, "{}", path.display()),
            InventorySource::Inline(_) => f.write_str("<inline>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_missing() {
        let err = InventorySource::from_env("HOSTPROBE_TEST_UNSET_INVENTORY_VAR").unwrap_err();
        assert_eq!(
            err,
            InventoryError::EnvNotSet("HOSTPROBE_TEST_UNSET_INVENTORY_VAR".to_string())
        );
    }

    #[test]
    fn test_load_missing_file() {
        let source = InventorySource::Path(PathBuf::from("/nonexistent/inventory.yml"));
        assert!(matches!(
            source.load(),
            Err(InventoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_inline_display() {
        assert_eq!(InventorySource::Inline("all: {}".into()).to_string(), "<inline>");
    }
}
