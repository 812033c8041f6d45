//! Rule storage, import and export.
//!
//! The engine only ever reads an ordered rule list. Where that list lives
//! is up to a [`RuleStore`]; this module provides an in-memory store and a
//! JSON file store, and the parsing shared by imports.

use parking_lot::RwLock;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::rule::Rule;

/// Persistence collaborator for the ordered rule list.
pub trait RuleStore: Send + Sync {
    /// Get all rules in priority order.
    fn get_rules(&self) -> Result<Vec<Rule>>;

    /// Replace all rules.
    fn set_rules(&self, rules: &[Rule]) -> Result<()>;
}

/// Parse a rule list from imported JSON.
///
/// Accepted shapes:
/// - a bare array of rules (the export format)
/// - `{ "rulesets": [...] }` (local storage layout)
/// - `{ "config": { "rulesets": [...] } }` (sync storage layout)
pub fn parse_rules(content: &str) -> Result<Vec<Rule>> {
    let value: Value = serde_json::from_str(content)?;
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => {
            if let Some(rules) = map.remove("rulesets") {
                rules
            } else if let Some(rules) = map
                .remove("config")
                .and_then(|mut c| c.get_mut("rulesets").map(Value::take))
            {
                rules
            } else {
                return Err(Error::InvalidImport(
                    "expected a rule array or an object with rulesets".to_string(),
                ));
            }
        }
        _ => {
            return Err(Error::InvalidImport("expected a JSON array".to_string()));
        }
    };

    if !list.is_array() {
        return Err(Error::InvalidImport("rulesets is not an array".to_string()));
    }
    Ok(serde_json::from_value(list)?)
}

/// Serialise rules in the export format (pretty-printed JSON array).
pub fn export_rules(rules: &[Rule]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rules)?)
}

/// In-memory rule store.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: RwLock<Vec<Rule>>,
}

impl MemoryRuleStore {
    /// Create a store holding the given rules.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }
}

impl RuleStore for MemoryRuleStore {
    fn get_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.rules.read().clone())
    }

    fn set_rules(&self, rules: &[Rule]) -> Result<()> {
        *self.rules.write() = rules.to_vec();
        Ok(())
    }
}

/// Rule store backed by a JSON file.
///
/// Reads accept every import shape; writes always produce the export
/// format and replace the file atomically.
#[derive(Debug, Clone)]
pub struct JsonFileRuleStore {
    path: PathBuf,
}

impl JsonFileRuleStore {
    /// Create a store for the given file. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleStore for JsonFileRuleStore {
    fn get_rules(&self) -> Result<Vec<Rule>> {
        if !self.path.exists() {
            log::debug!("Rule file {:?} does not exist", self.path);
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        parse_rules(&content)
    }

    fn set_rules(&self, rules: &[Rule]) -> Result<()> {
        let content = export_rules(rules)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Write to a temp file in the same directory, then rename over.
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        log::info!("Saved {} rules to {:?}", rules.len(), self.path);
        Ok(())
    }
}
