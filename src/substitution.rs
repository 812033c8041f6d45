//! Per-rule substitution values for template rendering.

use std::collections::BTreeMap;

use crate::field::Field;

/// The whole value of one field followed by its regex capture groups.
///
/// Index 0 is the full original field value (not just the matched part);
/// indices 1.. are capture groups in declaration order. Groups that did not
/// participate in the match are stored as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Substitution {
    parts: Vec<Option<String>>,
}

impl Substitution {
    /// Substitution for a field without a matcher: just its value.
    pub fn whole(value: Option<&str>) -> Self {
        Self {
            parts: vec![value.map(str::to_string)],
        }
    }

    /// Substitution from a successful match.
    pub fn with_groups<I>(value: &str, groups: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut parts = vec![Some(value.to_string())];
        parts.extend(groups);
        Self { parts }
    }

    /// Get the part at `index`, or `None` if missing or not participating.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.parts.get(index).and_then(|p| p.as_deref())
    }

    /// The whole field value.
    pub fn value(&self) -> Option<&str> {
        self.get(0)
    }

    /// Number of parts, including index 0.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if this substitution has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Substitutions for every field of one rule attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubstitutionMap {
    entries: BTreeMap<Field, Substitution>,
}

impl SubstitutionMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the substitution of a field.
    pub fn insert(&mut self, field: Field, substitution: Substitution) {
        self.entries.insert(field, substitution);
    }

    /// Get the substitution of a field.
    pub fn get(&self, field: Field) -> Option<&Substitution> {
        self.entries.get(&field)
    }

    /// Get a substitution by placeholder name (`referrer`, `finalUrl`, ...).
    pub fn get_by_name(&self, name: &str) -> Option<&Substitution> {
        Field::parse(name).and_then(|f| self.get(f))
    }

    /// Number of recorded fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no field has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
