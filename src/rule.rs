//! User rule definitions and their compiled form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::conflict::ConflictAction;
use crate::extract::FieldRecord;
use crate::field::{Field, FIELD_ORDER};
use crate::pattern::{CompiledPattern, PatternCache};
use crate::ruleset::EngineConfig;
use crate::substitution::{Substitution, SubstitutionMap};
use crate::template::placeholders;

fn default_enabled() -> bool {
    true
}

/// A user rule: optional regex matchers per field plus a destination
/// pattern.
///
/// Serialises to the import/export JSON shape:
///
/// ```json
/// {
///   "enabled": true,
///   "description": "Pictures",
///   "mime": "image/.*",
///   "pattern": "images/",
///   "conflict-action": "uniquify"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rule {
    /// Disabled rules are always skipped. Missing means enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Free-text label, not used by matching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type regex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    /// Active tab URL regex (requires tab permission)
    #[serde(default, rename = "tabUrl", skip_serializing_if = "Option::is_none")]
    pub tab_url: Option<String>,
    /// Referrer regex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Download URL regex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Final (post-redirect) URL regex
    #[serde(default, rename = "finalUrl", skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    /// Filename regex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Destination pattern
    #[serde(default)]
    pub pattern: String,
    /// Conflict action as stored; unknown values fall back to the default
    #[serde(default, rename = "conflict-action", skip_serializing_if = "Option::is_none")]
    pub conflict_action: Option<String>,
}

impl Rule {
    /// Create an enabled rule with a destination pattern and no matchers.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            enabled: true,
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Set the matcher of a field.
    pub fn with_matcher(mut self, field: Field, regex: impl Into<String>) -> Self {
        let regex = Some(regex.into());
        match field {
            Field::Mime => self.mime = regex,
            Field::TabUrl => self.tab_url = regex,
            Field::Referrer => self.referrer = regex,
            Field::Url => self.url = regex,
            Field::FinalUrl => self.final_url = regex,
            Field::Filename => self.filename = regex,
        }
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the conflict action.
    pub fn with_conflict_action(mut self, action: ConflictAction) -> Self {
        self.conflict_action = Some(action.as_str().to_string());
        self
    }

    /// Set whether the rule is enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Get the matcher regex of a field. Empty strings count as unset.
    pub fn matcher(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Mime => &self.mime,
            Field::TabUrl => &self.tab_url,
            Field::Referrer => &self.referrer,
            Field::Url => &self.url,
            Field::FinalUrl => &self.final_url,
            Field::Filename => &self.filename,
        };
        value.as_deref().filter(|s| !s.is_empty())
    }

    /// Check if any field has a matcher.
    pub fn has_matchers(&self) -> bool {
        FIELD_ORDER.iter().any(|f| self.matcher(*f).is_some())
    }

    /// The effective conflict action, given the configured default.
    pub fn conflict_action_or(&self, default: ConflictAction) -> ConflictAction {
        self.conflict_action
            .as_deref()
            .and_then(ConflictAction::parse)
            .unwrap_or(default)
    }

    /// Check the rule for problems a user would want to fix.
    ///
    /// Issues never affect matching; a rule with issues is evaluated as is.
    pub fn validate(&self) -> Vec<RuleIssue> {
        let mut issues = Vec::new();

        if self.pattern.trim().is_empty() {
            issues.push(RuleIssue::EmptyPattern);
        }
        if !self.has_matchers() {
            issues.push(RuleIssue::NoMatchers);
        }
        if let Some(action) = self.conflict_action.as_deref() {
            if ConflictAction::parse(action).is_none() {
                issues.push(RuleIssue::UnknownConflictAction(action.to_string()));
            }
        }
        for field in FIELD_ORDER {
            if let Some(source) = self.matcher(field) {
                if let Err(e) = CompiledPattern::try_compile(source) {
                    issues.push(RuleIssue::InvalidRegex {
                        field,
                        reason: e.to_string(),
                    });
                }
            }
        }
        for placeholder in placeholders(&self.pattern) {
            if !placeholder.is_known() {
                issues.push(RuleIssue::UnknownPlaceholder(placeholder.raw));
            }
        }

        issues
    }

    /// Compile the rule's matchers.
    pub fn compile(&self, cache: &PatternCache, config: &EngineConfig) -> CompiledRule {
        let matchers = FIELD_ORDER.map(|field| {
            self.matcher(field)
                .map(|source| cache.get_or_compile(source, config.invalid_pattern))
        });
        CompiledRule {
            rule: self.clone(),
            matchers,
        }
    }
}

/// A problem found by [`Rule::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleIssue {
    /// Destination pattern is empty
    EmptyPattern,
    /// No field has a matcher, so the rule matches every download
    NoMatchers,
    /// Conflict action is not one of uniquify/overwrite/prompt
    UnknownConflictAction(String),
    /// A matcher regex does not compile
    InvalidRegex { field: Field, reason: String },
    /// The pattern uses a placeholder that can never resolve
    UnknownPlaceholder(String),
}

impl RuleIssue {
    /// Check if the issue makes the rule unusable rather than surprising.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            RuleIssue::EmptyPattern | RuleIssue::InvalidRegex { .. } | RuleIssue::UnknownPlaceholder(_)
        )
    }
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleIssue::EmptyPattern => write!(f, "destination pattern is empty"),
            RuleIssue::NoMatchers => write!(f, "no match criteria; rule matches every download"),
            RuleIssue::UnknownConflictAction(a) => {
                write!(f, "unknown conflict action {:?}; the default is used", a)
            }
            RuleIssue::InvalidRegex { field, reason } => {
                write!(f, "{} matcher does not compile: {}", field, reason)
            }
            RuleIssue::UnknownPlaceholder(p) => write!(f, "unknown placeholder {}", p),
        }
    }
}

/// A rule with its matchers compiled, in [`FIELD_ORDER`].
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: Rule,
    matchers: [Option<Arc<CompiledPattern>>; 6],
}

impl CompiledRule {
    /// The source rule.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Check if the rule is enabled.
    pub fn enabled(&self) -> bool {
        self.rule.enabled
    }

    /// Match every configured field against a download.
    ///
    /// Fields are checked in [`FIELD_ORDER`] and the first failing field
    /// ends the attempt. Fields without a matcher contribute their whole
    /// value. A `tabUrl` matcher fails without running its regex when no
    /// tab URL is available.
    pub fn try_match(&self, record: &FieldRecord) -> Option<SubstitutionMap> {
        let mut substitutions = SubstitutionMap::new();

        for field in FIELD_ORDER {
            let value = record.get(field);
            let Some(pattern) = &self.matchers[field.index()] else {
                substitutions.insert(field, Substitution::whole(value));
                continue;
            };

            let Some(value) = value else {
                log::debug!("No {} available for matcher {:?}", field, pattern.source());
                return None;
            };

            match pattern.captures(value) {
                Some(substitution) => substitutions.insert(field, substitution),
                None => return None,
            }
        }

        Some(substitutions)
    }
}
