//! RuleSet evaluation and configuration.

mod config;

pub use config::{
    DateZone, EngineConfig, EngineProfile, InvalidPatternPolicy, RenderFailurePolicy,
};

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictAction;
use crate::error::RenderError;
use crate::extract::FieldRecord;
use crate::pattern::PatternCache;
use crate::rule::{CompiledRule, Rule};
use crate::substitution::SubstitutionMap;
use crate::template::render;

/// Filename suggestion handed back to the download manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Destination path relative to the download directory
    pub filename: String,
    /// How to resolve an existing file with the same name
    pub conflict_action: ConflictAction,
}

/// A matched rule together with its substitutions.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    /// Position of the rule in the list
    pub index: usize,
    /// The matched rule
    pub rule: &'a CompiledRule,
    /// Whole values and capture groups of every field
    pub substitutions: SubstitutionMap,
}

/// Outcome of evaluating a download against a rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// A rule matched and its template rendered
    Suggested {
        /// Position of the rule in the list
        rule_index: usize,
        /// The suggestion
        suggestion: Suggestion,
    },
    /// A rule matched but its template did not render, ending the search
    RenderFailed {
        /// Position of the rule in the list
        rule_index: usize,
        /// Why rendering failed
        error: RenderError,
    },
    /// No enabled rule matched
    NoMatch,
}

impl Evaluation {
    /// The suggestion, if any.
    pub fn suggestion(&self) -> Option<&Suggestion> {
        match self {
            Evaluation::Suggested { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Convert into the suggestion, if any.
    pub fn into_suggestion(self) -> Option<Suggestion> {
        match self {
            Evaluation::Suggested { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }
}

/// RuleSet holds an ordered, compiled rule list.
///
/// Rules are evaluated in list order and the first enabled rule whose
/// every configured field matches wins. A RuleSet is immutable; edits
/// produce a new one.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// Compiled rules in priority order
    rules: Vec<CompiledRule>,
    /// Configuration for this rule set
    config: EngineConfig,
}

impl RuleSet {
    /// Create an empty RuleSet with the specified configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            rules: Vec::new(),
            config,
        }
    }

    /// Compile a rule list.
    pub fn compile(rules: &[Rule], config: EngineConfig, cache: &PatternCache) -> Self {
        let rules = rules.iter().map(|r| r.compile(cache, &config)).collect();
        Self { rules, config }
    }

    /// Compile a rule list with a private, throwaway pattern cache.
    pub fn from_rules(rules: &[Rule], config: EngineConfig) -> Self {
        Self::compile(rules, config, &PatternCache::new(0))
    }

    /// Get the number of rules in this set.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if this rule set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Get the compiled rules in order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Get the configuration for this rule set.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Find the first enabled rule, starting at `start`, whose fields all
    /// match.
    fn select_from(&self, record: &FieldRecord, start: usize) -> Option<Selection<'_>> {
        for (index, rule) in self.rules.iter().enumerate().skip(start) {
            if !rule.enabled() {
                log::debug!("Rule {} disabled", index);
                continue;
            }

            match rule.try_match(record) {
                Some(substitutions) => {
                    log::debug!("Rule {} matched: {:?}", index, rule.rule().description);
                    return Some(Selection {
                        index,
                        rule,
                        substitutions,
                    });
                }
                None => log::debug!("Rule {} didn't match", index),
            }
        }
        None
    }

    /// Select the first enabled rule whose configured fields all match.
    pub fn select_rule(&self, record: &FieldRecord) -> Option<Selection<'_>> {
        self.select_from(record, 0)
    }

    /// Render the suggestion for a selected rule.
    ///
    /// A rule without a destination pattern, or one that renders to an
    /// empty path, produces no output.
    pub fn render_selection(
        &self,
        selection: &Selection<'_>,
        record: &FieldRecord,
    ) -> Result<Suggestion, RenderError> {
        let rule = selection.rule.rule();
        let empty = || RenderError::EmptyDestination {
            pattern: rule.pattern.clone(),
        };
        if rule.pattern.trim().is_empty() {
            return Err(empty());
        }

        let start_time = self.config.time_zone.apply(record.start_time());
        let filename = render(
            &rule.pattern,
            &selection.substitutions,
            &start_time,
            &self.config.default_date_format,
        )?;
        if filename.trim().is_empty() {
            return Err(empty());
        }

        Ok(Suggestion {
            filename,
            conflict_action: rule.conflict_action_or(self.config.default_conflict_action),
        })
    }

    /// Evaluate a download: select a rule and render its destination.
    ///
    /// With [`RenderFailurePolicy::Stop`] a render failure of the selected
    /// rule ends the search, even if a later rule would match. With
    /// [`RenderFailurePolicy::FallThrough`] the search continues after it.
    pub fn evaluate(&self, record: &FieldRecord) -> Evaluation {
        let mut start = 0;
        let mut last_failure = None;

        while let Some(selection) = self.select_from(record, start) {
            match self.render_selection(&selection, record) {
                Ok(suggestion) => {
                    log::info!("Selected suggestion: {:?}", suggestion);
                    return Evaluation::Suggested {
                        rule_index: selection.index,
                        suggestion,
                    };
                }
                Err(error) => {
                    log::warn!("Rule {} did not render: {}", selection.index, error);
                    match self.config.on_render_failure {
                        RenderFailurePolicy::Stop => {
                            return Evaluation::RenderFailed {
                                rule_index: selection.index,
                                error,
                            };
                        }
                        RenderFailurePolicy::FallThrough => {
                            start = selection.index + 1;
                            last_failure = Some((selection.index, error));
                        }
                    }
                }
            }
        }

        log::debug!("No matching rule was found");
        match last_failure {
            Some((rule_index, error)) => Evaluation::RenderFailed { rule_index, error },
            None => Evaluation::NoMatch,
        }
    }

    /// Evaluate a download and return only the suggestion.
    pub fn suggest(&self, record: &FieldRecord) -> Option<Suggestion> {
        self.evaluate(record).into_suggestion()
    }
}
