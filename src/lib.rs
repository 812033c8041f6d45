//! dlrule - A rule-based download organizer.
//!
//! This crate decides where a browser download should be saved. Each
//! download is described by a handful of fields (MIME type, tab URL,
//! referrer, URL, final URL, filename); user rules attach a regex to any of
//! them and a destination template that may reference whole field values,
//! capture groups and the download date.
//!
//! # Features
//!
//! - **Field extraction**: URL decoding, NFC filename normalization and
//!   MIME correction for `application/octet-stream` downloads
//! - **First match wins**: rules are evaluated in list order, all
//!   configured fields must match
//! - **Templates**: `${field}`, `${field:n}`, `${date}` and `${date:FORMAT}`
//!   placeholders with moment-style date formats
//! - **Hot reload**: rule lists can be replaced while evaluations run
//! - **Thread-safe**: All operations are thread-safe
//!
//! # Quick Start
//!
//! ```
//! use dlrule::{DownloadItem, EngineConfig, Field, Organizer, Rule, StartTime};
//!
//! let rules = vec![
//!     Rule::new("site/${referrer:1}/").with_matcher(Field::Referrer, ".+?://([^/]+)/.*"),
//! ];
//! let organizer = Organizer::new(&rules, EngineConfig::default());
//!
//! let item = DownloadItem {
//!     mime: "application/pdf".to_string(),
//!     referrer: "https://example.com/papers".to_string(),
//!     url: "https://example.com/paper.pdf".to_string(),
//!     final_url: "https://example.com/paper.pdf".to_string(),
//!     filename: "paper.pdf".to_string(),
//!     start_time: StartTime::EpochMillis(0),
//! };
//!
//! let suggestion = organizer.suggest(&item).unwrap();
//! assert_eq!(suggestion.filename, "site/example.com/paper.pdf");
//! ```
//!
//! # Evaluation
//!
//! 1. Fields are extracted once per download
//! 2. Enabled rules are tried in order; fields are checked in the order
//!    `mime`, `tabUrl`, `referrer`, `url`, `finalUrl`, `filename`
//! 3. The first matching rule's template is rendered. If it does not
//!    render, no suggestion is made (configurable)

mod error;

pub mod conflict;
pub mod date_format;
pub mod defaults;
pub mod extract;
pub mod field;
pub mod mime;
pub mod organizer;
pub mod pattern;
pub mod rule;
pub mod ruleset;
pub mod store;
pub mod substitution;
pub mod tab;
pub mod template;

// Re-export core types
pub use error::{Error, PatternError, RenderError, Result};
pub use conflict::ConflictAction;
pub use field::{Field, FIELD_ORDER};

// Re-export extraction types
pub use extract::{extract_fields, DownloadItem, FieldRecord, StartTime};

// Re-export rule and ruleset types
pub use rule::{CompiledRule, Rule, RuleIssue};
pub use ruleset::{
    DateZone, EngineConfig, EngineProfile, Evaluation, InvalidPatternPolicy, RenderFailurePolicy,
    RuleSet, Suggestion,
};

// Re-export orchestration and collaborators
pub use defaults::default_rules;
pub use organizer::Organizer;
pub use store::{export_rules, parse_rules, JsonFileRuleStore, MemoryRuleStore, RuleStore};
pub use tab::{FixedTabUrl, NoTabAccess, TabUrlProvider};
