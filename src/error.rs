//! Error types for dlrule.

use thiserror::Error;

/// Error type for dlrule operations.
///
/// Matching and rendering never produce this type; they degrade to
/// "no suggestion". It is returned by the I/O-bearing parts of the crate:
/// rule stores, imports and configuration loading.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Imported payload is not a rule list in any known shape
    #[error("invalid import: {0}")]
    InvalidImport(String),

    /// Invalid start time in a download item
    #[error("invalid start time: {0}")]
    InvalidStartTime(String),

    /// Tab URL lookup failed
    #[error("tab lookup failed: {0}")]
    TabLookup(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for dlrule operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for matcher pattern compilation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Pattern failed to compile in both Unicode and byte mode
    #[error("invalid regular expression {pattern:?}: {reason}")]
    Invalid { pattern: String, reason: String },
}

/// Error type for destination template rendering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// One or more placeholders could not be resolved.
    ///
    /// `partial` is the template with every resolvable placeholder expanded
    /// and every unresolved one left verbatim. It is for diagnostics only.
    #[error("unresolved placeholders {placeholders:?} in {partial:?}")]
    Unresolved {
        placeholders: Vec<String>,
        partial: String,
    },

    /// The pattern is blank or rendered to an empty path
    #[error("rule has no destination: pattern {pattern:?}")]
    EmptyDestination { pattern: String },
}

impl RenderError {
    /// The placeholders that could not be resolved, in template order.
    pub fn placeholders(&self) -> &[String] {
        match self {
            RenderError::Unresolved { placeholders, .. } => placeholders,
            RenderError::EmptyDestination { .. } => &[],
        }
    }
}
