//! Filename conflict actions handed to the download manager.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ConflictAction tells the download manager what to do when the suggested
/// file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    /// Append a numeric disambiguator to the new file
    #[default]
    Uniquify,
    /// Replace the existing file
    Overwrite,
    /// Ask the user
    Prompt,
}

impl ConflictAction {
    /// Parse a conflict action (case-sensitive, as stored in rules).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uniquify" => Some(ConflictAction::Uniquify),
            "overwrite" => Some(ConflictAction::Overwrite),
            "prompt" => Some(ConflictAction::Prompt),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictAction::Uniquify => "uniquify",
            ConflictAction::Overwrite => "overwrite",
            ConflictAction::Prompt => "prompt",
        }
    }
}

impl fmt::Display for ConflictAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
