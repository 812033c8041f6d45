//! Matchable download field definitions.

use std::fmt;

/// Field is one of the six download attributes a rule can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// MIME type, possibly corrected from the filename extension
    Mime,
    /// URL of the focused tab (only with tab permission)
    TabUrl,
    /// Referrer URL
    Referrer,
    /// Original download URL
    Url,
    /// URL after redirects
    FinalUrl,
    /// Suggested filename
    Filename,
}

/// Order in which a rule's fields are checked.
///
/// The order is observable: matching stops at the first failing field, and
/// the tab URL gate is reached before any URL regex runs.
pub const FIELD_ORDER: [Field; 6] = [
    Field::Mime,
    Field::TabUrl,
    Field::Referrer,
    Field::Url,
    Field::FinalUrl,
    Field::Filename,
];

impl Field {
    /// Parse a field from its wire name (`mime`, `tabUrl`, `finalUrl`, ...).
    ///
    /// Names are case-sensitive, as in rule JSON and template placeholders.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mime" => Some(Field::Mime),
            "tabUrl" => Some(Field::TabUrl),
            "referrer" => Some(Field::Referrer),
            "url" => Some(Field::Url),
            "finalUrl" => Some(Field::FinalUrl),
            "filename" => Some(Field::Filename),
            _ => None,
        }
    }

    /// Get the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Mime => "mime",
            Field::TabUrl => "tabUrl",
            Field::Referrer => "referrer",
            Field::Url => "url",
            Field::FinalUrl => "finalUrl",
            Field::Filename => "filename",
        }
    }

    /// Position of this field in [`FIELD_ORDER`].
    pub fn index(&self) -> usize {
        match self {
            Field::Mime => 0,
            Field::TabUrl => 1,
            Field::Referrer => 2,
            Field::Url => 3,
            Field::FinalUrl => 4,
            Field::Filename => 5,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
