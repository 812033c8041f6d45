//! Engine configuration types.

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::conflict::ConflictAction;
use crate::date_format::DEFAULT_DATE_FORMAT;
use crate::error::{Error, Result};
use crate::pattern::DEFAULT_PATTERN_CACHE_CAPACITY;

/// What an uncompilable matcher regex does.
///
/// The compile fallback chain ends either in a catch-all that matches the
/// whole value (`MatchAll`) or in a plain match failure (`NoMatch`). The
/// default treats a broken matcher as a failed match, so a typo never turns
/// a narrow rule into one that captures every download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidPatternPolicy {
    /// The field never matches, so the rule is skipped
    #[default]
    NoMatch,
    /// The field matches any value, with no capture groups
    MatchAll,
}

/// What happens when the selected rule's template cannot be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderFailurePolicy {
    /// Stop searching and make no suggestion
    #[default]
    Stop,
    /// Keep searching with the next rule
    FallThrough,
}

/// Time zone used to render `${date}` placeholders.
///
/// Serialised as `local`, `utc`, `source` or a fixed offset such as
/// `+05:30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateZone {
    /// The machine's local time zone
    #[default]
    Local,
    /// UTC
    Utc,
    /// Whatever offset the start time was reported with
    Source,
    /// A fixed offset from UTC
    Fixed(FixedOffset),
}

impl DateZone {
    /// Parse a zone name or a `+HH:MM` / `-HHMM` / `+HH` offset.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" => return Some(DateZone::Local),
            "utc" | "z" => return Some(DateZone::Utc),
            "source" => return Some(DateZone::Source),
            _ => {}
        }

        let (sign, rest) = match s.as_bytes().first()? {
            b'+' => (1, &s[1..]),
            b'-' => (-1, &s[1..]),
            _ => return None,
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let (hours, minutes) = match digits.len() {
            2 => (digits.parse::<i32>().ok()?, 0),
            4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
            _ => return None,
        };
        if minutes >= 60 {
            return None;
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).map(DateZone::Fixed)
    }

    /// Move a start time into this zone.
    pub fn apply(&self, time: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            DateZone::Local => time.with_timezone(&Local).fixed_offset(),
            DateZone::Utc => time.with_timezone(&Utc).fixed_offset(),
            DateZone::Source => time,
            DateZone::Fixed(offset) => time.with_timezone(offset),
        }
    }
}

impl fmt::Display for DateZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateZone::Local => write!(f, "local"),
            DateZone::Utc => write!(f, "utc"),
            DateZone::Source => write!(f, "source"),
            DateZone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl TryFrom<String> for DateZone {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        DateZone::parse(&s).ok_or_else(|| format!("unknown time zone: {}", s))
    }
}

impl From<DateZone> for String {
    fn from(zone: DateZone) -> Self {
        zone.to_string()
    }
}

/// Pre-defined engine profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineProfile {
    /// Bad regexes never match; a render failure ends the search
    Strict,
    /// Bad regexes never match; a render failure moves on to the next rule
    Lenient,
    /// Bad regexes match everything; a render failure ends the search
    Legacy,
}

impl EngineProfile {
    /// Get the internal name of this profile.
    pub fn name(&self) -> &'static str {
        match self {
            EngineProfile::Strict => "strict",
            EngineProfile::Lenient => "lenient",
            EngineProfile::Legacy => "legacy",
        }
    }

    /// Parse a profile from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Some(EngineProfile::Strict),
            "lenient" => Some(EngineProfile::Lenient),
            "legacy" => Some(EngineProfile::Legacy),
            _ => None,
        }
    }

    /// Get the EngineConfig for this profile.
    pub fn config(&self) -> EngineConfig {
        let (invalid_pattern, on_render_failure) = match self {
            EngineProfile::Strict => (InvalidPatternPolicy::NoMatch, RenderFailurePolicy::Stop),
            EngineProfile::Lenient => {
                (InvalidPatternPolicy::NoMatch, RenderFailurePolicy::FallThrough)
            }
            EngineProfile::Legacy => (InvalidPatternPolicy::MatchAll, RenderFailurePolicy::Stop),
        };
        EngineConfig {
            invalid_pattern,
            on_render_failure,
            ..EngineConfig::default()
        }
    }
}

/// Behavioural settings for rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Handling of matcher regexes that do not compile
    pub invalid_pattern: InvalidPatternPolicy,
    /// Handling of templates that do not render
    pub on_render_failure: RenderFailurePolicy,
    /// Format of a bare `${date}` placeholder
    pub default_date_format: String,
    /// Time zone for `${date}` placeholders
    pub time_zone: DateZone,
    /// Conflict action for rules without a recognised one
    pub default_conflict_action: ConflictAction,
    /// Capacity of the compiled pattern cache (0 disables it)
    pub pattern_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            invalid_pattern: InvalidPatternPolicy::default(),
            on_render_failure: RenderFailurePolicy::default(),
            default_date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_zone: DateZone::default(),
            default_conflict_action: ConflictAction::default(),
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Create an EngineConfig from a profile.
    pub fn from_profile(profile: EngineProfile) -> Self {
        profile.config()
    }

    /// Parse a configuration from JSON.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a configuration from YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a configuration file, choosing the format by extension.
    ///
    /// `.yml`/`.yaml` files are YAML, everything else is JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => Self::from_yaml(&content)?,
            _ => Self::from_json(&content)?,
        };
        if config.default_date_format.is_empty() {
            return Err(Error::Config("default-date-format must not be empty".to_string()));
        }
        Ok(config)
    }
}
