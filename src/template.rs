//! Destination template rendering.
//!
//! A destination pattern is a relative path with `${...}` placeholders:
//!
//! - `${field}` is replaced by the whole value of a matched field
//! - `${field:n}` is replaced by capture group `n` of that field's regex
//! - `${date}` / `${date:FORMAT}` is replaced by the download start time
//!
//! A pattern ending in `/` names a directory and gets the original
//! filename appended. Leading `/` characters are stripped so the result is
//! always relative to the download directory.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::date_format::format_date;
use crate::error::RenderError;
use crate::field::Field;
use crate::substitution::SubstitutionMap;

/// Placeholder name reserved for the download start time.
pub const DATE_FIELD: &str = "date";

/// `${name}` or `${name:arg}`; `arg` runs to the first closing brace.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_]+)(?::(.+?))?\}").expect("placeholder pattern is valid")
});

/// A placeholder found in a destination pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Placeholder text as written, e.g. `${referrer:1}`
    pub raw: String,
    /// Field name or `date`
    pub name: String,
    /// Capture index or date format
    pub arg: Option<String>,
}

impl Placeholder {
    fn from_captures(caps: &Captures<'_>) -> Self {
        Self {
            raw: caps[0].to_string(),
            name: caps[1].to_string(),
            arg: caps.get(2).map(|m| m.as_str().to_string()),
        }
    }

    /// Check if the placeholder refers to `date` or one of the six fields.
    pub fn is_known(&self) -> bool {
        self.name == DATE_FIELD || Field::parse(&self.name).is_some()
    }
}

/// List the placeholders of a destination pattern in order.
pub fn placeholders(pattern: &str) -> Vec<Placeholder> {
    PLACEHOLDER
        .captures_iter(pattern)
        .map(|caps| Placeholder::from_captures(&caps))
        .collect()
}

/// Parse a capture index written in a placeholder.
///
/// Only canonical decimal integers are indices: `0`, `1`, `12`. Signs,
/// leading zeros, whitespace and non-digits are lookup misses.
fn parse_index(arg: &str) -> Option<usize> {
    let canonical = !arg.is_empty()
        && arg.bytes().all(|b| b.is_ascii_digit())
        && (arg.len() == 1 || !arg.starts_with('0'));
    if canonical {
        arg.parse().ok()
    } else {
        None
    }
}

/// Resolve a single placeholder, or `None` if it cannot be resolved.
fn resolve(
    placeholder: &Placeholder,
    substitutions: &SubstitutionMap,
    start_time: &DateTime<FixedOffset>,
    default_date_format: &str,
) -> Option<String> {
    if placeholder.name == DATE_FIELD {
        let format = placeholder.arg.as_deref().unwrap_or(default_date_format);
        return Some(format_date(start_time, format));
    }

    let substitution = substitutions.get_by_name(&placeholder.name)?;
    match placeholder.arg.as_deref() {
        None => substitution.value().map(str::to_string),
        Some(arg) => {
            let index = parse_index(arg)?;
            // Empty captures count as missing, like groups that did not
            // participate in the match.
            substitution
                .get(index)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
    }
}

/// Render a destination pattern into a relative path.
///
/// Every placeholder must resolve; otherwise the whole render fails and
/// the error lists all unresolved placeholders.
///
/// # Example
/// ```
/// use chrono::DateTime;
/// use dlrule::field::Field;
/// use dlrule::substitution::{Substitution, SubstitutionMap};
/// use dlrule::template::render;
///
/// let mut subs = SubstitutionMap::new();
/// subs.insert(Field::Filename, Substitution::whole(Some("photo.png")));
/// let t = DateTime::parse_from_rfc3339("2024-03-05T00:00:00Z").unwrap();
///
/// assert_eq!(render("images/", &subs, &t, "YYYY-MM-DD").unwrap(), "images/photo.png");
/// assert_eq!(render("/${date}/", &subs, &t, "YYYY").unwrap(), "2024/photo.png");
/// assert!(render("${nonexistent}/", &subs, &t, "YYYY").is_err());
/// ```
pub fn render(
    pattern: &str,
    substitutions: &SubstitutionMap,
    start_time: &DateTime<FixedOffset>,
    default_date_format: &str,
) -> Result<String, RenderError> {
    let mut unresolved = Vec::new();

    let expanded = PLACEHOLDER.replace_all(pattern, |caps: &Captures<'_>| {
        let placeholder = Placeholder::from_captures(caps);
        match resolve(&placeholder, substitutions, start_time, default_date_format) {
            Some(value) => value,
            None => {
                log::debug!("Unresolved placeholder {}", placeholder.raw);
                unresolved.push(placeholder.raw.clone());
                placeholder.raw
            }
        }
    });
    let mut filename = expanded.into_owned();

    // A directory-only destination keeps the original filename.
    if filename.ends_with('/') {
        if let Some(original) = substitutions.get(Field::Filename).and_then(|s| s.value()) {
            filename.push_str(original);
        }
    }

    let filename = filename.trim_start_matches('/').to_string();

    if unresolved.is_empty() {
        Ok(filename)
    } else {
        Err(RenderError::Unresolved {
            placeholders: unresolved,
            partial: filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substitution::Substitution;

    fn start() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-05T00:00:00Z").unwrap()
    }

    fn subs() -> SubstitutionMap {
        let mut map = SubstitutionMap::new();
        map.insert(Field::Mime, Substitution::whole(Some("image/png")));
        map.insert(Field::TabUrl, Substitution::whole(None));
        map.insert(
            Field::Referrer,
            Substitution::with_groups(
                "https://example.com/page",
                vec![Some("example.com".to_string()), Some(String::new()), None],
            ),
        );
        map.insert(Field::Filename, Substitution::whole(Some("photo.png")));
        map
    }

    fn ok(pattern: &str) -> String {
        render(pattern, &subs(), &start(), "YYYY-MM-DD").unwrap()
    }

    #[test]
    fn test_directory_pattern_appends_filename() {
        assert_eq!(ok("images/"), "images/photo.png");
        assert_eq!(ok("images/x.png"), "images/x.png");
    }

    #[test]
    fn test_leading_slashes_stripped() {
        assert_eq!(ok("/leading/slash/file.txt"), "leading/slash/file.txt");
        assert_eq!(ok("///a"), "a");
        assert_eq!(ok("/"), "photo.png");
    }

    #[test]
    fn test_capture_index() {
        assert_eq!(ok("site/${referrer:1}/"), "site/example.com/photo.png");
        assert_eq!(ok("${referrer:0}"), "https://example.com/page");
        assert_eq!(ok("${mime}"), "image/png");
    }

    #[test]
    fn test_date_placeholders() {
        assert_eq!(ok("other/${date:YYYY-MM-DD}/"), "other/2024-03-05/photo.png");
        assert_eq!(ok("${date}"), "2024-03-05");
        assert_eq!(
            render("${date}", &subs(), &start(), "YYYY/MM").unwrap(),
            "2024/03"
        );
    }

    #[test]
    fn test_date_ignores_substitutions() {
        // `date` is not a field, and never looked up in the map
        assert_eq!(ok("${date:YYYY}-${filename}"), "2024-photo.png");
    }

    #[test]
    fn test_unknown_field_fails() {
        let err = render("${nonexistent}/", &subs(), &start(), "YYYY").unwrap_err();
        assert_eq!(err.placeholders(), ["${nonexistent}".to_string()]);
        match err {
            RenderError::Unresolved { partial, .. } => {
                assert_eq!(partial, "${nonexistent}/photo.png");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_in_map_fails() {
        // `url` is a real field but not in this map
        assert!(render("${url}", &subs(), &start(), "YYYY").is_err());
    }

    #[test]
    fn test_index_misses() {
        for pattern in [
            "${referrer:2}",  // empty capture
            "${referrer:3}",  // non-participating group
            "${referrer:9}",  // out of range
            "${referrer:01}", // leading zero
            "${referrer:+1}",
            "${referrer:abc}",
            "${referrer:length}",
        ] {
            assert!(
                render(pattern, &subs(), &start(), "YYYY").is_err(),
                "{} should not render",
                pattern
            );
        }
    }

    #[test]
    fn test_absent_tab_url_fails() {
        assert!(render("${tabUrl}", &subs(), &start(), "YYYY").is_err());
    }

    #[test]
    fn test_all_unresolved_reported() {
        let err = render("${a}/${mime}/${b:1}", &subs(), &start(), "YYYY").unwrap_err();
        assert_eq!(err.placeholders(), ["${a}".to_string(), "${b:1}".to_string()]);
    }

    #[test]
    fn test_non_placeholders_are_literal() {
        assert_eq!(ok("$mime/${}/${mime:}"), "$mime/${}/${mime:}");
        assert_eq!(ok("a-${mime}-b"), "a-image/png-b");
    }

    #[test]
    fn test_render_is_idempotent() {
        let a = ok("site/${referrer:1}/${date:YYYY}/");
        let b = ok("site/${referrer:1}/${date:YYYY}/");
        assert_eq!(a, b);
    }

    #[test]
    fn test_placeholders_listing() {
        let found = placeholders("x/${referrer:1}/${date:[Y]YYYY}/${foo}");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].name, "referrer");
        assert_eq!(found[0].arg.as_deref(), Some("1"));
        assert_eq!(found[1].arg.as_deref(), Some("[Y]YYYY"));
        assert!(found[1].is_known());
        assert!(!found[2].is_known());
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("12"), Some(12));
        assert_eq!(parse_index("01"), None);
        assert_eq!(parse_index(""), None);
        assert_eq!(parse_index(" 1"), None);
    }
}
