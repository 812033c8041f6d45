//! Compilation of user-supplied matcher regexes.
//!
//! Rule fields hold regex sources written by users, so compilation has to
//! degrade gracefully. A pattern is first compiled as a case-insensitive
//! Unicode regex; if that fails it is retried as a byte regex with Unicode
//! disabled; if that fails too, [`InvalidPatternPolicy`] decides whether it
//! never matches or matches everything.

use quick_cache::sync::Cache;
use regex::bytes::{Regex as BytesRegex, RegexBuilder as BytesRegexBuilder};
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use crate::error::PatternError;
use crate::ruleset::InvalidPatternPolicy;
use crate::substitution::Substitution;

/// Default pattern cache capacity (number of compiled patterns).
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 1_024;

/// How a pattern ended up being compiled.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-insensitive Unicode regex
    Unicode(Regex),
    /// Case-insensitive byte regex with Unicode disabled
    Bytes(BytesRegex),
    /// Uncompilable pattern that matches any value as a whole
    MatchAll,
    /// Uncompilable pattern that never matches
    NoMatch,
}

impl Matcher {
    /// Short name of the compilation mode, for logs and validation output.
    pub fn describe(&self) -> &'static str {
        match self {
            Matcher::Unicode(_) => "unicode",
            Matcher::Bytes(_) => "bytes",
            Matcher::MatchAll => "match-all",
            Matcher::NoMatch => "no-match",
        }
    }
}

/// A compiled matcher pattern for one rule field.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    matcher: Matcher,
}

impl CompiledPattern {
    /// Compile `source`, falling back as described in the module docs.
    pub fn compile(source: &str, policy: InvalidPatternPolicy) -> Self {
        let matcher = match Self::try_compile(source) {
            Ok(matcher) => matcher,
            Err(e) => {
                log::warn!("{}", e);
                match policy {
                    InvalidPatternPolicy::NoMatch => Matcher::NoMatch,
                    InvalidPatternPolicy::MatchAll => Matcher::MatchAll,
                }
            }
        };

        Self {
            source: source.to_string(),
            matcher,
        }
    }

    /// Compile without applying a fallback policy.
    pub fn try_compile(source: &str) -> Result<Matcher, PatternError> {
        let unicode_err = match RegexBuilder::new(source).case_insensitive(true).build() {
            Ok(regex) => return Ok(Matcher::Unicode(regex)),
            Err(e) => e,
        };

        match BytesRegexBuilder::new(source)
            .case_insensitive(true)
            .unicode(false)
            .build()
        {
            Ok(regex) => {
                log::debug!(
                    "Pattern {:?} compiled without Unicode support: {}",
                    source,
                    unicode_err
                );
                Ok(Matcher::Bytes(regex))
            }
            Err(_) => Err(PatternError::Invalid {
                pattern: source.to_string(),
                reason: unicode_err.to_string(),
            }),
        }
    }

    /// The original regex source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// How the pattern was compiled.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Match `value`, returning its substitution on success.
    ///
    /// The first (leftmost) match is used, like an unanchored search.
    pub fn captures(&self, value: &str) -> Option<Substitution> {
        match &self.matcher {
            Matcher::Unicode(regex) => {
                let caps = regex.captures(value)?;
                let groups = caps
                    .iter()
                    .skip(1)
                    .map(|g| g.map(|m| m.as_str().to_string()));
                Some(Substitution::with_groups(value, groups))
            }
            Matcher::Bytes(regex) => {
                let caps = regex.captures(value.as_bytes())?;
                let groups = caps
                    .iter()
                    .skip(1)
                    .map(|g| g.map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned()));
                Some(Substitution::with_groups(value, groups))
            }
            Matcher::MatchAll => Some(Substitution::with_groups(value, std::iter::empty())),
            Matcher::NoMatch => None,
        }
    }
}

/// Bounded cache of compiled patterns keyed by source and fallback policy.
///
/// Rule lists are recompiled on every edit; the cache makes that cheap for
/// the rules that did not change.
pub struct PatternCache {
    cache: Option<Cache<(String, InvalidPatternPolicy), Arc<CompiledPattern>>>,
}

impl PatternCache {
    /// Create a cache with the specified capacity. Zero disables caching.
    pub fn new(capacity: usize) -> Self {
        let cache = if capacity > 0 {
            Some(Cache::new(capacity))
        } else {
            None
        };
        Self { cache }
    }

    /// Get a compiled pattern, compiling and caching it on a miss.
    pub fn get_or_compile(&self, source: &str, policy: InvalidPatternPolicy) -> Arc<CompiledPattern> {
        let Some(cache) = &self.cache else {
            return Arc::new(CompiledPattern::compile(source, policy));
        };

        let key = (source.to_string(), policy);
        if let Some(hit) = cache.get(&key) {
            return hit;
        }

        let compiled = Arc::new(CompiledPattern::compile(source, policy));
        cache.insert(key, compiled.clone());
        compiled
    }

    /// Number of cached patterns.
    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.len())
    }

    /// Check if the cache holds no patterns.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all cached patterns.
    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN_CACHE_CAPACITY)
    }
}
