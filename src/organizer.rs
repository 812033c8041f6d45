//! Download organizer with hot-swappable rules.
//!
//! The [`Organizer`] is what a host wires into its "determining filename"
//! hook: it resolves the tab URL, extracts the fields of a download and
//! evaluates them against the current rule set.
//!
//! # Example
//!
//! ```
//! use dlrule::{DownloadItem, Organizer, StartTime};
//!
//! let organizer = Organizer::with_defaults();
//! let item = DownloadItem {
//!     mime: "image/png".to_string(),
//!     referrer: "https://example.com/gallery".to_string(),
//!     url: "https://cdn.example.com/photo.png".to_string(),
//!     final_url: "https://cdn.example.com/photo.png".to_string(),
//!     filename: "photo.png".to_string(),
//!     start_time: StartTime::Iso("2024-03-05T10:00:00Z".to_string()),
//! };
//!
//! let suggestion = organizer.suggest(&item).unwrap();
//! assert_eq!(suggestion.filename, "images/photo.png");
//! ```

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::defaults::default_rules;
use crate::error::Result;
use crate::extract::{extract_fields, DownloadItem};
use crate::pattern::PatternCache;
use crate::rule::Rule;
use crate::ruleset::{EngineConfig, Evaluation, RuleSet, Suggestion};
use crate::store::RuleStore;
use crate::tab::{resolve_tab_url, NoTabAccess, TabUrlProvider};

/// Evaluates downloads against a rule set that can be replaced at any time.
///
/// Each evaluation works on one snapshot of the rules, so a concurrent
/// replacement never mixes old and new rules within a single download.
pub struct Organizer {
    /// Current rule set, swapped atomically on edits.
    rules: ArcSwap<RuleSet>,
    /// Engine configuration applied to every rule set.
    config: EngineConfig,
    /// Compiled patterns shared across rule set generations.
    cache: PatternCache,
    /// Source of the active tab URL.
    tab: Box<dyn TabUrlProvider>,
    /// Incremented on each rule replacement.
    generation: AtomicU64,
}

impl Organizer {
    /// Create an organizer with no tab access.
    pub fn new(rules: &[Rule], config: EngineConfig) -> Self {
        Self::with_tab_provider(rules, config, Box::new(NoTabAccess))
    }

    /// Create an organizer with the default rules and configuration.
    pub fn with_defaults() -> Self {
        Self::new(&default_rules(), EngineConfig::default())
    }

    /// Create an organizer with a tab URL provider.
    pub fn with_tab_provider(
        rules: &[Rule],
        config: EngineConfig,
        tab: Box<dyn TabUrlProvider>,
    ) -> Self {
        let cache = PatternCache::new(config.pattern_cache_capacity);
        let ruleset = RuleSet::compile(rules, config.clone(), &cache);
        log::debug!("Organizer created with {} rules", ruleset.len());

        Self {
            rules: ArcSwap::from_pointee(ruleset),
            config,
            cache,
            tab,
            generation: AtomicU64::new(0),
        }
    }

    /// Create an organizer from the rules held by a store.
    pub fn from_store(store: &dyn RuleStore, config: EngineConfig) -> Result<Self> {
        Ok(Self::new(&store.get_rules()?, config))
    }

    /// Evaluate a download with an explicit tab URL.
    ///
    /// Returns [`Evaluation::NoMatch`] when the download's start time
    /// cannot be parsed.
    pub fn evaluate_with_tab(&self, item: &DownloadItem, tab_url: Option<&str>) -> Evaluation {
        let record = match extract_fields(item, tab_url) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Failed to extract fields of {:?}: {}", item.filename, e);
                return Evaluation::NoMatch;
            }
        };

        let ruleset = self.rules.load();
        ruleset.evaluate(&record)
    }

    /// Evaluate a download, looking up the tab URL from the provider.
    pub fn evaluate(&self, item: &DownloadItem) -> Evaluation {
        let tab_url = resolve_tab_url(self.tab.as_ref());
        self.evaluate_with_tab(item, tab_url.as_deref())
    }

    /// Suggest a destination for a download with an explicit tab URL.
    pub fn suggest_with_tab(&self, item: &DownloadItem, tab_url: Option<&str>) -> Option<Suggestion> {
        self.evaluate_with_tab(item, tab_url).into_suggestion()
    }

    /// Suggest a destination for a download.
    ///
    /// `None` means the host should keep its own filename.
    pub fn suggest(&self, item: &DownloadItem) -> Option<Suggestion> {
        self.evaluate(item).into_suggestion()
    }

    /// Compile a new rule list and swap it in.
    ///
    /// In-flight evaluations finish with the old rules.
    pub fn replace_rules(&self, rules: &[Rule]) {
        let ruleset = RuleSet::compile(rules, self.config.clone(), &self.cache);
        let len = ruleset.len();
        self.rules.store(Arc::new(ruleset));
        self.generation.fetch_add(1, Ordering::SeqCst);
        log::info!("Replaced rules: {} rules", len);
    }

    /// Reload the rules from a store.
    ///
    /// On error the current rules stay in place.
    pub fn reload_from(&self, store: &dyn RuleStore) -> Result<()> {
        let rules = store.get_rules()?;
        self.replace_rules(&rules);
        Ok(())
    }

    /// Get a snapshot of the current rule set.
    pub fn rules(&self) -> Arc<RuleSet> {
        self.rules.load_full()
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the current generation (incremented on each replacement).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Get the number of cached compiled patterns.
    pub fn cached_patterns(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::StartTime;
    use crate::field::Field;
    use crate::store::MemoryRuleStore;
    use crate::tab::FixedTabUrl;

    fn item(mime: &str, filename: &str) -> DownloadItem {
        DownloadItem {
            mime: mime.to_string(),
            referrer: "https://example.com/page".to_string(),
            url: format!("https://cdn.example.com/{}", filename),
            final_url: format!("https://cdn.example.com/{}", filename),
            filename: filename.to_string(),
            start_time: StartTime::EpochMillis(1_709_596_800_000),
        }
    }

    #[test]
    fn test_default_rules() {
        let organizer = Organizer::with_defaults();
        let s = organizer.suggest(&item("application/zip", "a.zip")).unwrap();
        assert_eq!(s.filename, "archives/a.zip");
        assert!(organizer.suggest(&item("text/plain", "a.txt")).is_none());
    }

    #[test]
    fn test_bad_start_time_is_no_match() {
        let organizer = Organizer::new(&[Rule::new("all/")], EngineConfig::default());
        let mut bad = item("text/plain", "a.txt");
        bad.start_time = StartTime::Iso("yesterday".to_string());
        assert_eq!(organizer.evaluate(&bad), Evaluation::NoMatch);
    }

    #[test]
    fn test_tab_provider() {
        let rules = vec![Rule::new("gh/").with_matcher(Field::TabUrl, "github\\.com")];
        let without = Organizer::new(&rules, EngineConfig::default());
        assert!(without.suggest(&item("text/plain", "a.txt")).is_none());

        let with = Organizer::with_tab_provider(
            &rules,
            EngineConfig::default(),
            Box::new(FixedTabUrl::new("https://github.com/rust-lang")),
        );
        assert_eq!(with.suggest(&item("text/plain", "a.txt")).unwrap().filename, "gh/a.txt");

        // Explicit tab URL bypasses the provider
        assert!(without
            .suggest_with_tab(&item("text/plain", "a.txt"), Some("https://github.com/"))
            .is_some());
    }

    #[test]
    fn test_replace_and_reload() {
        let organizer = Organizer::new(&[], EngineConfig::default());
        let snapshot = organizer.rules();
        assert!(organizer.suggest(&item("text/plain", "a.txt")).is_none());

        organizer.replace_rules(&[Rule::new("text/").with_matcher(Field::Mime, "text/.*")]);
        assert_eq!(organizer.generation(), 1);
        assert_eq!(organizer.suggest(&item("text/plain", "a.txt")).unwrap().filename, "text/a.txt");
        // Old snapshots are unaffected
        assert!(snapshot.is_empty());

        let store = MemoryRuleStore::new(vec![Rule::new("store/")]);
        organizer.reload_from(&store).unwrap();
        assert_eq!(organizer.generation(), 2);
        assert_eq!(organizer.suggest(&item("text/plain", "a.txt")).unwrap().filename, "store/a.txt");
    }
}
