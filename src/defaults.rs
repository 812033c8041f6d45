//! Built-in default rules.

use crate::field::Field;
use crate::rule::Rule;

/// The default rule list used on first run and by "reset to defaults".
///
/// Sorts common installer, archive, picture and torrent types into their
/// own folders. The domain-folder and date-folder rules ship disabled as
/// examples of capture groups and date placeholders.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new("installers/")
            .with_description("Windows installers and applications (.exe and .msi files)")
            .with_matcher(Field::Mime, "application/(x-msdownload|x-ms-installer|x-msi|exe)"),
        Rule::new("installers/")
            .with_description("Linux installers (.deb and .rpm files)")
            .with_matcher(
                Field::Mime,
                "application/(x-debian-package|x-redhat-package-manager|x-rpm)",
            ),
        Rule::new("installers/")
            .with_description("Mac installers (.dmg files)")
            .with_matcher(Field::Mime, "application/x-apple-diskimage"),
        Rule::new("archives/")
            .with_description("Zip and GZip archives")
            .with_matcher(Field::Mime, "application/(zip|gzip|x-gzip)"),
        Rule::new("images/")
            .with_description("Pictures")
            .with_matcher(Field::Mime, "image/.*"),
        Rule::new("torrents/")
            .with_description("Torrents")
            .with_matcher(Field::Mime, "application/x-bittorrent"),
        Rule::new("site/${referrer:1}/")
            .with_description("Organize downloads by domain-named folders")
            .with_matcher(Field::Referrer, ".+?://([^/]+)/.*")
            .with_enabled(false),
        Rule::new("other/${date:YYYY-MM-DD}/")
            .with_description("Organize everything else by date")
            .with_matcher(Field::Mime, ".*")
            .with_enabled(false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        let rules = default_rules();
        assert_eq!(rules.len(), 8);
        for rule in &rules {
            assert!(rule.validate().is_empty(), "{:?}: {:?}", rule.description, rule.validate());
        }
    }

    #[test]
    fn test_examples_disabled() {
        let enabled: Vec<bool> = default_rules().iter().map(|r| r.enabled).collect();
        assert_eq!(enabled, [true, true, true, true, true, true, false, false]);
    }
}
