//! Active tab URL lookup.
//!
//! The tab URL is the only input that depends on a host permission. The
//! engine never asks for that permission; it only consults a
//! [`TabUrlProvider`] and treats every failure as "no tab URL".

use crate::error::Result;

/// Source of the URL of the currently focused tab.
pub trait TabUrlProvider: Send + Sync {
    /// Check if the host granted permission to read tab URLs.
    fn has_permission(&self) -> bool;

    /// Look up the URL of the active tab in the current window.
    fn active_tab_url(&self) -> Result<Option<String>>;
}

/// Resolve the active tab URL, returning `None` without permission, on
/// lookup failure, or for an empty URL.
pub fn resolve_tab_url(provider: &dyn TabUrlProvider) -> Option<String> {
    if !provider.has_permission() {
        return None;
    }

    match provider.active_tab_url() {
        Ok(url) => url.filter(|u| !u.is_empty()),
        Err(e) => {
            log::warn!("Failed to get active tab URL: {}", e);
            None
        }
    }
}

/// Provider for hosts without tab access.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTabAccess;

impl TabUrlProvider for NoTabAccess {
    fn has_permission(&self) -> bool {
        false
    }

    fn active_tab_url(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Provider that always reports the same tab URL.
#[derive(Debug, Clone, Default)]
pub struct FixedTabUrl {
    url: Option<String>,
}

impl FixedTabUrl {
    /// Create a provider for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }

    /// Create a provider with permission but no active tab.
    pub fn none() -> Self {
        Self { url: None }
    }
}

impl TabUrlProvider for FixedTabUrl {
    fn has_permission(&self) -> bool {
        true
    }

    fn active_tab_url(&self) -> Result<Option<String>> {
        Ok(self.url.clone())
    }
}
