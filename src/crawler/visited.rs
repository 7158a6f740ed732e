//! Crawl-wide URL deduplication
//!
//! A URL is scheduled at most once per crawl, no matter how many pages link
//! to it or how many tasks discover it at the same moment.

use dashmap::DashSet;

/// URLs already scheduled during one crawl
///
/// Shared by every layer and task of a crawl invocation and discarded with it.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `url` for this crawl
    ///
    /// Returns true for exactly one caller per URL; every later or racing
    /// call for the same URL returns false.
    pub fn claim(&self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
