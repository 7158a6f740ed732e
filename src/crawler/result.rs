//! Crawl results and their concurrent aggregation

use crate::CrawlError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Outcome of one crawl invocation
#[derive(Debug)]
pub struct CrawlResult {
    /// Successfully downloaded URLs, in completion order
    pub downloaded: Vec<String>,

    /// URLs that failed, with the failure each produced
    pub errors: HashMap<String, CrawlError>,

    /// Downloaded URLs whose outgoing links could not be extracted
    pub lost_links: Vec<String>,

    /// True when cancellation cut the crawl short
    pub interrupted: bool,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    /// A result with nothing downloaded and nothing failed
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            downloaded: Vec::new(),
            errors: HashMap::new(),
            lost_links: Vec::new(),
            interrupted: false,
            started_at: now,
            finished_at: now,
        }
    }

    /// Returns true if `url` was downloaded
    pub fn contains(&self, url: &str) -> bool {
        self.downloaded.iter().any(|u| u == url)
    }

    /// Wall-clock duration of the crawl
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Collects results from every task of one crawl
///
/// Both collections accept concurrent writers. A URL reaches at most one of
/// them because the visited set admits each URL to exactly one task.
#[derive(Debug)]
pub struct ResultAggregator {
    downloaded: Mutex<Vec<String>>,
    errors: DashMap<String, CrawlError>,
    lost_links: Mutex<Vec<String>>,
    started_at: DateTime<Utc>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            downloaded: Mutex::new(Vec::new()),
            errors: DashMap::new(),
            lost_links: Mutex::new(Vec::new()),
            started_at: Utc::now(),
        }
    }

    pub fn record_download(&self, url: String) {
        self.downloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url);
    }

    pub fn record_error(&self, url: String, error: CrawlError) {
        self.errors.insert(url, error);
    }

    pub fn record_lost_links(&self, url: String) {
        self.lost_links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url);
    }

    pub fn downloaded_count(&self) -> usize {
        self.downloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Moves everything collected so far into a `CrawlResult`
    pub fn finish(&self, interrupted: bool) -> CrawlResult {
        let downloaded = std::mem::take(
            &mut *self
                .downloaded
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let lost_links = std::mem::take(
            &mut *self
                .lost_links
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        // Drain key by key; a straggling writer after finish is simply dropped
        let keys: Vec<String> = self.errors.iter().map(|e| e.key().clone()).collect();
        let errors = keys
            .into_iter()
            .filter_map(|url| self.errors.remove(&url))
            .collect();

        CrawlResult {
            downloaded,
            errors,
            lost_links,
            interrupted,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
