//! Statistics derived from a finished crawl

use crate::crawler::CrawlResult;
use crate::url::host_of;
use crate::CrawlError;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Number of pages downloaded
    pub downloaded: usize,

    /// Number of URLs that failed
    pub failed: usize,

    /// Downloaded pages whose links could not be extracted
    pub lost_links: usize,

    /// Downloaded pages per host
    pub pages_by_host: BTreeMap<String, usize>,

    /// Failures per error kind
    pub errors_by_kind: BTreeMap<&'static str, usize>,

    /// Whether the crawl was cut short
    pub interrupted: bool,

    /// Wall-clock duration in milliseconds
    pub elapsed_ms: i64,
}

impl CrawlStatistics {
    /// Summarizes a crawl result
    pub fn from_result(result: &CrawlResult) -> Self {
        let mut pages_by_host = BTreeMap::new();
        for url in &result.downloaded {
            // Downloaded URLs always resolved, but stay total anyway
            let host = host_of(url).unwrap_or_else(|_| "<unknown>".to_string());
            *pages_by_host.entry(host).or_insert(0) += 1;
        }

        let mut errors_by_kind = BTreeMap::new();
        for error in result.errors.values() {
            *errors_by_kind.entry(error_kind(error)).or_insert(0) += 1;
        }

        Self {
            downloaded: result.downloaded.len(),
            failed: result.errors.len(),
            lost_links: result.lost_links.len(),
            pages_by_host,
            errors_by_kind,
            interrupted: result.interrupted,
            elapsed_ms: result.elapsed().num_milliseconds(),
        }
    }

    /// Percentage of attempted URLs that were downloaded
    pub fn success_rate(&self) -> f64 {
        let attempted = self.downloaded + self.failed;
        if attempted == 0 {
            0.0
        } else {
            self.downloaded as f64 / attempted as f64 * 100.0
        }
    }
}

/// Short label for an error kind
pub fn error_kind(error: &CrawlError) -> &'static str {
    use crate::FetchError;

    match error {
        CrawlError::Url(_) => "invalid-url",
        CrawlError::Fetch(FetchError::Http { .. }) => "network",
        CrawlError::Fetch(FetchError::Status { .. }) => "http-status",
        CrawlError::Fetch(FetchError::ContentMismatch { .. }) => "not-html",
        CrawlError::Fetch(FetchError::Unavailable { .. }) => "unavailable",
        CrawlError::Interrupted { .. } => "interrupted",
    }
}

/// Renders a human-readable report of a crawl
pub fn render_report(result: &CrawlResult) -> String {
    let stats = CrawlStatistics::from_result(result);
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Crawl Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Downloaded: {}", stats.downloaded);
    let _ = writeln!(out, "  Failed: {}", stats.failed);
    let _ = writeln!(out, "  Lost links: {}", stats.lost_links);
    let _ = writeln!(out, "  Elapsed: {}ms", stats.elapsed_ms);
    if stats.interrupted {
        let _ = writeln!(out, "  Interrupted: yes");
    }
    let _ = writeln!(out);

    if !stats.pages_by_host.is_empty() {
        let _ = writeln!(out, "Pages by Host:");
        let mut hosts: Vec<_> = stats.pages_by_host.iter().collect();
        hosts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (host, count) in hosts {
            let _ = writeln!(out, "  {}: {}", host, count);
        }
        let _ = writeln!(out);
    }

    if !result.errors.is_empty() {
        let _ = writeln!(out, "Errors:");
        let mut errors: Vec<_> = result.errors.iter().collect();
        errors.sort_by(|a, b| a.0.cmp(b.0));
        for (url, error) in errors {
            let _ = writeln!(out, "  [{}] {}: {}", error_kind(error), url, error);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} URLs downloaded)",
        stats.success_rate(),
        stats.downloaded,
        stats.downloaded + stats.failed
    );

    out
}

/// Prints the crawl report to stdout
pub fn print_statistics(result: &CrawlResult) {
    print!("{}", render_report(result));
}
