//! Output module for reporting crawl results
//!
//! This module turns a finished [`CrawlResult`](crate::CrawlResult) into
//! statistics and a human-readable report.

pub mod stats;

pub use stats::{error_kind, print_statistics, render_report, CrawlStatistics};
