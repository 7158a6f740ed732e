//! Crawler module: bounded-concurrency breadth-first crawling
//!
//! This module contains the core crawling logic, including:
//! - Per-host download admission
//! - Crawl-wide URL deduplication
//! - Bounded download and extraction stages
//! - Layer-by-layer scheduling with an end-of-layer barrier
//! - Result aggregation and crawler shutdown

mod barrier;
mod coordinator;
mod result;
mod scheduler;
mod stage;
mod throttle;
mod visited;

pub use coordinator::{CrawlRequest, Crawler, CrawlerLimits, ShutdownReport};
pub use result::{CrawlResult, ResultAggregator};
pub use throttle::{HostSlot, HostThrottle};
pub use visited::VisitedSet;
