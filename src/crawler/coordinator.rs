//! Crawler lifecycle: construction, crawl entry points and shutdown
//!
//! A [`Crawler`] owns the two worker stages and the document source for its
//! whole lifetime. Any number of crawls, sequential or concurrent, share them;
//! the visited set, host throttle and result of each crawl are private to it.

use crate::config::{validate_limit, Config, CrawlerConfig};
use crate::crawler::result::{CrawlResult, ResultAggregator};
use crate::crawler::scheduler::{run_layers, CrawlContext};
use crate::crawler::stage::Stage;
use crate::crawler::visited::VisitedSet;
use crate::source::DocumentSource;
use crate::url::HostFilter;
use crate::StrataError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Constructor-time bounds of a crawler; `None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlerLimits {
    pub downloaders: Option<usize>,
    pub extractors: Option<usize>,
    pub per_host: Option<usize>,
    pub shutdown_grace: Duration,
}

impl Default for CrawlerLimits {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

impl From<&CrawlerConfig> for CrawlerLimits {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            downloaders: config.downloaders,
            extractors: config.extractors,
            per_host: config.per_host,
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        }
    }
}

/// Parameters of one crawl invocation
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Where the crawl starts; always attempted regardless of the filter
    pub seed: String,

    /// Link hops to follow from the seed; 0 downloads nothing
    pub depth: u32,

    /// Which hosts discovered pages may be downloaded from
    pub filter: HostFilter,
}

impl CrawlRequest {
    pub fn new(seed: impl Into<String>, depth: u32) -> Self {
        Self {
            seed: seed.into(),
            depth,
            filter: HostFilter::Any,
        }
    }

    pub fn with_filter(mut self, filter: HostFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// How `close` went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReport {
    /// Every task finished within the grace period
    Terminated,

    /// Some tasks were still running when the grace period ran out
    TimedOut { outstanding: usize },

    /// `close` had already been called
    AlreadyClosed,
}

/// A bounded-concurrency breadth-first crawler
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use strata::{Crawler, CrawlerLimits, HttpSource, Config};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = Arc::new(HttpSource::from_config(&Config::default())?);
/// let limits = CrawlerLimits {
///     downloaders: Some(16),
///     extractors: Some(4),
///     per_host: Some(2),
///     ..CrawlerLimits::default()
/// };
///
/// let crawler = Crawler::new(source, limits)?;
/// let result = crawler.crawl("https://example.com/", 2).await;
/// println!("{} pages downloaded", result.downloaded.len());
/// crawler.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    source: Arc<dyn DocumentSource>,
    downloads: Stage,
    extractions: Stage,
    per_host: Option<usize>,
    shutdown_grace: Duration,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    closed: AtomicBool,
}

impl Crawler {
    /// Creates a crawler with its two worker stages
    ///
    /// # Errors
    ///
    /// * `StrataError::Config` - a limit is zero or too large for a semaphore
    /// * `StrataError::Runtime` - called outside a tokio runtime
    pub fn new(source: Arc<dyn DocumentSource>, limits: CrawlerLimits) -> Result<Self, StrataError> {
        validate_limit("downloaders", limits.downloaders)?;
        validate_limit("extractors", limits.extractors)?;
        validate_limit("per-host", limits.per_host)?;
        tokio::runtime::Handle::try_current()?;

        let tracker = TaskTracker::new();
        let shutdown = CancellationToken::new();

        tracing::debug!(
            "Creating crawler: downloaders={:?}, extractors={:?}, per_host={:?}",
            limits.downloaders,
            limits.extractors,
            limits.per_host
        );

        Ok(Self {
            source,
            downloads: Stage::new(
                "download",
                limits.downloaders,
                tracker.clone(),
                shutdown.clone(),
            ),
            extractions: Stage::new(
                "extraction",
                limits.extractors,
                tracker.clone(),
                shutdown.clone(),
            ),
            per_host: limits.per_host,
            shutdown_grace: limits.shutdown_grace,
            shutdown,
            tracker,
            closed: AtomicBool::new(false),
        })
    }

    /// Creates a crawler from the `[crawler]` section of a configuration
    pub fn from_config(config: &Config, source: Arc<dyn DocumentSource>) -> Result<Self, StrataError> {
        Self::new(source, CrawlerLimits::from(&config.crawler))
    }

    /// Crawls every host reachable from `seed` within `depth` hops
    pub async fn crawl(&self, seed: &str, depth: u32) -> CrawlResult {
        self.run(CrawlRequest::new(seed, depth)).await
    }

    /// Crawls from `seed`, downloading discovered pages only on `allowed_hosts`
    pub async fn crawl_with_host_filter<I, S>(
        &self,
        seed: &str,
        depth: u32,
        allowed_hosts: I,
    ) -> CrawlResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run(CrawlRequest::new(seed, depth).with_filter(HostFilter::allow(allowed_hosts)))
            .await
    }

    /// Crawls from `seed`, skipping hosts that contain any of `excludes`
    pub async fn crawl_excluding<I, S>(&self, seed: &str, depth: u32, excludes: I) -> CrawlResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run(CrawlRequest::new(seed, depth).with_filter(HostFilter::exclude(excludes)))
            .await
    }

    /// Runs one crawl invocation
    ///
    /// Never fails: per-URL problems are recorded in the result. If the
    /// crawler is closed meanwhile, the result holds whatever settled before.
    pub async fn run(&self, request: CrawlRequest) -> CrawlResult {
        if self.is_closed() {
            tracing::warn!("Crawler is closed, ignoring crawl of {}", request.seed);
            let mut result = CrawlResult::empty();
            result.interrupted = true;
            return result;
        }

        tracing::info!("Starting crawl of {} (depth {})", request.seed, request.depth);

        let ctx = Arc::new(CrawlContext {
            source: self.source.clone(),
            downloads: self.downloads.clone(),
            extractions: self.extractions.clone(),
            per_host: self.per_host,
            filter: request.filter.clone(),
            visited: VisitedSet::new(),
            result: ResultAggregator::new(),
            cancel: self.shutdown.child_token(),
        });

        // A crawl future dropped mid-flight takes its tasks down with it
        let _abandon = ctx.cancel.clone().drop_guard();
        let result = run_layers(ctx, request).await;

        tracing::info!(
            "Crawl finished: {} downloaded, {} failed, {} lost links{}",
            result.downloaded.len(),
            result.errors.len(),
            result.lost_links.len(),
            if result.interrupted { " (interrupted)" } else { "" }
        );

        result
    }

    /// Runs one crawl, closing the crawler if `interrupt` completes first
    ///
    /// The crawl is still awaited after an interrupt, so the partial result
    /// comes back marked `interrupted` together with the shutdown report.
    pub async fn run_until<F>(
        &self,
        request: CrawlRequest,
        interrupt: F,
    ) -> (CrawlResult, Option<ShutdownReport>)
    where
        F: Future<Output = ()>,
    {
        let crawl = self.run(request);
        tokio::pin!(crawl);

        tokio::select! {
            result = &mut crawl => (result, None),
            _ = interrupt => {
                tracing::warn!("Crawl interrupted, shutting down");
                let (result, report) = tokio::join!(&mut crawl, self.close());
                (result, Some(report))
            }
        }
    }

    /// Returns true once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops the crawler
    ///
    /// Refuses new work, cancels every queued and in-flight task of both
    /// stages, then waits up to the grace period for them to finish. A slow
    /// shutdown is reported, not raised. Only the first call does anything.
    pub async fn close(&self) -> ShutdownReport {
        if self.closed.swap(true, Ordering::AcqRel) {
            return ShutdownReport::AlreadyClosed;
        }

        tracing::info!("Shutting down crawler");
        self.tracker.close();
        self.shutdown.cancel();

        match tokio::time::timeout(self.shutdown_grace, self.tracker.wait()).await {
            Ok(()) => {
                tracing::debug!("All crawler tasks terminated");
                ShutdownReport::Terminated
            }
            Err(_) => {
                let outstanding = self.tracker.len();
                tracing::warn!(
                    "{} crawler tasks did not terminate within {:?}",
                    outstanding,
                    self.shutdown_grace
                );
                ShutdownReport::TimedOut { outstanding }
            }
        }
    }

    /// Free download and extraction permits (`None` = unbounded)
    pub fn available_permits(&self) -> (Option<usize>, Option<usize>) {
        (self.downloads.available(), self.extractions.available())
    }
}

impl Drop for Crawler {
    fn drop(&mut self) {
        // Tasks observe the token at every await point and wind down on their own
        self.tracker.close();
        self.shutdown.cancel();
    }
}
