//! Integration tests for the crawler
//!
//! Most tests drive the crawler through an in-memory link graph so that
//! failures, delays and concurrency can be controlled exactly. The last tests
//! use wiremock to run the full HTTP source end-to-end.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use strata::config::Config;
use strata::{
    CrawlError, CrawlRequest, Crawler, CrawlerLimits, Document, DocumentSource, FetchError,
    HostFilter, HttpSource, ParseError, ShutdownReport,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NO_LINKS: &[&str] = &[];

/// In-memory web: page URL -> outgoing links
#[derive(Default)]
struct GraphSource {
    pages: HashMap<String, Vec<String>>,
    broken: HashSet<String>,
    unparseable: HashSet<String>,
    delay: Duration,
    slow: HashMap<String, Duration>,
    stats: Mutex<FetchStats>,
}

#[derive(Default)]
struct FetchStats {
    fetches: HashMap<String, usize>,
    completed: usize,
    in_flight: usize,
    peak_in_flight: usize,
    in_flight_by_host: HashMap<String, usize>,
    peak_by_host: HashMap<String, usize>,
}

impl GraphSource {
    fn new(edges: &[(&str, &[&str])]) -> Self {
        let pages = edges
            .iter()
            .map(|(page, links)| {
                (
                    page.to_string(),
                    links.iter().map(|l| l.to_string()).collect(),
                )
            })
            .collect();

        Self {
            pages,
            ..Self::default()
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_slow(mut self, url: &str, delay: Duration) -> Self {
        self.slow.insert(url.to_string(), delay);
        self
    }

    fn with_broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    fn with_unparseable(mut self, url: &str) -> Self {
        self.unparseable.insert(url.to_string());
        self
    }

    fn fetch_count(&self, url: &str) -> usize {
        let stats = self.stats.lock().unwrap();
        stats.fetches.get(url).copied().unwrap_or(0)
    }

    fn fetched(&self) -> HashSet<String> {
        let stats = self.stats.lock().unwrap();
        stats.fetches.keys().cloned().collect()
    }

    fn completed(&self) -> usize {
        self.stats.lock().unwrap().completed
    }

    fn peak_in_flight(&self) -> usize {
        self.stats.lock().unwrap().peak_in_flight
    }

    fn peak_for_host(&self, host: &str) -> usize {
        let stats = self.stats.lock().unwrap();
        stats.peak_by_host.get(host).copied().unwrap_or(0)
    }
}

fn test_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default()
}

#[async_trait]
impl DocumentSource for GraphSource {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let host = test_host(url);
        {
            let stats = &mut *self.stats.lock().unwrap();
            *stats.fetches.entry(url.to_string()).or_insert(0) += 1;
            stats.in_flight += 1;
            stats.peak_in_flight = stats.peak_in_flight.max(stats.in_flight);
            let current = stats.in_flight_by_host.entry(host.clone()).or_insert(0);
            *current += 1;
            let peak = stats.peak_by_host.entry(host.clone()).or_insert(0);
            *peak = (*peak).max(*current);
        }

        let delay = self.slow.get(url).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        {
            let stats = &mut *self.stats.lock().unwrap();
            stats.completed += 1;
            stats.in_flight -= 1;
            if let Some(count) = stats.in_flight_by_host.get_mut(&host) {
                *count -= 1;
            }
        }

        if self.broken.contains(url) || !self.pages.contains_key(url) {
            return Err(FetchError::Unavailable {
                url: url.to_string(),
                reason: "no such page".to_string(),
            });
        }

        Ok(Document::new(url, ""))
    }

    async fn extract_links(&self, document: &Document) -> Result<Vec<String>, ParseError> {
        if self.unparseable.contains(&document.url) {
            return Err(ParseError {
                url: document.url.clone(),
                message: "garbled".to_string(),
            });
        }

        Ok(self.pages.get(&document.url).cloned().unwrap_or_default())
    }
}

/// Blocks its worker thread while fetching and never observes cancellation
struct StuckSource {
    hold: Duration,
}

#[async_trait]
impl DocumentSource for StuckSource {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        std::thread::sleep(self.hold);
        Ok(Document::new(url, ""))
    }

    async fn extract_links(&self, _document: &Document) -> Result<Vec<String>, ParseError> {
        Ok(Vec::new())
    }
}

/// The graph used by the worked examples
fn example_graph() -> GraphSource {
    GraphSource::new(&[
        ("http://a/", &["http://a/x", "http://b/y"]),
        ("http://a/x", &["http://a/z"]),
        ("http://b/y", &[]),
        ("http://a/z", &[]),
    ])
}

fn limits(downloaders: usize, extractors: usize, per_host: usize) -> CrawlerLimits {
    CrawlerLimits {
        downloaders: Some(downloaders),
        extractors: Some(extractors),
        per_host: Some(per_host),
        shutdown_grace: Duration::from_secs(5),
    }
}

fn as_set(urls: &[String]) -> HashSet<&str> {
    urls.iter().map(|s| s.as_str()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_example_scenario() {
    let source = Arc::new(example_graph());
    let crawler = Crawler::new(source.clone(), limits(4, 2, 1)).unwrap();

    let result = crawler.crawl("http://a/", 2).await;

    assert_eq!(
        as_set(&result.downloaded),
        HashSet::from(["http://a/", "http://a/x", "http://b/y", "http://a/z"])
    );
    assert_eq!(result.downloaded.len(), 4);
    assert!(result.errors.is_empty());
    assert!(result.lost_links.is_empty());
    assert!(!result.interrupted);

    // Layer order is preserved across the barrier
    assert_eq!(result.downloaded[0], "http://a/");
    assert_eq!(result.downloaded[3], "http://a/z");

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_banned_host_scenario() {
    let source = Arc::new(example_graph());
    let crawler = Crawler::new(source.clone(), limits(4, 2, 1)).unwrap();

    let result = crawler
        .crawl_with_host_filter("http://a/", 2, ["a"])
        .await;

    assert_eq!(
        as_set(&result.downloaded),
        HashSet::from(["http://a/", "http://a/x", "http://a/z"])
    );
    assert!(!result.contains("http://b/y"));
    assert!(!result.errors.contains_key("http://b/y"));
    assert_eq!(source.fetch_count("http://b/y"), 0);

    crawler.close().await;
}

#[tokio::test]
async fn test_seed_is_attempted_regardless_of_filter() {
    let source = Arc::new(example_graph());
    let crawler = Crawler::new(source.clone(), CrawlerLimits::default()).unwrap();

    let result = crawler
        .crawl_with_host_filter("http://a/", 2, ["b"])
        .await;

    assert_eq!(
        as_set(&result.downloaded),
        HashSet::from(["http://a/", "http://b/y"])
    );
    assert_eq!(source.fetch_count("http://a/x"), 0);
}

#[tokio::test]
async fn test_exclude_filter() {
    let source = Arc::new(example_graph());
    let crawler = Crawler::new(source.clone(), CrawlerLimits::default()).unwrap();

    let result = crawler.crawl_excluding("http://a/", 2, ["b"]).await;

    assert_eq!(
        as_set(&result.downloaded),
        HashSet::from(["http://a/", "http://a/x", "http://a/z"])
    );
}

#[tokio::test]
async fn test_depth_bound() {
    let chain = GraphSource::new(&[
        ("http://a/", &["http://a/1"]),
        ("http://a/1", &["http://a/2"]),
        ("http://a/2", &["http://a/3"]),
        ("http://a/3", &["http://a/4"]),
        ("http://a/4", &[]),
    ]);
    let source = Arc::new(chain);
    let crawler = Crawler::new(source.clone(), CrawlerLimits::default()).unwrap();

    assert!(crawler.crawl("http://a/", 0).await.downloaded.is_empty());
    assert!(source.fetched().is_empty());

    let one = crawler.crawl("http://a/", 1).await;
    assert_eq!(as_set(&one.downloaded), HashSet::from(["http://a/", "http://a/1"]));

    let two = crawler.crawl("http://a/", 2).await;
    assert_eq!(
        as_set(&two.downloaded),
        HashSet::from(["http://a/", "http://a/1", "http://a/2"])
    );
    assert_eq!(source.fetch_count("http://a/3"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_duplicate_fetches() {
    // Diamond plus back-edges and a self-loop
    let graph = GraphSource::new(&[
        ("http://a/", &["http://a/l", "http://a/r", "http://a/"]),
        ("http://a/l", &["http://a/m", "http://a/", "http://a/l"]),
        ("http://a/r", &["http://a/m", "http://a/l"]),
        ("http://a/m", &["http://a/", "http://a/r", "http://a/end"]),
        ("http://a/end", &["http://a/m"]),
    ])
    .with_delay(Duration::from_millis(5));
    let source = Arc::new(graph);
    let crawler = Crawler::new(source.clone(), limits(8, 8, 8)).unwrap();

    let result = crawler.crawl("http://a/", 10).await;

    assert_eq!(result.downloaded.len(), 5);
    assert_eq!(as_set(&result.downloaded).len(), 5);
    for url in &result.downloaded {
        assert_eq!(source.fetch_count(url), 1, "{} fetched more than once", url);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fetch_failure_is_isolated() {
    let graph = GraphSource::new(&[
        ("http://a/", &["http://a/x", "http://a/y", "http://a/z"]),
        ("http://a/x", &[]),
        ("http://a/y", &["http://a/hidden"]),
        ("http://a/z", &["http://a/next"]),
        ("http://a/next", &[]),
        ("http://a/hidden", &[]),
    ])
    .with_broken("http://a/y");
    let source = Arc::new(graph);
    let crawler = Crawler::new(source.clone(), limits(2, 2, 2)).unwrap();

    let result = crawler.crawl("http://a/", 3).await;

    assert_eq!(
        as_set(&result.downloaded),
        HashSet::from(["http://a/", "http://a/x", "http://a/z", "http://a/next"])
    );
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        result.errors.get("http://a/y"),
        Some(CrawlError::Fetch(FetchError::Unavailable { .. }))
    ));
    assert_eq!(source.fetch_count("http://a/hidden"), 0);
}

#[tokio::test]
async fn test_parse_failure_loses_links_only() {
    let graph = GraphSource::new(&[
        ("http://a/", &["http://a/x", "http://a/y"]),
        ("http://a/x", &["http://a/lost"]),
        ("http://a/y", &["http://a/found"]),
        ("http://a/lost", &[]),
        ("http://a/found", &[]),
    ])
    .with_unparseable("http://a/x");
    let source = Arc::new(graph);
    let crawler = Crawler::new(source.clone(), CrawlerLimits::default()).unwrap();

    let result = crawler.crawl("http://a/", 2).await;

    assert!(result.contains("http://a/x"));
    assert!(result.contains("http://a/found"));
    assert!(!result.contains("http://a/lost"));
    assert!(result.errors.is_empty());
    assert_eq!(result.lost_links, vec!["http://a/x".to_string()]);
}

#[tokio::test]
async fn test_malformed_link_is_a_url_error() {
    let graph = GraphSource::new(&[("http://a/", &["::not a url::"])]);
    let crawler = Crawler::new(Arc::new(graph), CrawlerLimits::default()).unwrap();

    let result = crawler.crawl("http://a/", 1).await;

    assert_eq!(result.downloaded, vec!["http://a/".to_string()]);
    assert!(matches!(
        result.errors.get("::not a url::"),
        Some(CrawlError::Url(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_bound() {
    let children: Vec<String> = (0..12)
        .flat_map(|i| [format!("http://a/{}", i), format!("http://b/{}", i)])
        .collect();
    let child_refs: Vec<&str> = children.iter().map(|s| s.as_str()).collect();

    let mut edges: Vec<(&str, &[&str])> = vec![("http://a/", child_refs.as_slice())];
    for child in child_refs.iter().copied() {
        edges.push((child, NO_LINKS));
    }

    let source = Arc::new(GraphSource::new(&edges).with_delay(Duration::from_millis(20)));
    let crawler = Crawler::new(source.clone(), limits(16, 4, 2)).unwrap();

    let result = crawler.crawl("http://a/", 1).await;

    assert_eq!(result.downloaded.len(), 25);
    assert!(source.peak_for_host("a") <= 2);
    assert!(source.peak_for_host("b") <= 2);
    assert_eq!(source.peak_for_host("b"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_download_pool_bound() {
    let children: Vec<String> = (0..20).map(|i| format!("http://h{}/", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(|s| s.as_str()).collect();

    let mut edges: Vec<(&str, &[&str])> = vec![("http://seed/", child_refs.as_slice())];
    for child in child_refs.iter().copied() {
        edges.push((child, NO_LINKS));
    }

    let source = Arc::new(GraphSource::new(&edges).with_delay(Duration::from_millis(20)));
    let crawler = Crawler::new(source.clone(), limits(3, 1, 10)).unwrap();

    let result = crawler.crawl("http://seed/", 1).await;

    assert_eq!(result.downloaded.len(), 21);
    assert!(source.peak_in_flight() <= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_crawls_are_independent() {
    let source = Arc::new(example_graph());
    let crawler = Arc::new(Crawler::new(source.clone(), limits(2, 2, 1)).unwrap());

    let first = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawler.crawl("http://a/", 2).await })
    };
    let second = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawler.crawl("http://a/x", 1).await })
    };

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert_eq!(first.downloaded.len(), 4);
    assert_eq!(
        as_set(&second.downloaded),
        HashSet::from(["http://a/x", "http://a/z"])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_during_crawl() {
    let graph = GraphSource::new(&[("http://a/", &["http://a/x"]), ("http://a/x", &[])])
        .with_delay(Duration::from_secs(30));
    let crawler = Arc::new(
        Crawler::new(
            Arc::new(graph),
            CrawlerLimits {
                shutdown_grace: Duration::from_secs(2),
                ..limits(2, 2, 1)
            },
        )
        .unwrap(),
    );

    let crawl = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawler.run(CrawlRequest::new("http://a/", 3)).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let report = crawler.close().await;
    assert_eq!(report, ShutdownReport::Terminated);
    assert!(started.elapsed() < Duration::from_secs(2));

    let result = tokio::time::timeout(Duration::from_secs(2), crawl)
        .await
        .expect("crawl should return after close")
        .unwrap();

    assert!(result.interrupted);
    assert!(result.downloaded.is_empty());
    assert!(matches!(
        result.errors.get("http://a/"),
        Some(CrawlError::Interrupted { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_keeps_settled_layers() {
    let graph = example_graph().with_slow("http://a/x", Duration::from_secs(30));
    let source = Arc::new(graph);
    let crawler = Arc::new(Crawler::new(source.clone(), limits(4, 2, 2)).unwrap());

    let crawl = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawler.crawl("http://a/", 2).await })
    };

    // Layer 0 settles quickly; layer 1 hangs on http://a/x
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(source.fetch_count("http://a/x"), 1);

    assert_eq!(crawler.close().await, ShutdownReport::Terminated);
    let result = tokio::time::timeout(Duration::from_secs(2), crawl)
        .await
        .expect("crawl should return after close")
        .unwrap();

    assert!(result.interrupted);
    assert!(result.contains("http://a/"));
    assert!(result.contains("http://b/y"));
    assert!(!result.contains("http://a/x"));
    assert!(matches!(
        result.errors.get("http://a/x"),
        Some(CrawlError::Interrupted { .. })
    ));
    assert_eq!(source.fetch_count("http://a/z"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_reports_stuck_tasks() {
    let source = Arc::new(StuckSource {
        hold: Duration::from_millis(800),
    });
    let crawler = Arc::new(
        Crawler::new(
            source,
            CrawlerLimits {
                shutdown_grace: Duration::from_millis(100),
                ..limits(2, 2, 1)
            },
        )
        .unwrap(),
    );

    let crawl = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawler.crawl("http://a/", 1).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;

    match crawler.close().await {
        ShutdownReport::TimedOut { outstanding } => assert!(outstanding > 0),
        other => panic!("expected a timed-out shutdown, got {:?}", other),
    }

    let result = tokio::time::timeout(Duration::from_secs(3), crawl)
        .await
        .expect("crawl should return once the fetch unblocks")
        .unwrap();

    // The fetch finished after close, so its links had nowhere to go
    assert!(result.interrupted);
    assert_eq!(result.downloaded, vec!["http://a/".to_string()]);
    assert_eq!(result.lost_links, vec!["http://a/".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dropped_crawl_cancels_its_tasks() {
    let graph = GraphSource::new(&[("http://a/", NO_LINKS)])
        .with_delay(Duration::from_millis(300));
    let source = Arc::new(graph);
    let crawler = Crawler::new(source.clone(), limits(2, 2, 1)).unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(50), crawler.crawl("http://a/", 1))
        .await
        .is_err();
    assert!(timed_out);

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(source.fetch_count("http://a/"), 1);
    assert_eq!(source.completed(), 0);
    assert!(!crawler.is_closed());
    assert_eq!(crawler.available_permits(), (Some(2), Some(2)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interrupted_run_returns_partial_result() {
    let graph = example_graph().with_slow("http://a/x", Duration::from_secs(30));
    let crawler = Crawler::new(Arc::new(graph), limits(4, 2, 2)).unwrap();

    let started = Instant::now();
    let (result, report) = crawler
        .run_until(
            CrawlRequest::new("http://a/", 2),
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report, Some(ShutdownReport::Terminated));
    assert!(crawler.is_closed());
    assert!(result.interrupted);
    assert!(result.contains("http://a/"));
    assert!(matches!(
        result.errors.get("http://a/x"),
        Some(CrawlError::Interrupted { .. })
    ));
}

#[tokio::test]
async fn test_uninterrupted_run_leaves_crawler_open() {
    let crawler = Crawler::new(Arc::new(example_graph()), CrawlerLimits::default()).unwrap();

    let (result, report) = crawler
        .run_until(CrawlRequest::new("http://a/", 2), std::future::pending())
        .await;

    assert_eq!(report, None);
    assert!(!crawler.is_closed());
    assert_eq!(result.downloaded.len(), 4);
    assert!(!result.interrupted);
}

#[tokio::test]
async fn test_request_with_explicit_filter() {
    let source = Arc::new(example_graph());
    let crawler = Crawler::new(source, CrawlerLimits::default()).unwrap();

    let request = CrawlRequest::new("http://a/", 1).with_filter(HostFilter::allow(["a"]));
    let result = crawler.run(request).await;

    assert_eq!(
        as_set(&result.downloaded),
        HashSet::from(["http://a/", "http://a/x"])
    );
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Test</title></head><body>{}</body></html>", body),
        "text/html",
    )
}

#[tokio::test]
async fn test_http_crawl_end_to_end() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/page1">One</a>
               <a href="page2#top">Two</a>
               <a href="/missing">Missing</a>
               <a href="mailto:someone@example.com">Mail</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(r#"<a href="/page3">Three</a><a href="/">Home</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html("No links here"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page3"))
        .respond_with(html(r#"<a href="/page4">Too deep</a>"#))
        .mount(&mock_server)
        .await;

    let source = HttpSource::from_config(&Config::default()).expect("client should build");
    let crawler = Crawler::new(Arc::new(source), limits(4, 2, 2)).unwrap();

    let seed = format!("{}/", base_url);
    let result = crawler.crawl(&seed, 2).await;

    let expected: HashSet<String> = ["/", "/page1", "/page2", "/page3"]
        .iter()
        .map(|p| format!("{}{}", base_url, p))
        .collect();
    let downloaded: HashSet<String> = result.downloaded.iter().cloned().collect();
    assert_eq!(downloaded, expected);

    let missing = format!("{}/missing", base_url);
    assert!(matches!(
        result.errors.get(&missing),
        Some(CrawlError::Fetch(FetchError::Status { status: 404, .. }))
    ));
    assert_eq!(result.errors.len(), 1);

    crawler.close().await;
}

#[tokio::test]
async fn test_http_non_html_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/file.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF", "application/pdf"))
        .mount(&mock_server)
        .await;

    let source = HttpSource::from_config(&Config::default()).unwrap();
    let crawler = Crawler::new(Arc::new(source), CrawlerLimits::default()).unwrap();

    let url = format!("{}/file.pdf", mock_server.uri());
    let result = crawler.crawl(&url, 1).await;

    assert!(result.downloaded.is_empty());
    assert!(matches!(
        result.errors.get(&url),
        Some(CrawlError::Fetch(FetchError::ContentMismatch { .. }))
    ));
}
