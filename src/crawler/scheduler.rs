//! Layer scheduler: breadth-first traversal one depth level at a time
//!
//! A crawl moves through these states:
//!
//! ```text
//! Pending(hop, urls) --schedule--> Draining(hop, layer) --barrier--> LayerDone(hop, next)
//!        ^                                                               |
//!        +------------------------- hop + 1 -----------------------------+
//! Pending with hop > depth, or no urls, or a cancelled crawl --> Finished
//! ```
//!
//! Each layer owns its host throttle. Dropping the layer after its barrier
//! releases is what resets per-host admission between layers.

use crate::crawler::barrier::{LayerBarrier, Ticket};
use crate::crawler::result::{CrawlResult, ResultAggregator};
use crate::crawler::stage::Stage;
use crate::crawler::throttle::HostThrottle;
use crate::crawler::visited::VisitedSet;
use crate::crawler::CrawlRequest;
use crate::source::{Document, DocumentSource};
use crate::url::{host_of, HostFilter};
use crate::CrawlError;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Everything one crawl invocation shares across its layers and tasks
pub(crate) struct CrawlContext {
    pub source: Arc<dyn DocumentSource>,
    pub downloads: Stage,
    pub extractions: Stage,
    pub per_host: Option<usize>,
    pub filter: HostFilter,
    pub visited: VisitedSet,
    pub result: ResultAggregator,
    pub cancel: CancellationToken,
}

/// One breadth-first level in flight
struct Layer {
    hop: u32,
    hosts: HostThrottle,
    barrier: LayerBarrier,
    next: Mutex<Vec<String>>,
    /// False on the last layer, whose links nobody would consume
    follow_links: bool,
}

impl Layer {
    fn new(hop: u32, per_host: Option<usize>, follow_links: bool) -> Self {
        Self {
            hop,
            hosts: HostThrottle::new(per_host),
            barrier: LayerBarrier::new(),
            next: Mutex::new(Vec::new()),
            follow_links,
        }
    }

    fn push_links(&self, links: Vec<String>) {
        self.next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(links);
    }

    fn take_next(&self) -> Vec<String> {
        std::mem::take(&mut *self.next.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

enum LayerState {
    Pending { hop: u32, urls: Vec<String> },
    Draining { layer: Arc<Layer> },
    LayerDone { hop: u32, next: Vec<String> },
    Finished,
}

/// Runs a whole crawl and returns what it collected
pub(crate) async fn run_layers(ctx: Arc<CrawlContext>, request: CrawlRequest) -> CrawlResult {
    let depth = request.depth;
    let mut state = LayerState::Pending {
        hop: 0,
        urls: vec![request.seed],
    };

    loop {
        state = match state {
            LayerState::Pending { hop, urls } => {
                if depth == 0 || hop > depth || urls.is_empty() {
                    LayerState::Finished
                } else {
                    tracing::info!("Layer {}: {} candidate URLs", hop, urls.len());
                    let layer = Arc::new(Layer::new(hop, ctx.per_host, hop < depth));
                    schedule_layer(&ctx, &layer, urls);
                    LayerState::Draining { layer }
                }
            }

            LayerState::Draining { layer } => {
                layer.barrier.wait().await;
                let next = layer.take_next();
                tracing::info!(
                    "Layer {} drained: {} downloaded, {} failed so far, {} links found",
                    layer.hop,
                    ctx.result.downloaded_count(),
                    ctx.result.error_count(),
                    next.len()
                );
                // Dropping the layer discards its per-host slots
                LayerState::LayerDone {
                    hop: layer.hop,
                    next,
                }
            }

            LayerState::LayerDone { hop, next } => {
                if ctx.cancel.is_cancelled() {
                    tracing::warn!("Crawl cancelled after layer {}", hop);
                    LayerState::Finished
                } else {
                    LayerState::Pending {
                        hop: hop + 1,
                        urls: next,
                    }
                }
            }

            LayerState::Finished => break,
        };
    }

    ctx.result.finish(ctx.cancel.is_cancelled())
}

/// Submits a download for every eligible URL of the layer
fn schedule_layer(ctx: &Arc<CrawlContext>, layer: &Arc<Layer>, urls: Vec<String>) {
    // Held while submitting so the barrier cannot release mid-loop
    let _submitting = layer.barrier.ticket();

    for url in urls {
        if ctx.cancel.is_cancelled() {
            tracing::debug!("Crawl cancelled, not scheduling the rest of layer {}", layer.hop);
            break;
        }

        if !ctx.visited.claim(&url) {
            tracing::trace!("Already visited {}", url);
            continue;
        }

        let host = match host_of(&url) {
            Ok(host) => host,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", url, e);
                ctx.result.record_error(url, CrawlError::Url(e));
                continue;
            }
        };

        // The seed is always attempted
        if layer.hop > 0 && !ctx.filter.admits(&host) {
            tracing::debug!("Host {} is filtered out, dropping {}", host, url);
            continue;
        }

        let ticket = layer.barrier.ticket();
        let task = download(ctx.clone(), layer.clone(), host, url, ticket);
        if !ctx.downloads.submit(ctx.cancel.clone(), task) {
            break;
        }
    }
}

/// Download stage task: fetch one URL under a host slot
async fn download(
    ctx: Arc<CrawlContext>,
    layer: Arc<Layer>,
    host: String,
    url: String,
    ticket: Ticket,
) {
    let slot = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => {
            ctx.result.record_error(url.clone(), CrawlError::Interrupted { url });
            return;
        }
        slot = layer.hosts.acquire(&host) => slot,
    };

    let fetched = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => None,
        fetched = ctx.source.fetch(&url) => Some(fetched),
    };
    drop(slot);

    match fetched {
        None => {
            ctx.result
                .record_error(url.clone(), CrawlError::Interrupted { url });
        }
        Some(Ok(document)) => {
            tracing::debug!("Downloaded {}", url);
            ctx.result.record_download(url.clone());

            if layer.follow_links {
                // Counted before submission, so the barrier sees it immediately
                let task = extract(ctx.clone(), layer.clone(), document, ticket.clone());
                if !ctx.extractions.submit(ctx.cancel.clone(), task) {
                    tracing::debug!("Extraction stage closed, links of {} are lost", url);
                    ctx.result.record_lost_links(url);
                }
            }
        }
        Some(Err(e)) => {
            tracing::warn!("Failed to download {}: {}", url, e);
            ctx.result.record_error(url, CrawlError::Fetch(e));
        }
    }

    drop(ticket);
}

/// Extraction stage task: feed a document's links into the next layer
async fn extract(ctx: Arc<CrawlContext>, layer: Arc<Layer>, document: Document, ticket: Ticket) {
    let links = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return,
        links = ctx.source.extract_links(&document) => links,
    };

    match links {
        Ok(links) => {
            tracing::trace!("{} links from {}", links.len(), document.url);
            layer.push_links(links);
        }
        Err(e) => {
            tracing::warn!("Lost links of {}: {}", document.url, e);
            ctx.result.record_lost_links(document.url.clone());
        }
    }

    drop(ticket);
}
