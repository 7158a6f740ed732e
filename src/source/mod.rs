//! Document sources: turning URLs into documents and documents into links
//!
//! The crawler never talks to the network itself. It drives a
//! [`DocumentSource`], which both stages call concurrently:
//! - the download stage calls [`DocumentSource::fetch`]
//! - the extraction stage calls [`DocumentSource::extract_links`]
//!
//! [`HttpSource`] is the production implementation built on `reqwest` and
//! `scraper`. Tests plug in in-memory sources.

mod http;
mod parser;

use crate::{FetchError, ParseError};
use async_trait::async_trait;

pub use http::{build_http_client, HttpSource};
pub use parser::{parse_links, ParsedPage};

/// A downloaded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The URL that was requested
    pub url: String,

    /// The URL the content was served from, after redirects
    pub final_url: String,

    /// Page body
    pub body: String,
}

impl Document {
    /// Creates a document that was served from the requested URL
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            body: body.into(),
        }
    }
}

/// Fetches documents and extracts their outgoing links
///
/// Implementations must tolerate concurrent calls from every download and
/// extraction task of every crawl sharing the crawler.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Downloads the page at `url`
    async fn fetch(&self, url: &str) -> Result<Document, FetchError>;

    /// Returns the absolute URLs linked from `document`
    async fn extract_links(&self, document: &Document) -> Result<Vec<String>, ParseError>;
}
