//! HTTP document source
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Error classification
//! - Delegating link extraction to the HTML parser

use crate::config::{Config, FetchConfig, UserAgentConfig};
use crate::source::parser::parse_links;
use crate::source::{Document, DocumentSource};
use crate::{FetchError, ParseError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Maximum number of redirects followed for one fetch
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `fetch` - Timeouts and scheme policy
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use strata::config::{FetchConfig, UserAgentConfig};
/// use strata::source::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(user_agent))
        .timeout(Duration::from_secs(fetch.timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .https_only(fetch.https_only)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats `CrawlerName/Version (+ContactURL; ContactEmail)`
fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Fetches pages over HTTP(S) and extracts links with `scraper`
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Wraps an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a source from the `[user-agent]` and `[fetch]` sections
    ///
    /// # Errors
    ///
    /// * `StrataError::Client` - the HTTP client could not be built
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        Ok(Self::new(build_http_client(
            &config.user_agent,
            &config.fetch,
        )?))
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // A missing Content-Type is treated as HTML
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        if !is_html(&content_type) {
            return Err(FetchError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        tracing::trace!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(Document {
            url: url.to_string(),
            final_url,
            body,
        })
    }

    async fn extract_links(&self, document: &Document) -> Result<Vec<String>, ParseError> {
        // HTML parsing is CPU-bound; keep it off the async workers
        let body = document.body.clone();
        let base_url = document.final_url.clone();
        let parsed = tokio::task::spawn_blocking(move || parse_links(&body, &base_url))
            .await
            .map_err(|e| ParseError {
                url: document.url.clone(),
                message: format!("link extraction task failed: {}", e),
            })??;

        if let Some(title) = &parsed.title {
            tracing::trace!("Parsed '{}' from {}", title, document.url);
        }

        Ok(parsed.links)
    }
}

fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}
