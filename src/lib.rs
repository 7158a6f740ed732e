//! Strata: a layered breadth-first web crawler
//!
//! This crate walks the link graph outward from a seed URL one depth level at a
//! time, bounding simultaneous downloads, simultaneous link extraction and
//! simultaneous downloads per host.

pub mod config;
pub mod crawler;
pub mod output;
pub mod source;
pub mod url;

use thiserror::Error;

/// Main error type for Strata operations
///
/// Only construction can fail fatally. Per-URL problems never surface here;
/// they are collected in a [`CrawlResult`].
#[derive(Debug, Error)]
pub enum StrataError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Missing host in URL {0}")]
    MissingHost(String),
}

/// Errors produced while downloading a single page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Expected HTML from {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },

    #[error("{url} is unavailable: {reason}")]
    Unavailable { url: String, reason: String },
}

/// Link extraction failed on a page that was downloaded successfully
#[derive(Debug, Clone, Error)]
#[error("HTML parse error for {url}: {message}")]
pub struct ParseError {
    pub url: String,
    pub message: String,
}

/// A failure recorded against a single URL in a [`CrawlResult`]
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Download of {url} was interrupted")]
    Interrupted { url: String },
}

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, StrataError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::config::Config;
pub use crawler::{CrawlRequest, CrawlResult, Crawler, CrawlerLimits, ShutdownReport};
pub use source::{Document, DocumentSource, HttpSource};
pub use crate::url::{host_of, HostFilter};
