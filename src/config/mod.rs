//! Configuration module for Strata
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use strata::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("strata.toml")).unwrap();
//! println!("Crawler will follow {} hops", config.crawler.depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FetchConfig, FilterConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;

pub(crate) use validation::validate_limit;
