//! URL handling module for Strata
//!
//! This module provides host resolution and the host filter that decides
//! which discovered pages a crawl may download.

mod domain;
mod matcher;

use std::collections::HashSet;

// Re-export main functions
pub use domain::{extract_domain, host_of};
pub use matcher::{is_wildcard, matches_host_pattern};

/// Decides whether pages on a host may be downloaded
#[derive(Debug, Clone, Default)]
pub enum HostFilter {
    /// Every host is admitted
    #[default]
    Any,

    /// Only hosts matching one of the patterns are admitted
    ///
    /// Exact names are kept in a set; `*.domain` patterns admit the domain
    /// and everything below it.
    Allow {
        exact: HashSet<String>,
        wildcards: Vec<String>,
    },

    /// Hosts containing any of the substrings are rejected
    Exclude(Vec<String>),
}

impl HostFilter {
    /// Builds an allow-list filter from host names or `*.domain` patterns
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::url::HostFilter;
    ///
    /// let filter = HostFilter::allow(["a", "*.example.com"]);
    /// assert!(filter.admits("a"));
    /// assert!(filter.admits("blog.example.com"));
    /// assert!(!filter.admits("b"));
    /// ```
    pub fn allow<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut exact = HashSet::new();
        let mut wildcards = Vec::new();

        for host in hosts {
            let host = host.into().to_lowercase();
            if is_wildcard(&host) {
                wildcards.push(host);
            } else {
                exact.insert(host);
            }
        }

        Self::Allow { exact, wildcards }
    }

    /// Builds a filter that rejects every host containing one of the substrings
    pub fn exclude<I, S>(substrings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exclude(
            substrings
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
        )
    }

    /// Returns true if pages on `host` may be downloaded
    pub fn admits(&self, host: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Allow { exact, wildcards } => {
                exact.contains(host) || wildcards.iter().any(|p| matches_host_pattern(p, host))
            }
            Self::Exclude(substrings) => !substrings.iter().any(|s| host.contains(s.as_str())),
        }
    }
}
