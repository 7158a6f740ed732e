use serde::Deserialize;

/// Main configuration structure for Strata
///
/// Every section is optional in the TOML file; missing sections take their
/// defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub fetch: FetchConfig,
    pub filter: FilterConfig,
}

/// Crawler behavior configuration
///
/// Limits left unset are unbounded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of link hops to follow from the seed (0 downloads nothing)
    pub depth: u32,

    /// Maximum number of concurrent downloads across all hosts
    pub downloaders: Option<usize>,

    /// Maximum number of concurrent link extractions
    pub extractors: Option<usize>,

    /// Maximum number of concurrent downloads from a single host
    #[serde(rename = "per-host")]
    pub per_host: Option<usize>,

    /// How long `close` waits for in-flight tasks before giving up (seconds)
    #[serde(rename = "shutdown-grace-secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            depth: 1,
            downloaders: None,
            extractors: None,
            per_host: None,
            shutdown_grace_secs: 20,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "strata".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/strata".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Refuse plain-HTTP URLs
    #[serde(rename = "https-only")]
    pub https_only: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            https_only: false,
        }
    }
}

/// Host filter configuration
///
/// At most one of the two lists may be non-empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Host names or `*.domain` patterns that may be downloaded
    #[serde(rename = "allowed-hosts")]
    pub allowed_hosts: Vec<String>,

    /// Substrings that reject any host containing them
    #[serde(rename = "excluded-hosts")]
    pub excluded_hosts: Vec<String>,
}
