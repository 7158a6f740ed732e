use crate::config::types::{Config, CrawlerConfig, FetchConfig, FilterConfig, UserAgentConfig};
use crate::ConfigError;
use tokio::sync::Semaphore;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    validate_filter_config(&config.filter)?;
    Ok(())
}

/// Validates crawler configuration
pub(crate) fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_limit("downloaders", config.downloaders)?;
    validate_limit("extractors", config.extractors)?;
    validate_limit("per-host", config.per_host)?;
    Ok(())
}

/// Validates a concurrency limit; `None` means unbounded
pub(crate) fn validate_limit(name: &str, limit: Option<usize>) -> Result<(), ConfigError> {
    match limit {
        Some(0) => Err(ConfigError::Validation(format!(
            "{} must be at least 1 when set",
            name
        ))),
        Some(n) if n > Semaphore::MAX_PERMITS => Err(ConfigError::Validation(format!(
            "{} must be at most {}, got {}",
            name,
            Semaphore::MAX_PERMITS,
            n
        ))),
        _ => Ok(()),
    }
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates fetch timeouts
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the host filter lists
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if !config.allowed_hosts.is_empty() && !config.excluded_hosts.is_empty() {
        return Err(ConfigError::Validation(
            "allowed-hosts and excluded-hosts cannot both be set".to_string(),
        ));
    }

    for pattern in &config.allowed_hosts {
        validate_host_pattern(pattern)?;
    }

    for substring in &config.excluded_hosts {
        if substring.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(
                "Excluded host substring cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates an allowed host, optionally prefixed with `*.`
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Host pattern '{}' has no host",
            pattern
        )));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            pattern
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' has misplaced dots",
            pattern
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}
