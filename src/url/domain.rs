use crate::UrlError;
use url::Url;

/// Resolves the host name of a URL string
///
/// The host is lowercased. Ports, paths, queries and fragments are ignored,
/// so every page of a site shares one host-throttle entry.
///
/// # Errors
///
/// * `UrlError::Parse` - the string is not an absolute URL
/// * `UrlError::MissingHost` - the URL has no host (e.g. `mailto:`)
///
/// # Examples
///
/// ```
/// use strata::url::host_of;
///
/// assert_eq!(host_of("https://EXAMPLE.com:8080/path").unwrap(), "example.com");
/// assert!(host_of("not a url").is_err());
/// ```
pub fn host_of(url: &str) -> Result<String, UrlError> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    extract_domain(&parsed).ok_or_else(|| UrlError::MissingHost(url.to_string()))
}

/// Extracts the lowercase host from an already parsed URL
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}
