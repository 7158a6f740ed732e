/// Checks if a host matches an allow-list pattern
///
/// Two pattern forms are accepted:
/// 1. Exact: `"example.com"` matches only `"example.com"`
/// 2. Wildcard: `"*.example.com"` matches `"example.com"` and any host below it,
///    such as `"blog.example.com"` or `"api.v2.example.com"`
///
/// Both sides are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use strata::url::matches_host_pattern;
///
/// assert!(matches_host_pattern("example.com", "example.com"));
/// assert!(!matches_host_pattern("example.com", "blog.example.com"));
/// assert!(matches_host_pattern("*.example.com", "blog.example.com"));
/// assert!(!matches_host_pattern("*.example.com", "myexample.com"));
/// ```
pub fn matches_host_pattern(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => host == pattern,
    }
}

/// Returns true if the pattern carries a leading `*.` wildcard
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.starts_with("*.")
}
