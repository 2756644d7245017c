use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use prompt_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether two URLs share the identical host
///
/// There is no subdomain generalization: `blog.example.com` is a different
/// domain from `example.com`. Ports are ignored.
pub fn same_domain(root: &Url, candidate: &Url) -> bool {
    match (extract_domain(root), extract_domain(candidate)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
