use url::{form_urlencoded, Url};

/// Builds the visited-set key for a crawl URL
///
/// # Normalization Steps
///
/// 1. Keep the scheme as-is
/// 2. Lowercase the host, keep an explicit port
/// 3. Normalize path:
///    - Collapse repeated slashes
///    - Remove dot segments (. and ..)
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 4. Drop query and fragment
///
/// Two URLs with the same key are the same page for the duration of a crawl.
///
/// # Examples
///
/// ```
/// use prompt_harvest::url::normalize_for_crawl;
/// use url::Url;
///
/// let url = Url::parse("https://Example.com/docs/?page=2#intro").unwrap();
/// assert_eq!(normalize_for_crawl(&url), "https://example.com/docs");
/// ```
pub fn normalize_for_crawl(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let port = url
        .port()
        .map(|port| format!(":{}", port))
        .unwrap_or_default();

    format!(
        "{}://{}{}{}",
        url.scheme(),
        host,
        port,
        normalize_path(url.path())
    )
}

/// Builds the identity of a website root for cache keys
///
/// Same as [`normalize_for_crawl`] but keeps the query, with its pairs
/// sorted so parameter order does not matter. The fragment is dropped.
///
/// # Examples
///
/// ```
/// use prompt_harvest::url::normalize_source_url;
/// use url::Url;
///
/// let url = Url::parse("https://Example.com/page/?b=2&a=1#top").unwrap();
/// assert_eq!(normalize_source_url(&url), "https://example.com/page?a=1&b=2");
/// ```
pub fn normalize_source_url(url: &Url) -> String {
    let base = normalize_for_crawl(url);
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if pairs.is_empty() {
        return base;
    }

    pairs.sort();
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{}?{}", base, query)
}

/// Returns a fetchable copy of the URL with its fragment removed
pub fn strip_fragment(url: &Url) -> Url {
    let mut cleaned = url.clone();
    cleaned.set_fragment(None);
    cleaned
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}
