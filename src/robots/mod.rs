//! Robots.txt handling module
//!
//! This module fetches and parses robots.txt once per crawl run and reads the
//! sitemaps it advertises. Neither fetch can fail a crawl: a missing or broken
//! robots.txt means allow-all, and a broken sitemap contributes no URLs.

mod parser;

pub use parser::RobotsPolicy;

use crate::crawler::read_body;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Maximum sitemap documents read per crawl run
pub const MAX_SITEMAPS: usize = 5;

/// Maximum URLs taken from sitemaps per crawl run
pub const MAX_SITEMAP_URLS: usize = 500;

/// Fetches robots.txt for the host of `root`
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's user agent
/// * `root` - Any URL on the host whose robots.txt is wanted
/// * `timeout` - Bound on the whole request
/// * `max_body_bytes` - Bodies larger than this are discarded
///
/// # Returns
///
/// The parsed policy. Network errors, timeouts, non-2xx responses and
/// oversized bodies all yield [`RobotsPolicy::allow_all`].
pub async fn fetch_robots(
    client: &Client,
    root: &Url,
    timeout: Duration,
    max_body_bytes: usize,
) -> RobotsPolicy {
    let robots_url = match root.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Cannot build robots.txt URL for {}: {}", root, e);
            return RobotsPolicy::allow_all();
        }
    };

    match fetch_text(client, &robots_url, timeout, max_body_bytes).await {
        Some(body) => {
            let policy = RobotsPolicy::parse(&body);
            tracing::debug!(
                "Loaded robots.txt from {}: {} disallow, {} allow, {} sitemaps",
                robots_url,
                policy.disallowed_prefixes.len(),
                policy.allowed_prefixes.len(),
                policy.sitemaps.len()
            );
            policy
        }
        None => {
            tracing::debug!("No usable robots.txt at {}, allowing all", robots_url);
            RobotsPolicy::allow_all()
        }
    }
}

/// Reads page URLs from a sitemap document
///
/// Returns the `<loc>` values in document order. Any failure, including a
/// body over `max_body_bytes`, yields an empty list.
pub async fn fetch_sitemap_urls(
    client: &Client,
    sitemap: &Url,
    timeout: Duration,
    max_body_bytes: usize,
) -> Vec<String> {
    match fetch_text(client, sitemap, timeout, max_body_bytes).await {
        Some(body) => extract_locations(&body),
        None => {
            tracing::debug!("Ignoring unavailable sitemap {}", sitemap);
            Vec::new()
        }
    }
}

async fn fetch_text(
    client: &Client,
    url: &Url,
    timeout: Duration,
    max_body_bytes: usize,
) -> Option<String> {
    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .ok()?;

    if !response.status().is_success() {
        return None;
    }

    match read_body(response, max_body_bytes).await {
        Ok(body) => Some(body),
        Err(fault) => {
            tracing::debug!("Discarding {}: {}", url, fault);
            None
        }
    }
}

/// Extracts `<loc>` element values from sitemap XML
fn extract_locations(xml: &str) -> Vec<String> {
    let mut locations = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<loc>") {
        rest = &rest[start + "<loc>".len()..];
        let Some(end) = rest.find("</loc>") else {
            break;
        };
        let location = rest[..end].trim().replace("&amp;", "&");
        if !location.is_empty() {
            locations.push(location);
        }
        rest = &rest[end..];
    }

    locations
}
