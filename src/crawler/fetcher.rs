//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Same-host redirect following
//! - Content-Type gating before the body is read
//! - Bounded body reads
//! - Error classification into page faults
//!
//! There are no retries: every URL gets exactly one attempt.

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client, Response};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 5;

/// Why a single page could not be used
///
/// These are recorded in [`PageResult::error`](super::PageResult::error) and
/// never propagate out of a crawl.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageFault {
    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Not HTML content")]
    NotHtml,

    #[error("Response body exceeds {0} bytes")]
    BodyTooLarge(usize),
}

/// Result of a fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// Successfully fetched an HTML page
    Html {
        /// Final URL after redirects
        final_url: Url,
        status: u16,
        content_type: String,
        body: String,
    },

    /// 2xx response whose Content-Type is not HTML; the body is not read
    NotHtml { status: u16, content_type: String },

    /// Timeout, network error, non-2xx status or oversized body
    Failed {
        status: Option<u16>,
        content_type: Option<String>,
        fault: PageFault,
    },
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed only while they stay on the original host, up to
/// [`MAX_REDIRECTS`] hops. A redirect towards another host is not followed,
/// so the 3xx response itself becomes the outcome.
///
/// # Example
///
/// ```no_run
/// use prompt_harvest::config::UserAgentConfig;
/// use prompt_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    let redirect_policy = Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }

        let same_host = attempt
            .previous()
            .first()
            .is_some_and(|origin| origin.host_str() == attempt.url().host_str());

        if same_host {
            attempt.follow()
        } else {
            attempt.stop()
        }
    });

    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(redirect_policy)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once, bounded by `timeout` and `max_body_bytes`
///
/// # Arguments
///
/// * `client` - HTTP client from [`build_http_client`]
/// * `url` - The page to request
/// * `timeout` - Bound on the whole request, body included
/// * `max_body_bytes` - Largest HTML body accepted
///
/// # Returns
///
/// A [`FetchOutcome`]; this function never returns an error.
///
/// # Request Flow
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | Timeout | `Failed(Timeout)` |
/// | Connection/TLS error | `Failed(Network)` |
/// | Non-2xx status | `Failed(Status)` |
/// | 2xx, not text/html | `NotHtml` |
/// | Body over limit | `Failed(BodyTooLarge)` |
/// | 2xx HTML | `Html` |
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    timeout: Duration,
    max_body_bytes: usize,
) -> FetchOutcome {
    let response = match client.get(url.clone()).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchOutcome::Failed {
                status: None,
                content_type: None,
                fault: classify_error(&e),
            }
        }
    };

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !response.status().is_success() {
        return FetchOutcome::Failed {
            status: Some(status),
            content_type,
            fault: PageFault::Status(status),
        };
    }

    let content_type = content_type.unwrap_or_default();
    if !is_html(&content_type) {
        return FetchOutcome::NotHtml {
            status,
            content_type,
        };
    }

    let final_url = response.url().clone();
    match read_body(response, max_body_bytes).await {
        Ok(body) => FetchOutcome::Html {
            final_url,
            status,
            content_type,
            body,
        },
        Err(fault) => FetchOutcome::Failed {
            status: Some(status),
            content_type: Some(content_type),
            fault,
        },
    }
}

/// Returns true for HTML and XHTML media types
pub fn is_html(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    media_type == "text/html" || media_type == "application/xhtml+xml"
}

/// Reads a response body, failing once it grows past `max_body_bytes`
pub(crate) async fn read_body(
    mut response: Response,
    max_body_bytes: usize,
) -> Result<String, PageFault> {
    if response
        .content_length()
        .is_some_and(|length| length > max_body_bytes as u64)
    {
        return Err(PageFault::BodyTooLarge(max_body_bytes));
    }

    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| classify_error(&e))? {
        if buffer.len() + chunk.len() > max_body_bytes {
            return Err(PageFault::BodyTooLarge(max_body_bytes));
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn classify_error(e: &reqwest::Error) -> PageFault {
    if e.is_timeout() {
        PageFault::Timeout
    } else if e.is_connect() {
        PageFault::Network("Connection refused".to_string())
    } else {
        PageFault::Network(e.to_string())
    }
}
