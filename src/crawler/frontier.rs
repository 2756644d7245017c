//! Crawl frontier and admission rules
//!
//! The frontier is a FIFO queue plus a visited set keyed by
//! [`normalize_for_crawl`]. A URL is marked visited when it is discovered, so
//! each page is queued at most once per run. Whether a popped entry is fetched
//! is decided by [`skip_reason`].

use crate::crawler::CrawlBudget;
use crate::robots::RobotsPolicy;
use crate::url::{normalize_for_crawl, same_domain};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use url::Url;

/// File extensions that never carry page content
const NON_CONTENT_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "bmp", "tif", "tiff", "avif",
    // audio/video
    "mp3", "mp4", "m4a", "avi", "mov", "mkv", "webm", "wav", "ogg", "flac",
    // archives and binaries
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "exe", "dmg", "iso", "bin", "msi",
    "deb", "rpm", "apk",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "epub",
    // assets and feeds
    "css", "js", "mjs", "map", "json", "xml", "rss", "atom", "woff", "woff2", "ttf", "otf",
    "eot",
];

/// Path prefixes for authentication flows and machine endpoints
const EXCLUDED_PATH_PREFIXES: &[&str] = &[
    "/login",
    "/logout",
    "/signin",
    "/signup",
    "/register",
    "/auth",
    "/oauth",
    "/api",
    "/wp-admin",
    "/wp-login.php",
];

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
}

/// Why a discovered URL is never fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DepthExceeded,
    OffDomain,
    NonContent,
    AuthOrApi,
    RobotsDisallowed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::DepthExceeded => "depth exceeded",
            Self::OffDomain => "off-domain",
            Self::NonContent => "non-content extension",
            Self::AuthOrApi => "auth/API path",
            Self::RobotsDisallowed => "disallowed by robots.txt",
        };
        f.write_str(reason)
    }
}

/// FIFO queue of discovered URLs, owned by a single crawl run
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a URL unless an equivalent one was already discovered
    ///
    /// Returns true when the URL was newly queued.
    pub fn discover(&mut self, url: Url, depth: u32) -> bool {
        if !self.visited.insert(normalize_for_crawl(&url)) {
            return false;
        }
        self.queue.push_back(FrontierEntry { url, depth });
        true
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Decides whether a popped entry is skipped instead of fetched
///
/// Rules are checked in order: depth, domain, extension, auth/API prefix,
/// robots.txt.
pub fn skip_reason(
    entry: &FrontierEntry,
    root: &Url,
    budget: &CrawlBudget,
    robots: &RobotsPolicy,
) -> Option<SkipReason> {
    if entry.depth > budget.max_depth {
        return Some(SkipReason::DepthExceeded);
    }

    if !same_domain(root, &entry.url) {
        return Some(SkipReason::OffDomain);
    }

    if has_non_content_extension(&entry.url) {
        return Some(SkipReason::NonContent);
    }

    if is_excluded_path(entry.url.path()) {
        return Some(SkipReason::AuthOrApi);
    }

    if !budget.ignore_robots && !robots.is_allowed(&robots_target(&entry.url)) {
        return Some(SkipReason::RobotsDisallowed);
    }

    None
}

fn has_non_content_extension(url: &Url) -> bool {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            NON_CONTENT_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

fn is_excluded_path(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    EXCLUDED_PATH_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '.']))
    })
}

/// Path plus query, the form robots.txt rules are matched against
fn robots_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
