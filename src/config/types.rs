use crate::crawler::{CrawlBudget, CrawlerOptions};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Prompt-Harvest
///
/// Every section and key is optional; missing values take the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub cache: CacheConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link distance from the root
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of pages in a report
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Skip robots.txt entirely
    #[serde(rename = "ignore-robots")]
    pub ignore_robots: bool,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-per-page-ms")]
    pub timeout_per_page_ms: u64,

    /// Maximum number of concurrent page fetches within one crawl
    pub concurrency: usize,

    /// Largest accepted HTML body (bytes)
    #[serde(rename = "max-body-bytes")]
    pub max_body_bytes: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        let budget = CrawlBudget::default();
        let options = CrawlerOptions::default();
        Self {
            max_depth: budget.max_depth,
            max_pages: budget.max_pages,
            ignore_robots: budget.ignore_robots,
            timeout_per_page_ms: budget.timeout_per_page.as_millis() as u64,
            concurrency: options.concurrency,
            max_body_bytes: options.max_body_bytes,
        }
    }
}

impl CrawlerConfig {
    pub fn budget(&self) -> CrawlBudget {
        CrawlBudget {
            max_depth: self.max_depth,
            max_pages: self.max_pages,
            ignore_robots: self.ignore_robots,
            timeout_per_page: Duration::from_millis(self.timeout_per_page_ms),
        }
    }

    pub fn options(&self) -> CrawlerOptions {
        CrawlerOptions {
            concurrency: self.concurrency,
            max_body_bytes: self.max_body_bytes,
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
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "PromptHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL)
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact_url) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact_url
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Which cache backend to open at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Probe the environment (platform cache, then filesystem, then memory)
    #[default]
    Auto,
    Memory,
    Filesystem,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: BackendChoice,

    /// Root directory of the filesystem backend
    pub directory: Option<PathBuf>,

    /// Subdirectory (filesystem) or key prefix (edge) isolating this cache
    pub namespace: String,

    /// TTL applied when a caller does not pick one (seconds)
    #[serde(rename = "default-ttl-secs")]
    pub default_ttl_secs: u64,

    /// Size bound of the filesystem backend (bytes)
    #[serde(rename = "max-bytes")]
    pub max_bytes: u64,

    /// Size bound of the in-memory backend (bytes)
    #[serde(rename = "memory-max-bytes")]
    pub memory_max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            directory: None,
            namespace: "default".to_string(),
            default_ttl_secs: 60 * 60,
            max_bytes: 512 * 1024 * 1024,
            memory_max_bytes: 64 * 1024 * 1024,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}
