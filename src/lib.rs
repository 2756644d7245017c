//! Prompt-Harvest: bounded, cache-fronted content acquisition
//!
//! This crate turns untrusted URLs, either git-hosting repository links or
//! arbitrary websites, into a bounded snapshot of textual content. It validates
//! and classifies the input, crawls websites breadth-first under a strict
//! budget while honoring robots.txt, and keeps results in an expiring cache so
//! repeated requests never touch the network.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod robots;
pub mod source;
pub mod url;

use thiserror::Error;

/// Main error type for Prompt-Harvest operations
///
/// Only structurally invalid requests surface here. Faults local to a single
/// page or a single cache operation are absorbed into data
/// ([`crawler::PageResult::error`], [`cache::ReadOutcome`]).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Rejected source '{input}': {reason}")]
    InvalidSource { input: String, reason: String },

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("No repository fetcher configured for {owner}/{repo}")]
    RepositoryUnavailable { owner: String, repo: String },

    #[error("Repository fetch failed for {url}: {source}")]
    Repository { url: String, source: anyhow::Error },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors that abort a crawl before any page is fetched
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid crawl budget: {0}")]
    InvalidBudget(String),

    #[error("Invalid crawl root '{url}': {reason}")]
    InvalidRoot { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors raised inside cache backends
///
/// The [`cache::Cache`] facade logs these and downgrades them to misses or
/// no-ops; they never reach callers of the facade.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation not supported by the {backend} cache backend: {operation}")]
    Unsupported {
        backend: cache::BackendKind,
        operation: &'static str,
    },

    #[error("Platform cache error: {0}")]
    Platform(String),
}

/// Result type alias for Prompt-Harvest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for crawl operations
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

/// Result type alias for cache backend operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

// Re-export commonly used types
pub use cache::{Cache, CachePayload, RequestOptions};
pub use config::Config;
pub use crawler::{CrawlBudget, CrawlReport, Crawler, PageResult};
pub use source::{Ingestor, Snapshot};
pub use crate::url::{classify, parse, validate, ParsedSource, SourceKind, ValidationVerdict};
