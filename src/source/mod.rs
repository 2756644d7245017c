//! Source ingestion
//!
//! Routes one untrusted input through validation, then either the repository
//! fetcher or the website crawler, with the cache in front of both.

use crate::cache::{derive_crawl_key, derive_key, Cache, CachePayload, RepoFile, RequestOptions};
use crate::crawler::{CrawlBudget, CrawlReport, Crawler};
use crate::url::{classify, ParsedSource, SourceKind};
use crate::IngestError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retrieves the file list of a git repository
///
/// Typically downloads and unpacks a tarball of the requested ref.
#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    async fn fetch(&self, source: &ParsedSource) -> anyhow::Result<Vec<RepoFile>>;
}

/// Content acquired for one input
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Snapshot {
    Repository {
        source: ParsedSource,
        files: Vec<RepoFile>,
        from_cache: bool,
    },
    Website {
        source: ParsedSource,
        report: CrawlReport,
        from_cache: bool,
    },
}

impl Snapshot {
    pub fn source(&self) -> &ParsedSource {
        match self {
            Snapshot::Repository { source, .. } | Snapshot::Website { source, .. } => source,
        }
    }

    pub fn from_cache(&self) -> bool {
        match self {
            Snapshot::Repository { from_cache, .. } | Snapshot::Website { from_cache, .. } => {
                *from_cache
            }
        }
    }
}

/// Cache-fronted acquisition pipeline
#[derive(Clone)]
pub struct Ingestor {
    cache: Cache,
    crawler: Crawler,
    repositories: Option<Arc<dyn RepositoryFetcher>>,
    ttl: Option<Duration>,
}

impl Ingestor {
    pub fn new(cache: Cache, crawler: Crawler) -> Self {
        Self {
            cache,
            crawler,
            repositories: None,
            ttl: None,
        }
    }

    pub fn with_repository_fetcher(mut self, fetcher: Arc<dyn RepositoryFetcher>) -> Self {
        self.repositories = Some(fetcher);
        self
    }

    /// TTL for new entries; the cache's default when unset
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Acquires a snapshot of `input`
    ///
    /// Equivalent requests are answered from the cache without network access
    /// until the entry expires. Cache faults never fail this call.
    ///
    /// # Errors
    ///
    /// - [`IngestError::InvalidSource`] when the input fails validation
    /// - [`IngestError::RepositoryUnavailable`] for repositories when no fetcher is set
    /// - [`IngestError::Repository`] when the fetcher fails
    /// - [`IngestError::Crawl`] when the crawl budget is malformed
    pub async fn ingest(
        &self,
        input: &str,
        options: &RequestOptions,
        budget: &CrawlBudget,
    ) -> Result<Snapshot, IngestError> {
        let source = classify(input);
        match source.kind {
            SourceKind::Rejected => Err(IngestError::InvalidSource {
                input: input.to_string(),
                reason: source.rejection.unwrap_or_default(),
            }),
            SourceKind::GitRepository => self.ingest_repository(source, options).await,
            SourceKind::Website => self.ingest_website(source, options, budget).await,
        }
    }

    async fn ingest_repository(
        &self,
        source: ParsedSource,
        options: &RequestOptions,
    ) -> Result<Snapshot, IngestError> {
        let key = derive_key(&source, options);
        if let Some(entry) = self.cache.get(&key).await {
            match entry.payload {
                CachePayload::Repository(files) => {
                    info!("Serving {} from cache", key);
                    return Ok(Snapshot::Repository {
                        source,
                        files,
                        from_cache: true,
                    });
                }
                other => {
                    warn!("Ignoring {:?} payload cached under {}", other.kind(), key);
                }
            }
        }

        let fetcher = self
            .repositories
            .as_ref()
            .ok_or_else(|| IngestError::RepositoryUnavailable {
                owner: source.owner.clone().unwrap_or_default(),
                repo: source.repo.clone().unwrap_or_default(),
            })?;

        let files = fetcher
            .fetch(&source)
            .await
            .map_err(|e| IngestError::Repository {
                url: source.normalized_url.clone(),
                source: e,
            })?;
        debug!("Fetched {} files for {}", files.len(), key);

        self.cache
            .set(&key, CachePayload::Repository(files.clone()), self.ttl)
            .await;

        Ok(Snapshot::Repository {
            source,
            files,
            from_cache: false,
        })
    }

    async fn ingest_website(
        &self,
        source: ParsedSource,
        options: &RequestOptions,
        budget: &CrawlBudget,
    ) -> Result<Snapshot, IngestError> {
        budget.validate()?;

        let key = derive_crawl_key(&source, options, budget);
        if let Some(entry) = self.cache.get(&key).await {
            match entry.payload {
                CachePayload::Website(report) => {
                    info!("Serving {} from cache", key);
                    return Ok(Snapshot::Website {
                        source,
                        report,
                        from_cache: true,
                    });
                }
                other => {
                    warn!("Ignoring {:?} payload cached under {}", other.kind(), key);
                }
            }
        }

        let report = self.crawler.crawl(&source.normalized_url, budget).await?;
        self.cache
            .set(&key, CachePayload::Website(report.clone()), self.ttl)
            .await;

        Ok(Snapshot::Website {
            source,
            report,
            from_cache: false,
        })
    }
}
