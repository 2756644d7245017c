use crate::crawler::CrawlReport;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed per-entry overhead added to size estimates
const ENTRY_OVERHEAD_BYTES: usize = 128;

/// Storage strategy of a cache backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Ephemeral, process-local table
    Memory,
    /// Persistent files under a cache directory
    Filesystem,
    /// Sandboxed platform cache with request-shaped keys
    Edge,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Filesystem => "filesystem",
            BackendKind::Edge => "edge",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file of a fetched repository snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
    pub path: String,
    pub content: String,
}

/// What a cache entry holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum CachePayload {
    /// Aggregate report of a website crawl
    Website(CrawlReport),
    /// Flat file list produced by the repository fetcher
    Repository(Vec<RepoFile>),
    /// A directory on local disk, such as a cloned repository
    ///
    /// Only meaningful to the filesystem backend, which checks on every read
    /// that the path still exists.
    Directory(PathBuf),
}

impl CachePayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            CachePayload::Website(_) => PayloadKind::Website,
            CachePayload::Repository(_) => PayloadKind::Repository,
            CachePayload::Directory(_) => PayloadKind::Directory,
        }
    }

    pub fn approximate_size(&self) -> usize {
        match self {
            CachePayload::Website(report) => report.approximate_size(),
            CachePayload::Repository(files) => files
                .iter()
                .map(|file| file.path.len() + file.content.len())
                .sum(),
            CachePayload::Directory(path) => path.as_os_str().len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadKind {
    Website,
    Repository,
    Directory,
}

/// A stored payload with its expiry window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    /// When the payload was fetched and written
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub payload: CachePayload,
    pub backend_kind: BackendKind,
}

impl CacheEntry {
    pub fn new(
        key: impl Into<String>,
        payload: CachePayload,
        ttl: Duration,
        backend_kind: BackendKind,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            key: key.into(),
            created_at,
            expires_at: expiry_after(created_at, ttl),
            payload,
            backend_kind,
        }
    }

    /// An entry whose expiry is not strictly in the future is expired
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn approximate_size(&self) -> usize {
        self.key.len() + self.payload.approximate_size() + ENTRY_OVERHEAD_BYTES
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    ChronoDuration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or_else(|| now + ChronoDuration::days(365 * 100))
}

/// Advisory size report of a backend
///
/// Backends without introspection report zero counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub backend: BackendKind,
    pub entry_count: usize,
    pub approximate_bytes: u64,
    pub per_kind: BTreeMap<PayloadKind, usize>,
}

impl CacheStats {
    pub fn empty(backend: BackendKind) -> Self {
        Self {
            backend,
            entry_count: 0,
            approximate_bytes: 0,
            per_kind: BTreeMap::new(),
        }
    }

    pub(crate) fn record(&mut self, kind: PayloadKind, bytes: u64) {
        self.entry_count += 1;
        self.approximate_bytes += bytes;
        *self.per_kind.entry(kind).or_insert(0) += 1;
    }
}
