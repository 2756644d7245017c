//! Cache module for expiring, content-addressed snapshots
//!
//! This module fronts all network access with a single cache interface:
//! - Entry model, payloads and advisory stats
//! - Key derivation from a source and its output-shaping options
//! - Memory, filesystem and edge backends
//! - A factory that picks one backend at startup
//!
//! Caching never fails the primary operation. Read faults become misses and
//! write faults become no-ops, both logged.

mod edge;
mod entry;
mod factory;
mod filesystem;
mod key;
mod memory;
mod traits;

pub use edge::{EdgeBackend, MemoryPlatformCache, PlatformCache, EDGE_BASE_URL};
pub use entry::{BackendKind, CacheEntry, CachePayload, CacheStats, PayloadKind, RepoFile};
pub use factory::{default_cache_dir, open_cache, CacheEnvironment};
pub use filesystem::{FilesystemBackend, DEFAULT_FILESYSTEM_MAX_BYTES};
pub use key::{derive_crawl_key, derive_key, OutputFormat, RequestOptions};
pub use memory::{MemoryBackend, DEFAULT_MEMORY_MAX_BYTES};
pub use traits::{CacheBackend, ClearOutcome, ReadOutcome};

use crate::{CacheError, CacheResult};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// TTL used when a caller does not pick one
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Handle to the process-wide cache backend
///
/// Cloning is cheap; all clones share one backend.
///
/// # Example
///
/// ```no_run
/// use prompt_harvest::cache::{Cache, CachePayload};
///
/// # async fn example() {
/// let cache = Cache::in_memory();
/// cache.set("key", CachePayload::Repository(Vec::new()), None).await;
/// assert!(cache.has("key").await);
/// # }
/// ```
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.kind())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::default()))
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Prepares backing storage
    ///
    /// Unlike the other operations this reports failure, so startup code can
    /// fall back to another backend.
    pub async fn init(&self) -> CacheResult<()> {
        self.backend.init().await
    }

    /// Returns the live entry for `key`
    ///
    /// Expired and unusable entries are removed and reported absent.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.backend.read(key).await {
            ReadOutcome::Hit(entry) if entry.is_expired_at(Utc::now()) => {
                debug!("Cache entry expired: {}", key);
                self.discard(key).await;
                None
            }
            ReadOutcome::Hit(entry) => {
                debug!("Cache hit: {}", key);
                Some(entry)
            }
            ReadOutcome::Miss => {
                debug!("Cache miss: {}", key);
                None
            }
            ReadOutcome::Invalid(reason) => {
                warn!("Discarding invalid cache entry {}: {}", key, reason);
                self.discard(key).await;
                None
            }
            ReadOutcome::Failed(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Stores `payload` under `key` for `ttl` (default TTL when `None`)
    pub async fn set(&self, key: &str, payload: CachePayload, ttl: Option<Duration>) {
        let entry = CacheEntry::new(
            key,
            payload,
            ttl.unwrap_or(self.default_ttl),
            self.backend.kind(),
        );
        if let Err(e) = self.backend.write(entry).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }

    pub async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.remove(key).await {
            warn!("Cache delete failed for {}: {}", key, e);
        }
    }

    /// Removes every entry of the namespace
    ///
    /// Backends that cannot enumerate keys report
    /// [`ClearOutcome::Unsupported`] instead of silently doing nothing.
    pub async fn clear(&self) -> ClearOutcome {
        match self.backend.clear().await {
            Ok(()) => ClearOutcome::Cleared,
            Err(CacheError::Unsupported { backend, operation }) => {
                warn!(
                    "Cache {} is not supported by the {} backend; entries expire by TTL only",
                    operation, backend
                );
                ClearOutcome::Unsupported
            }
            Err(e) => {
                warn!("Cache clear failed: {}", e);
                ClearOutcome::Failed
            }
        }
    }

    /// Advisory counts; zero when the backend cannot introspect
    pub async fn stats(&self) -> CacheStats {
        match self.backend.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Cache stats unavailable: {}", e);
                CacheStats::empty(self.backend.kind())
            }
        }
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.backend.remove(key).await {
            debug!("Failed to remove stale cache entry {}: {}", key, e);
        }
    }
}
