//! Edge cache backend over a sandboxed platform cache
//!
//! Platform caches are keyed by requests, not strings, and cannot list their
//! contents. Each logical key is mapped to a synthetic URL under a fixed base
//! and the entry is stored as JSON with its remaining TTL.

use crate::cache::{BackendKind, CacheBackend, CacheEntry, CacheStats, ReadOutcome};
use crate::{CacheError, CacheResult};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Base of the synthetic request URLs
pub const EDGE_BASE_URL: &str = "https://cache.prompt-harvest.internal";

/// A request-keyed cache provided by the hosting platform
#[async_trait]
pub trait PlatformCache: Send + Sync {
    /// Returns the stored body for a request URL
    async fn lookup(&self, request_url: &str) -> CacheResult<Option<Vec<u8>>>;

    async fn put(&self, request_url: &str, body: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Returns whether something was deleted
    async fn delete(&self, request_url: &str) -> CacheResult<bool>;
}

/// In-process [`PlatformCache`] for local runs and tests
#[derive(Default)]
pub struct MemoryPlatformCache {
    responses: RwLock<HashMap<String, (Vec<u8>, Instant)>>,
}

impl MemoryPlatformCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored responses, expired ones included
    pub async fn len(&self) -> usize {
        self.responses.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.responses.read().await.is_empty()
    }

    pub async fn contains(&self, request_url: &str) -> bool {
        self.responses.read().await.contains_key(request_url)
    }
}

#[async_trait]
impl PlatformCache for MemoryPlatformCache {
    async fn lookup(&self, request_url: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut responses = self.responses.write().await;
        match responses.get(request_url) {
            Some((_, deadline)) if *deadline <= Instant::now() => {
                responses.remove(request_url);
                Ok(None)
            }
            Some((body, _)) => Ok(Some(body.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, request_url: &str, body: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let deadline = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Platform(format!("TTL out of range: {:?}", ttl)))?;
        self.responses
            .write()
            .await
            .insert(request_url.to_string(), (body, deadline));
        Ok(())
    }

    async fn delete(&self, request_url: &str) -> CacheResult<bool> {
        Ok(self.responses.write().await.remove(request_url).is_some())
    }
}

/// Cache backend storing entries in a [`PlatformCache`]
pub struct EdgeBackend {
    platform: Arc<dyn PlatformCache>,
    namespace: String,
}

impl EdgeBackend {
    pub fn new(platform: Arc<dyn PlatformCache>, namespace: impl Into<String>) -> Self {
        Self {
            platform,
            namespace: namespace.into(),
        }
    }

    /// `{EDGE_BASE_URL}/{namespace}/{sha256(key)}`
    pub fn request_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            EDGE_BASE_URL,
            self.namespace,
            hex::encode(Sha256::digest(key.as_bytes()))
        )
    }
}

#[async_trait]
impl CacheBackend for EdgeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Edge
    }

    async fn read(&self, key: &str) -> ReadOutcome {
        let body = match self.platform.lookup(&self.request_url(key)).await {
            Ok(Some(body)) => body,
            Ok(None) => return ReadOutcome::Miss,
            Err(e) => return ReadOutcome::Failed(e),
        };

        match serde_json::from_slice::<CacheEntry>(&body) {
            Ok(entry) if entry.key == key => ReadOutcome::Hit(entry),
            Ok(_) => ReadOutcome::Miss,
            Err(e) => ReadOutcome::Invalid(format!("corrupt edge cache entry: {}", e)),
        }
    }

    async fn write(&self, entry: CacheEntry) -> CacheResult<()> {
        let ttl = entry.remaining_ttl(Utc::now());
        let request_url = self.request_url(&entry.key);
        let body = serde_json::to_vec(&entry)?;
        self.platform.put(&request_url, body, ttl).await
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.platform.delete(&self.request_url(key)).await?;
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        Err(CacheError::Unsupported {
            backend: BackendKind::Edge,
            operation: "clear",
        })
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        Ok(CacheStats::empty(BackendKind::Edge))
    }
}
