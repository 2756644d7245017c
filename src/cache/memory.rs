//! In-memory cache backend
//!
//! Holds entries in a `HashMap` behind a [`RwLock`]. The table is bounded by
//! an estimated byte size; when a write pushes it over budget the entries
//! closest to expiry are evicted, a fifth of the table at a time.

use crate::cache::{BackendKind, CacheBackend, CacheEntry, CacheStats, ReadOutcome};
use crate::CacheResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Default size bound of the in-memory table
pub const DEFAULT_MEMORY_MAX_BYTES: usize = 64 * 1024 * 1024;

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, (CacheEntry, usize)>,
    total_bytes: usize,
}

impl MemoryState {
    fn insert(&mut self, entry: CacheEntry) {
        let size = entry.approximate_size();
        if let Some((_, old_size)) = self.entries.insert(entry.key.clone(), (entry, size)) {
            self.total_bytes -= old_size;
        }
        self.total_bytes += size;
    }

    fn remove(&mut self, key: &str) {
        if let Some((_, size)) = self.entries.remove(key) {
            self.total_bytes -= size;
        }
    }

    /// Drops the soonest-to-expire 20% (at least one entry) until under budget
    fn evict_to(&mut self, max_bytes: usize) -> usize {
        let mut evicted = 0;
        while self.total_bytes > max_bytes && !self.entries.is_empty() {
            let mut by_expiry: Vec<(String, chrono::DateTime<chrono::Utc>)> = self
                .entries
                .iter()
                .map(|(key, (entry, _))| (key.clone(), entry.expires_at))
                .collect();
            by_expiry.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

            let batch = (by_expiry.len() / 5).max(1);
            for (key, _) in by_expiry.into_iter().take(batch) {
                self.remove(&key);
                evicted += 1;
            }
        }
        evicted
    }
}

/// Ephemeral cache backend
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    max_bytes: usize,
}

impl MemoryBackend {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            max_bytes,
        }
    }

    #[cfg(test)]
    async fn contains(&self, key: &str) -> bool {
        self.state.read().await.entries.contains_key(key)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_MAX_BYTES)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn read(&self, key: &str) -> ReadOutcome {
        match self.state.read().await.entries.get(key) {
            Some((entry, _)) => ReadOutcome::Hit(entry.clone()),
            None => ReadOutcome::Miss,
        }
    }

    async fn write(&self, entry: CacheEntry) -> CacheResult<()> {
        let mut state = self.state.write().await;
        state.insert(entry);
        let evicted = state.evict_to(self.max_bytes);
        if evicted > 0 {
            debug!(
                "Evicted {} memory cache entries ({} bytes remain)",
                evicted, state.total_bytes
            );
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.state.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        *self.state.write().await = MemoryState::default();
        Ok(())
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let state = self.state.read().await;
        let mut stats = CacheStats::empty(BackendKind::Memory);
        for (entry, size) in state.entries.values() {
            stats.record(entry.payload.kind(), *size as u64);
        }
        Ok(stats)
    }
}
