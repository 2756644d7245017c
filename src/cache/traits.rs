//! Cache backend trait and per-operation outcomes

use crate::cache::{BackendKind, CacheEntry, CacheStats};
use crate::{CacheError, CacheResult};
use async_trait::async_trait;

/// Result of reading one key from a backend
///
/// Backends report what they found without deciding what it means for the
/// caller. The [`Cache`](crate::cache::Cache) facade turns every variant other
/// than a live [`ReadOutcome::Hit`] into an absent entry.
#[derive(Debug)]
pub enum ReadOutcome {
    Hit(CacheEntry),
    Miss,
    /// Stored data exists but cannot be used (corrupt metadata, vanished path)
    Invalid(String),
    /// The backend itself failed
    Failed(CacheError),
}

/// Result of clearing a whole namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    /// The backend cannot enumerate its keys
    Unsupported,
    /// The backend failed part way; some entries may remain
    Failed,
}

/// Unified interface for cache backends
///
/// Each operation is atomic for a single key only. Concurrent writes to the
/// same key are last-write-wins. Deleting or clearing something that does not
/// exist is not an error.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Prepares backing storage; called once before first use
    async fn init(&self) -> CacheResult<()> {
        Ok(())
    }

    /// Reads the stored entry for `key`, expired or not
    async fn read(&self, key: &str) -> ReadOutcome;

    async fn write(&self, entry: CacheEntry) -> CacheResult<()>;

    async fn remove(&self, key: &str) -> CacheResult<()>;

    /// Removes every entry in the namespace
    ///
    /// Backends without enumeration return [`CacheError::Unsupported`].
    async fn clear(&self) -> CacheResult<()>;

    async fn stats(&self) -> CacheResult<CacheStats>;
}
