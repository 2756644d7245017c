//! Filesystem cache backend
//!
//! Layout under the namespace directory:
//!
//! ```text
//! {root}/{namespace}/entries/{sha256(key)}.json   serialized payloads
//! {root}/{namespace}/paths/{sha256(key)}.json     entries wrapping a local path
//! ```
//!
//! Each file holds `{ "metadata": ..., "payload": ... }`. A file's mtime is
//! its last access time: reads touch the file without rewriting it, and
//! eviction removes the oldest files first.

use crate::cache::{
    BackendKind, CacheBackend, CacheEntry, CachePayload, CacheStats, PayloadKind, ReadOutcome,
};
use crate::{CacheError, CacheResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, warn};

/// Default size bound of one namespace on disk
pub const DEFAULT_FILESYSTEM_MAX_BYTES: u64 = 512 * 1024 * 1024;

const ENTRIES_DIR: &str = "entries";
const PATHS_DIR: &str = "paths";
const TEMP_SUFFIX: &str = ".tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct StoredMetadata {
    key: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    kind: PayloadKind,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredFile {
    metadata: StoredMetadata,
    payload: CachePayload,
}

/// Header-only view used when the payload is not needed
#[derive(Debug, Deserialize)]
struct StoredHeader {
    metadata: StoredMetadata,
}

struct FileInfo {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

/// Persistent cache backend rooted at a directory
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    /// `{root}/{namespace}`
    base: PathBuf,
    max_bytes: u64,
}

impl FilesystemBackend {
    pub fn new(root: impl AsRef<Path>, namespace: &str, max_bytes: u64) -> Self {
        Self {
            base: root.as_ref().join(namespace),
            max_bytes,
        }
    }

    /// Directory holding this namespace
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    fn file_name(key: &str) -> String {
        format!("{}.json", hex::encode(Sha256::digest(key.as_bytes())))
    }

    fn dir_for(&self, kind: PayloadKind) -> PathBuf {
        match kind {
            PayloadKind::Directory => self.base.join(PATHS_DIR),
            PayloadKind::Website | PayloadKind::Repository => self.base.join(ENTRIES_DIR),
        }
    }

    /// Both places a key may live, serialized payloads first
    fn candidate_paths(&self, key: &str) -> [PathBuf; 2] {
        let name = Self::file_name(key);
        [
            self.base.join(ENTRIES_DIR).join(&name),
            self.base.join(PATHS_DIR).join(&name),
        ]
    }

    /// Writes through a temp file and a rename so readers never see a partial file
    async fn write_atomic(path: &Path, bytes: &[u8]) -> CacheResult<()> {
        let sequence = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp = path.with_extension(format!(
            "{}-{}{}",
            std::process::id(),
            sequence,
            TEMP_SUFFIX
        ));
        fs::write(&temp, bytes).await?;
        if let Err(e) = fs::rename(&temp, path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Sets the mtime to now without touching the content
    ///
    /// Never creates the file, so a concurrent remove stays removed.
    async fn touch(path: &Path) -> std::io::Result<()> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            std::fs::OpenOptions::new()
                .write(true)
                .open(&path)?
                .set_modified(SystemTime::now())
        })
        .await
        .map_err(std::io::Error::other)?
    }

    async fn remove_if_present(path: &Path) -> CacheResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists cache files in both subdirectories; missing directories are empty
    async fn list_files(&self) -> CacheResult<Vec<FileInfo>> {
        let mut files = Vec::new();
        for dir in [self.base.join(ENTRIES_DIR), self.base.join(PATHS_DIR)] {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.to_string_lossy().ends_with(TEMP_SUFFIX) {
                    continue;
                }
                let metadata = match entry.metadata().await {
                    Ok(metadata) if metadata.is_file() => metadata,
                    // Removed concurrently, or not ours
                    _ => continue,
                };
                files.push(FileInfo {
                    path,
                    len: metadata.len(),
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                });
            }
        }
        Ok(files)
    }

    /// Evicts least-recently-accessed files down to 80% of the budget
    async fn enforce_budget(&self) -> CacheResult<()> {
        let mut files = self.list_files().await?;
        let mut total: u64 = files.iter().map(|file| file.len).sum();
        if total <= self.max_bytes {
            return Ok(());
        }

        let target = self.max_bytes / 10 * 8;
        files.sort_by_key(|file| file.modified);

        let mut evicted = 0;
        for file in files {
            if total <= target {
                break;
            }
            Self::remove_if_present(&file.path).await?;
            total = total.saturating_sub(file.len);
            evicted += 1;
        }
        debug!(
            "Evicted {} filesystem cache entries ({} bytes remain)",
            evicted, total
        );
        Ok(())
    }

    async fn read_file(&self, key: &str, path: &Path) -> Option<ReadOutcome> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => return Some(ReadOutcome::Failed(CacheError::Io(e))),
        };

        let stored: StoredFile = match serde_json::from_slice(&bytes) {
            Ok(stored) => stored,
            Err(e) => {
                return Some(ReadOutcome::Invalid(format!(
                    "corrupt cache file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if stored.metadata.key != key {
            // Digest collision with another key
            return Some(ReadOutcome::Miss);
        }

        if let CachePayload::Directory(dir) = &stored.payload {
            if fs::metadata(dir).await.is_err() {
                return Some(ReadOutcome::Invalid(format!(
                    "cached path no longer exists: {}",
                    dir.display()
                )));
            }
        }

        // Bump mtime so eviction sees this entry as recently used
        if let Err(e) = Self::touch(path).await {
            debug!("Failed to refresh access time of {}: {}", path.display(), e);
        }

        Some(ReadOutcome::Hit(CacheEntry {
            key: stored.metadata.key,
            created_at: stored.metadata.created_at,
            expires_at: stored.metadata.expires_at,
            payload: stored.payload,
            backend_kind: BackendKind::Filesystem,
        }))
    }
}

#[async_trait]
impl CacheBackend for FilesystemBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Filesystem
    }

    async fn init(&self) -> CacheResult<()> {
        fs::create_dir_all(self.base.join(ENTRIES_DIR)).await?;
        fs::create_dir_all(self.base.join(PATHS_DIR)).await?;
        Ok(())
    }

    async fn read(&self, key: &str) -> ReadOutcome {
        for path in self.candidate_paths(key) {
            if let Some(outcome) = self.read_file(key, &path).await {
                return outcome;
            }
        }
        ReadOutcome::Miss
    }

    async fn write(&self, entry: CacheEntry) -> CacheResult<()> {
        let kind = entry.payload.kind();
        let stored = StoredFile {
            metadata: StoredMetadata {
                key: entry.key,
                created_at: entry.created_at,
                expires_at: entry.expires_at,
                kind,
            },
            payload: entry.payload,
        };
        let bytes = serde_json::to_vec(&stored)?;

        let dir = self.dir_for(kind);
        fs::create_dir_all(&dir).await?;
        let name = Self::file_name(&stored.metadata.key);
        Self::write_atomic(&dir.join(&name), &bytes).await?;

        // A key keeps a single file even when its payload kind changes
        for path in self.candidate_paths(&stored.metadata.key) {
            if path.parent() != Some(dir.as_path()) {
                Self::remove_if_present(&path).await?;
            }
        }

        self.enforce_budget().await
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        for path in self.candidate_paths(key) {
            Self::remove_if_present(&path).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        match fs::remove_dir_all(&self.base).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.init().await
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let mut stats = CacheStats::empty(BackendKind::Filesystem);
        for file in self.list_files().await? {
            let bytes = match fs::read(&file.path).await {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            match serde_json::from_slice::<StoredHeader>(&bytes) {
                Ok(header) => stats.record(header.metadata.kind, file.len),
                Err(e) => warn!("Skipping corrupt cache file {}: {}", file.path.display(), e),
            }
        }
        Ok(stats)
    }
}
