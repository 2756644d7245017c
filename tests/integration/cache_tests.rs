//! Integration tests for the cache backends
//!
//! Every backend must behave the same through the `Cache` facade: a fresh
//! entry is returned, an expired one is reported absent and removed.

use prompt_harvest::cache::{
    BackendKind, Cache, CachePayload, ClearOutcome, EdgeBackend, FilesystemBackend,
    MemoryBackend, MemoryPlatformCache, PayloadKind, RepoFile, DEFAULT_FILESYSTEM_MAX_BYTES,
};
use prompt_harvest::crawler::{CrawlReport, PageResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn repository_payload() -> CachePayload {
    CachePayload::Repository(vec![
        RepoFile {
            path: "README.md".to_string(),
            content: "# Demo".to_string(),
        },
        RepoFile {
            path: "src/lib.rs".to_string(),
            content: "pub fn demo() {}".to_string(),
        },
    ])
}

fn website_payload() -> CachePayload {
    CachePayload::Website(CrawlReport {
        root: "https://example.com/".to_string(),
        pages: vec![PageResult {
            url: "https://example.com/".to_string(),
            status_code: Some(200),
            content_type: Some("text/html".to_string()),
            raw_body: "<html><title>Example</title></html>".to_string(),
            title: Some("Example".to_string()),
            text: "Example".to_string(),
            extracted_links: vec!["https://example.com/about".to_string()],
            depth: 0,
            error: None,
        }],
    })
}

fn entry_file(root: &Path, namespace: &str, subdir: &str, key: &str) -> PathBuf {
    root.join(namespace)
        .join(subdir)
        .join(format!("{}.json", hex::encode(Sha256::digest(key.as_bytes()))))
}

async fn filesystem_cache(dir: &TempDir) -> Cache {
    let cache = Cache::new(Arc::new(FilesystemBackend::new(
        dir.path(),
        "test",
        DEFAULT_FILESYSTEM_MAX_BYTES,
    )));
    cache.init().await.unwrap();
    cache
}

/// set → get/has round trip, then expiry after the TTL
async fn assert_expiring_contract(cache: &Cache) {
    let payload = website_payload();
    cache
        .set("fresh", payload.clone(), Some(Duration::from_secs(60)))
        .await;
    cache
        .set("short", repository_payload(), Some(Duration::from_millis(200)))
        .await;

    let entry = cache.get("fresh").await.expect("fresh entry missing");
    assert_eq!(entry.payload, payload);
    assert_eq!(entry.key, "fresh");
    assert!(entry.expires_at > entry.created_at);
    assert!(cache.has("fresh").await);
    assert!(cache.has("short").await);

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(cache.get("short").await.is_none());
    assert!(!cache.has("short").await);
    assert!(cache.has("fresh").await);
}

#[tokio::test]
async fn test_memory_backend_contract() {
    let cache = Cache::new(Arc::new(MemoryBackend::default()));
    assert_expiring_contract(&cache).await;

    let stats = cache.stats().await;
    assert_eq!(stats.backend, BackendKind::Memory);
    assert_eq!(stats.entry_count, 1);
}

#[tokio::test]
async fn test_filesystem_backend_contract() {
    let dir = TempDir::new().unwrap();
    let cache = filesystem_cache(&dir).await;
    assert_expiring_contract(&cache).await;

    assert!(entry_file(dir.path(), "test", "entries", "fresh").exists());
    assert!(!entry_file(dir.path(), "test", "entries", "short").exists());
    assert_eq!(cache.stats().await.entry_count, 1);
}

#[tokio::test]
async fn test_edge_backend_contract() {
    let platform = Arc::new(MemoryPlatformCache::new());
    let backend = EdgeBackend::new(platform.clone(), "test");
    let short_url = backend.request_url("short");
    let cache = Cache::new(Arc::new(backend));

    assert_expiring_contract(&cache).await;

    assert!(!platform.contains(&short_url).await);
    assert_eq!(platform.len().await, 1);
    // No introspection on the platform cache
    assert_eq!(cache.stats().await.entry_count, 0);
}

#[tokio::test]
async fn test_filesystem_entries_survive_reopen() {
    let dir = TempDir::new().unwrap();
    filesystem_cache(&dir)
        .await
        .set("persisted", repository_payload(), None)
        .await;

    let reopened = filesystem_cache(&dir).await;
    let entry = reopened.get("persisted").await.unwrap();
    assert_eq!(entry.payload, repository_payload());
    assert_eq!(entry.backend_kind, BackendKind::Filesystem);
}

#[tokio::test]
async fn test_filesystem_corrupt_metadata_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = filesystem_cache(&dir).await;
    cache.set("k", repository_payload(), None).await;

    let file = entry_file(dir.path(), "test", "entries", "k");
    std::fs::write(&file, b"{\"metadata\": {\"key\": 12").unwrap();

    assert!(cache.get("k").await.is_none());
    assert!(!file.exists());

    // The key is usable again afterwards
    cache.set("k", repository_payload(), None).await;
    assert!(cache.has("k").await);
}

#[tokio::test]
async fn test_filesystem_vanished_directory_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let clone = TempDir::new().unwrap();
    let cache = filesystem_cache(&dir).await;

    cache
        .set("clone", CachePayload::Directory(clone.path().to_path_buf()), None)
        .await;
    let file = entry_file(dir.path(), "test", "paths", "clone");
    assert!(file.exists());
    assert!(cache.has("clone").await);

    drop(clone);

    assert!(cache.get("clone").await.is_none());
    assert!(!file.exists());
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let dir = TempDir::new().unwrap();
    let a = Cache::new(Arc::new(FilesystemBackend::new(
        dir.path(),
        "team-a",
        DEFAULT_FILESYSTEM_MAX_BYTES,
    )));
    let b = Cache::new(Arc::new(FilesystemBackend::new(
        dir.path(),
        "team-b",
        DEFAULT_FILESYSTEM_MAX_BYTES,
    )));

    a.set("shared-key", repository_payload(), None).await;
    assert!(a.has("shared-key").await);
    assert!(!b.has("shared-key").await);

    assert_eq!(b.clear().await, ClearOutcome::Cleared);
    assert!(a.has("shared-key").await);
}

#[tokio::test]
async fn test_clear_outcomes() {
    let dir = TempDir::new().unwrap();
    let filesystem = filesystem_cache(&dir).await;
    filesystem.set("a", repository_payload(), None).await;
    filesystem.set("b", website_payload(), None).await;
    assert_eq!(filesystem.clear().await, ClearOutcome::Cleared);
    assert!(!filesystem.has("a").await);
    assert!(!filesystem.has("b").await);

    let memory = Cache::in_memory();
    memory.set("a", repository_payload(), None).await;
    assert_eq!(memory.clear().await, ClearOutcome::Cleared);
    assert!(!memory.has("a").await);

    let edge = Cache::new(Arc::new(EdgeBackend::new(
        Arc::new(MemoryPlatformCache::new()),
        "test",
    )));
    edge.set("a", repository_payload(), None).await;
    assert_eq!(edge.clear().await, ClearOutcome::Unsupported);
    // Nothing was silently dropped
    assert!(edge.has("a").await);
}

#[tokio::test]
async fn test_delete_is_idempotent_everywhere() {
    let dir = TempDir::new().unwrap();
    let caches = vec![
        Cache::in_memory(),
        filesystem_cache(&dir).await,
        Cache::new(Arc::new(EdgeBackend::new(
            Arc::new(MemoryPlatformCache::new()),
            "test",
        ))),
    ];

    for cache in caches {
        cache.set("k", repository_payload(), None).await;
        cache.delete("k").await;
        cache.delete("k").await;
        cache.delete("never-written").await;
        assert!(!cache.has("k").await, "{} kept a deleted key", cache.kind());
    }
}

#[tokio::test]
async fn test_filesystem_stats_per_kind() {
    let dir = TempDir::new().unwrap();
    let cache = filesystem_cache(&dir).await;
    cache.set("repo", repository_payload(), None).await;
    cache.set("site", website_payload(), None).await;
    cache
        .set("dir", CachePayload::Directory(dir.path().to_path_buf()), None)
        .await;

    let stats = cache.stats().await;
    assert_eq!(stats.entry_count, 3);
    assert!(stats.approximate_bytes > 0);
    assert_eq!(stats.per_kind.get(&PayloadKind::Website), Some(&1));
    assert_eq!(stats.per_kind.get(&PayloadKind::Repository), Some(&1));
    assert_eq!(stats.per_kind.get(&PayloadKind::Directory), Some(&1));
}

#[tokio::test]
async fn test_last_write_wins() {
    let cache = Cache::in_memory();
    cache.set("k", repository_payload(), None).await;
    cache.set("k", website_payload(), None).await;

    assert_eq!(cache.get("k").await.unwrap().payload, website_payload());
    assert_eq!(cache.stats().await.entry_count, 1);
}
