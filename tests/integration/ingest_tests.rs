//! Integration tests for the ingest pipeline
//!
//! Repository snapshots come from a fetcher backed by a wiremock server that
//! serves file listings. Website snapshots are checked through the cache,
//! since the validator refuses to reach loopback mock servers.

use async_trait::async_trait;
use prompt_harvest::cache::{
    derive_crawl_key, derive_key, Cache, CachePayload, FilesystemBackend, OutputFormat, RepoFile,
    RequestOptions, DEFAULT_FILESYSTEM_MAX_BYTES,
};
use prompt_harvest::config::Config;
use prompt_harvest::crawler::{CrawlBudget, CrawlReport, Crawler};
use prompt_harvest::url::{classify, ParsedSource};
use prompt_harvest::{IngestError, Ingestor, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetches `{base}/{owner}/{repo}/files.json`
struct ListingFetcher {
    base: String,
    client: reqwest::Client,
}

#[async_trait]
impl prompt_harvest::source::RepositoryFetcher for ListingFetcher {
    async fn fetch(&self, source: &ParsedSource) -> anyhow::Result<Vec<RepoFile>> {
        let url = format!(
            "{}/{}/{}/files.json",
            self.base,
            source.owner.as_deref().unwrap_or_default(),
            source.repo.as_deref().unwrap_or_default()
        );
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(serde_json::from_str(&response.text().await?)?)
    }
}

fn listing() -> String {
    serde_json::to_string(&vec![
        RepoFile {
            path: "README.md".to_string(),
            content: "# React".to_string(),
        },
        RepoFile {
            path: "package.json".to_string(),
            content: "{}".to_string(),
        },
    ])
    .unwrap()
}

async fn mount_listing(server: &MockServer, route: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(listing(), "application/json"))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn crawler() -> Crawler {
    Crawler::from_config(&Config::default()).unwrap()
}

fn ingestor(cache: Cache, server: &MockServer) -> Ingestor {
    Ingestor::new(cache, crawler()).with_repository_fetcher(Arc::new(ListingFetcher {
        base: server.uri(),
        client: reqwest::Client::new(),
    }))
}

#[tokio::test]
async fn test_repository_fetched_once_then_cached() {
    let server = MockServer::start().await;
    mount_listing(&server, "/facebook/react/files.json", 1).await;

    let ingestor = ingestor(Cache::in_memory(), &server);
    let options = RequestOptions::default();
    let budget = CrawlBudget::default();

    let first = ingestor
        .ingest("https://github.com/facebook/react", &options, &budget)
        .await
        .unwrap();
    let second = ingestor
        .ingest("https://www.github.com/facebook/react.git", &options, &budget)
        .await
        .unwrap();

    assert!(!first.from_cache());
    assert!(second.from_cache());
    match second {
        Snapshot::Repository { files, source, .. } => {
            assert_eq!(files.len(), 2);
            assert_eq!(source.repo.as_deref(), Some("react"));
        }
        other => panic!("expected a repository snapshot, got {:?}", other),
    }
}

#[tokio::test]
async fn test_output_shaping_options_miss_the_cache() {
    let server = MockServer::start().await;
    mount_listing(&server, "/u/r/files.json", 2).await;

    let ingestor = ingestor(Cache::in_memory(), &server);
    let budget = CrawlBudget::default();
    let markdown = RequestOptions::default();
    let xml = RequestOptions {
        format: OutputFormat::Xml,
        ..Default::default()
    };
    let noisy = RequestOptions {
        show_progress: true,
        ..Default::default()
    };

    assert!(!ingestor.ingest("github.com/u/r", &markdown, &budget).await.unwrap().from_cache());
    assert!(!ingestor.ingest("github.com/u/r", &xml, &budget).await.unwrap().from_cache());
    // Progress display does not shape output
    assert!(ingestor.ingest("github.com/u/r", &noisy, &budget).await.unwrap().from_cache());
}

#[tokio::test]
async fn test_expired_snapshot_is_refetched() {
    let server = MockServer::start().await;
    mount_listing(&server, "/u/r/files.json", 2).await;

    let ingestor = ingestor(Cache::in_memory(), &server).with_ttl(Duration::from_millis(150));
    let options = RequestOptions::default();
    let budget = CrawlBudget::default();

    ingestor.ingest("https://github.com/u/r", &options, &budget).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let again = ingestor.ingest("https://github.com/u/r", &options, &budget).await.unwrap();

    assert!(!again.from_cache());
}

#[tokio::test]
async fn test_filesystem_cache_shared_between_ingestors() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_listing(&server, "/u/r/files.json", 1).await;

    let open = || {
        Cache::new(Arc::new(FilesystemBackend::new(
            dir.path(),
            "ingest",
            DEFAULT_FILESYSTEM_MAX_BYTES,
        )))
    };
    let options = RequestOptions::default();
    let budget = CrawlBudget::default();

    let first = ingestor(open(), &server)
        .ingest("https://github.com/u/r", &options, &budget)
        .await
        .unwrap();
    let second = ingestor(open(), &server)
        .ingest("https://github.com/u/r", &options, &budget)
        .await
        .unwrap();

    assert!(!first.from_cache());
    assert!(second.from_cache());
}

#[tokio::test]
async fn test_fetcher_failure_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/u/missing/files.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = ingestor(Cache::in_memory(), &server)
        .ingest(
            "https://github.com/u/missing",
            &RequestOptions::default(),
            &CrawlBudget::default(),
        )
        .await;

    assert!(matches!(result, Err(IngestError::Repository { .. })));
}

#[tokio::test]
async fn test_loopback_mock_server_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let result = ingestor(Cache::in_memory(), &server)
        .ingest(&server.uri(), &RequestOptions::default(), &CrawlBudget::default())
        .await;

    match result {
        Err(IngestError::InvalidSource { reason, .. }) => {
            assert!(reason.contains("Private IP address"), "{}", reason)
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_inputs() {
    let server = MockServer::start().await;
    let ingestor = ingestor(Cache::in_memory(), &server);

    for (input, expected) in [
        ("ftp://example.com/file", "Invalid protocol"),
        ("http://localhost:8080/", "Blocked hostname"),
        ("http://10.0.0.7/", "Private IP address"),
        ("https://example.com/a/../../etc/passwd", "path traversal"),
    ] {
        match ingestor
            .ingest(input, &RequestOptions::default(), &CrawlBudget::default())
            .await
        {
            Err(IngestError::InvalidSource { reason, .. }) => {
                assert!(reason.contains(expected), "{}: {}", input, reason)
            }
            other => panic!("{} should be rejected, got {:?}", input, other),
        }
    }
}

#[tokio::test]
async fn test_website_served_from_cache_without_network() {
    let cache = Cache::in_memory();
    let options = RequestOptions::default();
    let budget = CrawlBudget::default();
    let source = classify("https://docs.example.com/guide/");

    let report = CrawlReport {
        root: "https://docs.example.com/guide".to_string(),
        pages: Vec::new(),
    };
    cache
        .set(
            &derive_crawl_key(&source, &options, &budget),
            CachePayload::Website(report.clone()),
            None,
        )
        .await;

    let snapshot = Ingestor::new(cache, crawler())
        .ingest("docs.example.com/guide#start", &options, &budget)
        .await
        .unwrap();

    match snapshot {
        Snapshot::Website {
            report: cached,
            from_cache,
            ..
        } => {
            assert!(from_cache);
            assert_eq!(cached, report);
        }
        other => panic!("expected a website snapshot, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mismatched_payload_kind_is_not_served() {
    let server = MockServer::start().await;
    mount_listing(&server, "/u/r/files.json", 1).await;

    let cache = Cache::in_memory();
    let options = RequestOptions::default();
    cache
        .set(
            &derive_key(&classify("https://github.com/u/r"), &options),
            CachePayload::Website(CrawlReport::default()),
            None,
        )
        .await;

    let snapshot = ingestor(cache, &server)
        .ingest("https://github.com/u/r", &options, &CrawlBudget::default())
        .await
        .unwrap();
    assert!(!snapshot.from_cache());
}
