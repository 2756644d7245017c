//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawls
//! end-to-end against them.

use prompt_harvest::config::{Config, UserAgentConfig};
use prompt_harvest::crawler::{build_http_client, CrawlBudget, CrawlReport, Crawler, CrawlerOptions};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler() -> Crawler {
    Crawler::from_config(&Config::default()).expect("Failed to build crawler")
}

/// Crawler that rejects bodies over 2 KiB
fn small_body_crawler() -> Crawler {
    let client = build_http_client(&UserAgentConfig::default()).expect("Failed to build client");
    Crawler::new(
        client,
        CrawlerOptions {
            concurrency: 2,
            max_body_bytes: 2048,
        },
    )
}

fn budget(max_depth: u32, max_pages: usize) -> CrawlBudget {
    CrawlBudget {
        max_depth,
        max_pages,
        ignore_robots: false,
        timeout_per_page: Duration::from_secs(2),
    }
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html; charset=utf-8")
}

fn page_with_links(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a>"#, link, link))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
        title, title, anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Paths requested from the server, robots.txt excluded
async fn page_requests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| request.url.path().to_string())
        .filter(|path| path != "/robots.txt")
        .collect()
}

fn paths(report: &CrawlReport) -> Vec<String> {
    report
        .pages
        .iter()
        .map(|page| url::Url::parse(&page.url).unwrap().path().to_string())
        .collect()
}

#[tokio::test]
async fn test_max_depth_zero_fetches_only_root() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(page_with_links("Home", &["/a", "/b"]))).await;
    mount_page(&server, "/a", html(page_with_links("A", &[]))).await;
    mount_page(&server, "/b", html(page_with_links("B", &[]))).await;

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(0, 10))
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.pages[0].title.as_deref(), Some("Home"));
    assert_eq!(report.pages[0].depth, 0);
    // Links are still extracted from the boundary page
    assert_eq!(report.pages[0].extracted_links.len(), 2);
    assert_eq!(page_requests(&server).await, vec!["/".to_string()]);
}

#[tokio::test]
async fn test_max_pages_limits_fetches() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(page_with_links("Home", &["/a", "/b", "/c"]))).await;
    for route in ["/a", "/b", "/c"] {
        mount_page(&server, route, html(page_with_links(route, &[]))).await;
    }

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(3, 2))
        .await
        .unwrap();

    assert_eq!(report.len(), 2);
    assert_eq!(paths(&report), vec!["/", "/a"]);
    assert_eq!(page_requests(&server).await.len(), 2);
}

#[tokio::test]
async fn test_robots_disallow_is_honored() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private/\n").await;
    mount_page(
        &server,
        "/",
        html(page_with_links(
            "Home",
            &["/public/one", "/private/secret", "/public/two"],
        )),
    )
    .await;
    mount_page(&server, "/public/one", html(page_with_links("One", &[]))).await;
    mount_page(&server, "/public/two", html(page_with_links("Two", &[]))).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html(page_with_links("Secret", &[])))
        .expect(0)
        .mount(&server)
        .await;

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(2, 10))
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/public/one", "/public/two"]);
    assert!(!page_requests(&server)
        .await
        .iter()
        .any(|path| path.starts_with("/private/")));
}

#[tokio::test]
async fn test_ignore_robots_skips_robots_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/", html(page_with_links("Home", &["/a"]))).await;
    mount_page(&server, "/a", html(page_with_links("A", &[]))).await;

    let mut budget = budget(1, 10);
    budget.ignore_robots = true;
    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget)
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/a"]);
}

#[tokio::test]
async fn test_off_domain_links_are_never_fetched() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    let other_port = url::Url::parse(&other.uri()).unwrap().port().unwrap();
    let foreign = format!("http://localhost:{}/landing", other_port);

    mount_page(&server, "/", html(page_with_links("Home", &[foreign.as_str(), "/local"]))).await;
    mount_page(&server, "/local", html(page_with_links("Local", &[]))).await;
    Mock::given(method("GET"))
        .respond_with(html(page_with_links("Elsewhere", &[])))
        .expect(0)
        .mount(&other)
        .await;

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(2, 10))
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/local"]);
    assert!(report.pages[0].extracted_links.contains(&foreign));
    assert!(other.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_failures_are_recorded_not_raised() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html(page_with_links("Home", &["/missing", "/feed", "/slow"])),
    )
    .await;
    mount_page(
        &server,
        "/missing",
        ResponseTemplate::new(404).set_body_raw(page_with_links("Gone", &["/never"]), "text/html"),
    )
    .await;
    mount_page(
        &server,
        "/feed",
        ResponseTemplate::new(200).set_body_string("plain words /never"),
    )
    .await;
    mount_page(
        &server,
        "/slow",
        html(page_with_links("Slow", &["/never"])).set_delay(Duration::from_secs(3)),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/never"))
        .respond_with(html(page_with_links("Never", &[])))
        .expect(0)
        .mount(&server)
        .await;

    let mut budget = budget(3, 10);
    budget.timeout_per_page = Duration::from_millis(500);
    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget)
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/missing", "/feed", "/slow"]);
    assert!(report.pages[0].is_success());

    let missing = &report.pages[1];
    assert_eq!(missing.error.as_deref(), Some("HTTP 404"));
    assert_eq!(missing.status_code, Some(404));
    assert!(missing.extracted_links.is_empty());

    let feed = &report.pages[2];
    assert_eq!(feed.error.as_deref(), Some("Not HTML content"));
    assert!(feed.extracted_links.is_empty());

    let slow = &report.pages[3];
    assert_eq!(slow.error.as_deref(), Some("Request timeout"));
    assert_eq!(slow.status_code, None);

    assert_eq!(report.failed().count(), 3);
}

#[tokio::test]
async fn test_report_is_in_breadth_first_order() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(page_with_links("Home", &["/a", "/b"]))).await;
    // /a finishes last, but still precedes /b and its links precede /b's
    mount_page(
        &server,
        "/a",
        html(page_with_links("A", &["/a/child"])).set_delay(Duration::from_millis(300)),
    )
    .await;
    mount_page(&server, "/b", html(page_with_links("B", &["/b/child"]))).await;
    mount_page(&server, "/a/child", html(page_with_links("A child", &[]))).await;
    mount_page(&server, "/b/child", html(page_with_links("B child", &[]))).await;

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(2, 10))
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/a", "/b", "/a/child", "/b/child"]);
    let depths: Vec<u32> = report.pages.iter().map(|page| page.depth).collect();
    assert_eq!(depths, vec![0, 1, 1, 2, 2]);
}

#[tokio::test]
async fn test_each_page_fetched_once() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html(page_with_links("Home", &["/a", "/a/", "/a#section", "/a?ref=nav", "/"])),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(page_with_links("A", &["/"])))
        .expect(1)
        .mount(&server)
        .await;

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(3, 10))
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/a"]);
}

#[tokio::test]
async fn test_asset_and_auth_links_are_skipped() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html(page_with_links(
            "Home",
            &["/logo.png", "/login", "/api/v1/items", "/manual.pdf", "/docs"],
        )),
    )
    .await;
    mount_page(&server, "/docs", html(page_with_links("Docs", &[]))).await;

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(2, 10))
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/docs"]);
    assert_eq!(page_requests(&server).await.len(), 2);
}

#[tokio::test]
async fn test_sitemap_urls_are_seeded() {
    let server = MockServer::start().await;
    mount_robots(
        &server,
        &format!("User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n", server.uri()),
    )
    .await;
    mount_page(
        &server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<?xml version="1.0"?><urlset><url><loc>{0}/from-sitemap</loc></url><url><loc>{0}/</loc></url></urlset>"#,
                server.uri()
            ),
            "application/xml",
        ),
    )
    .await;
    mount_page(&server, "/", html(page_with_links("Home", &[]))).await;
    mount_page(&server, "/from-sitemap", html(page_with_links("Mapped", &[]))).await;

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(1, 10))
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/from-sitemap"]);
    assert_eq!(report.pages[1].depth, 1);
}

#[tokio::test]
async fn test_unreachable_root_still_returns_report() {
    // Bind and release a port so nothing listens on it
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let uri = format!("http://127.0.0.1:{}", port);

    let report = crawler()
        .crawl(&format!("{}/", uri), &budget(1, 5))
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert!(report.pages[0].error.is_some());
}

#[tokio::test]
async fn test_same_host_redirect_is_followed() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(page_with_links("Home", &["/old"]))).await;
    mount_page(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("Location", "/new"),
    )
    .await;
    mount_page(&server, "/new", html(page_with_links("New", &[]))).await;

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(1, 10))
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/old"]);
    assert!(report.pages[1].is_success());
    assert_eq!(report.pages[1].title.as_deref(), Some("New"));
}

#[tokio::test]
async fn test_cross_host_redirect_is_a_fault() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    let other_port = url::Url::parse(&other.uri()).unwrap().port().unwrap();

    mount_page(&server, "/", html(page_with_links("Home", &["/moved"]))).await;
    mount_page(
        &server,
        "/moved",
        ResponseTemplate::new(302)
            .insert_header("Location", format!("http://localhost:{}/target", other_port).as_str()),
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(html(page_with_links("Target", &[])))
        .expect(0)
        .mount(&other)
        .await;

    let report = crawler()
        .crawl(&format!("{}/", server.uri()), &budget(1, 10))
        .await
        .unwrap();

    let moved = &report.pages[1];
    assert_eq!(moved.error.as_deref(), Some("HTTP 302"));
    assert_eq!(moved.status_code, Some(302));
    assert!(other.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_oversized_body_with_content_length() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(page_with_links("Home", &["/big"]))).await;
    mount_page(&server, "/big", html(format!("<html><body>{}</body></html>", "x".repeat(4096)))).await;

    let report = small_body_crawler()
        .crawl(&format!("{}/", server.uri()), &budget(1, 10))
        .await
        .unwrap();

    assert!(report.pages[0].is_success());
    let big = &report.pages[1];
    assert_eq!(big.error.as_deref(), Some("Response body exceeds 2048 bytes"));
    assert_eq!(big.status_code, Some(200));
    assert!(big.raw_body.is_empty());
}

#[tokio::test]
async fn test_oversized_chunked_body() {
    // Chunked transfer carries no Content-Length, so the limit applies while streaming
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;

                let mut response = String::from(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                );
                for _ in 0..4 {
                    response.push_str(&format!("400\r\n{}\r\n", "y".repeat(1024)));
                }
                response.push_str("0\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    let mut budget = budget(0, 1);
    budget.ignore_robots = true;
    let report = small_body_crawler()
        .crawl(&format!("http://127.0.0.1:{}/", port), &budget)
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(
        report.pages[0].error.as_deref(),
        Some("Response body exceeds 2048 bytes")
    );
}

#[tokio::test]
async fn test_oversized_robots_txt_allows_all() {
    let server = MockServer::start().await;
    let robots = format!(
        "User-agent: *\nDisallow: /\n{}",
        "# filler line to push the file past the limit\n".repeat(100)
    );
    mount_robots(&server, &robots).await;
    mount_page(&server, "/", html(page_with_links("Home", &["/a"]))).await;
    mount_page(&server, "/a", html(page_with_links("A", &[]))).await;

    let report = small_body_crawler()
        .crawl(&format!("{}/", server.uri()), &budget(1, 10))
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/", "/a"]);
    assert!(report.pages.iter().all(|page| page.is_success()));
}
