//! Breadth-first crawl engine
//!
//! One [`Crawler::crawl`] call owns its frontier and visited set from start to
//! finish. Pages are fetched in small waves; within a wave the fetches run
//! concurrently, but results are consumed in pop order and links are queued
//! only after their page completed, so the report order is the order a
//! sequential breadth-first traversal would produce.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchOutcome, PageFault};
use crate::crawler::frontier::{skip_reason, Frontier, FrontierEntry};
use crate::crawler::parser::{parse_html, Renderer, TextRenderer};
use crate::crawler::{CrawlBudget, CrawlReport, PageResult};
use crate::robots::{fetch_robots, fetch_sitemap_urls, RobotsPolicy, MAX_SITEMAPS, MAX_SITEMAP_URLS};
use crate::url::{same_domain, strip_fragment};
use crate::{CrawlError, CrawlResult};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::sync::Arc;
use tracing::Instrument;
use url::Url;

/// Tuning knobs that do not change what a crawl returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerOptions {
    /// Fetches in flight at once within a run
    pub concurrency: usize,

    /// Largest HTML body accepted per page
    pub max_body_bytes: usize,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Website crawler
///
/// A `Crawler` holds no per-run state and can serve concurrent `crawl` calls
/// on different roots.
#[derive(Clone)]
pub struct Crawler {
    client: Client,
    renderer: Arc<dyn Renderer>,
    options: CrawlerOptions,
}

impl Crawler {
    /// Creates a crawler around an existing HTTP client
    pub fn new(client: Client, options: CrawlerOptions) -> Self {
        Self {
            client,
            renderer: Arc::new(TextRenderer),
            options,
        }
    }

    /// Builds a crawler from configuration
    pub fn from_config(config: &Config) -> CrawlResult<Self> {
        let client = build_http_client(&config.user_agent)?;
        Ok(Self::new(client, config.crawler.options()))
    }

    /// Replaces the HTML-to-text renderer
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn options(&self) -> &CrawlerOptions {
        &self.options
    }

    /// Crawls a website breadth-first within `budget`
    ///
    /// # Arguments
    ///
    /// * `root` - Absolute http(s) URL the crawl starts from
    /// * `budget` - Depth, page and per-page time limits
    ///
    /// # Returns
    ///
    /// A [`CrawlReport`] with pages in breadth-first order, root first.
    ///
    /// # Errors
    ///
    /// Only a malformed budget or a root that is not an absolute http(s) URL
    /// fail the call. Every per-page problem is recorded in the report.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use prompt_harvest::config::Config;
    /// use prompt_harvest::crawler::{CrawlBudget, Crawler};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let crawler = Crawler::from_config(&Config::default())?;
    /// let report = crawler.crawl("https://example.com/", &CrawlBudget::default()).await?;
    /// for page in &report.pages {
    ///     println!("{} {:?}", page.url, page.error);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn crawl(&self, root: &str, budget: &CrawlBudget) -> CrawlResult<CrawlReport> {
        budget.validate()?;
        let root = parse_root(root)?;

        let span = tracing::info_span!("crawl", root = %root);
        Ok(self.run(root, budget).instrument(span).await)
    }

    async fn run(&self, root: Url, budget: &CrawlBudget) -> CrawlReport {
        tracing::info!(
            "Starting crawl (max depth {}, max pages {}, robots {})",
            budget.max_depth,
            budget.max_pages,
            if budget.ignore_robots { "ignored" } else { "honored" }
        );
        let start_time = std::time::Instant::now();

        let mut frontier = Frontier::new();
        frontier.discover(root.clone(), 0);

        let robots = if budget.ignore_robots {
            RobotsPolicy::allow_all()
        } else {
            let robots = fetch_robots(
                &self.client,
                &root,
                budget.timeout_per_page,
                self.options.max_body_bytes,
            )
            .await;
            self.seed_from_sitemaps(&mut frontier, &root, &robots, budget)
                .await;
            robots
        };

        let mut pages: Vec<PageResult> = Vec::new();
        let mut skipped = 0usize;

        while pages.len() < budget.max_pages {
            let wave_size = self
                .options
                .concurrency
                .max(1)
                .min(budget.max_pages - pages.len());

            let mut wave = Vec::with_capacity(wave_size);
            while wave.len() < wave_size {
                let Some(entry) = frontier.pop() else {
                    break;
                };
                match skip_reason(&entry, &root, budget, &robots) {
                    Some(reason) => {
                        tracing::debug!("Skipping {} ({})", entry.url, reason);
                        skipped += 1;
                    }
                    None => wave.push(entry),
                }
            }

            if wave.is_empty() {
                tracing::debug!("Frontier is empty");
                break;
            }

            let client = &self.client;
            let timeout = budget.timeout_per_page;
            let max_body_bytes = self.options.max_body_bytes;
            let outcomes: Vec<(FrontierEntry, FetchOutcome)> = stream::iter(wave)
                .map(move |entry| async move {
                    let outcome = fetch_page(client, &entry.url, timeout, max_body_bytes).await;
                    (entry, outcome)
                })
                .buffered(wave_size)
                .collect()
                .await;

            for (entry, outcome) in outcomes {
                let page = self.build_result(entry, outcome);

                if page.is_success() && page.depth < budget.max_depth {
                    for link in &page.extracted_links {
                        if let Ok(url) = Url::parse(link) {
                            frontier.discover(url, page.depth + 1);
                        }
                    }
                }

                pages.push(page);
            }
        }

        let report = CrawlReport {
            root: root.to_string(),
            pages,
        };

        tracing::info!(
            "Crawl completed: {} pages ({} failed), {} skipped, {} left in frontier, in {:?}",
            report.len(),
            report.failed().count(),
            skipped,
            frontier.len(),
            start_time.elapsed()
        );

        report
    }

    /// Queues same-domain sitemap URLs at depth 1
    ///
    /// Sitemaps on other hosts are not fetched. Nothing here counts against
    /// the page budget.
    async fn seed_from_sitemaps(
        &self,
        frontier: &mut Frontier,
        root: &Url,
        robots: &RobotsPolicy,
        budget: &CrawlBudget,
    ) {
        if budget.max_depth == 0 || robots.sitemaps.is_empty() {
            return;
        }

        let mut seeded = 0usize;
        for sitemap in robots.sitemaps.iter().take(MAX_SITEMAPS) {
            let Ok(sitemap_url) = root.join(sitemap) else {
                continue;
            };
            if !same_domain(root, &sitemap_url) {
                tracing::debug!("Ignoring off-domain sitemap {}", sitemap_url);
                continue;
            }

            let locations = fetch_sitemap_urls(
                &self.client,
                &sitemap_url,
                budget.timeout_per_page,
                self.options.max_body_bytes,
            )
            .await;
            for location in locations {
                if seeded >= MAX_SITEMAP_URLS {
                    break;
                }
                if let Ok(url) = root.join(&location) {
                    if frontier.discover(strip_fragment(&url), 1) {
                        seeded += 1;
                    }
                }
            }
        }

        if seeded > 0 {
            tracing::debug!("Seeded {} URLs from sitemaps", seeded);
        }
    }

    fn build_result(&self, entry: FrontierEntry, outcome: FetchOutcome) -> PageResult {
        let url = entry.url.to_string();

        match outcome {
            FetchOutcome::Html {
                final_url,
                status,
                content_type,
                body,
            } => {
                let parsed = parse_html(&body, &final_url);
                let text = self.renderer.render(&body, &final_url);
                tracing::debug!(
                    "Fetched {} (depth {}, {} links)",
                    url,
                    entry.depth,
                    parsed.links.len()
                );

                PageResult {
                    url,
                    status_code: Some(status),
                    content_type: Some(content_type),
                    raw_body: body,
                    title: parsed.title,
                    text,
                    extracted_links: parsed.links,
                    depth: entry.depth,
                    error: None,
                }
            }

            FetchOutcome::NotHtml {
                status,
                content_type,
            } => {
                tracing::debug!("Fetched {} but got {}", url, content_type);
                PageResult {
                    url,
                    status_code: Some(status),
                    content_type: Some(content_type),
                    raw_body: String::new(),
                    title: None,
                    text: String::new(),
                    extracted_links: Vec::new(),
                    depth: entry.depth,
                    error: Some(PageFault::NotHtml.to_string()),
                }
            }

            FetchOutcome::Failed {
                status,
                content_type,
                fault,
            } => {
                tracing::debug!("Failed to fetch {}: {}", url, fault);
                PageResult {
                    url,
                    status_code: status,
                    content_type,
                    raw_body: String::new(),
                    title: None,
                    text: String::new(),
                    extracted_links: Vec::new(),
                    depth: entry.depth,
                    error: Some(fault.to_string()),
                }
            }
        }
    }
}

fn parse_root(root: &str) -> CrawlResult<Url> {
    let invalid = |reason: &str| CrawlError::InvalidRoot {
        url: root.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(root).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }

    Ok(strip_fragment(&url))
}
