//! Crawler module for bounded website traversal
//!
//! This module contains the core crawling logic, including:
//! - Crawl budgets and per-page results
//! - HTTP fetching with per-request timeouts
//! - HTML parsing, link extraction and text rendering
//! - Frontier management and admission rules
//! - The breadth-first crawl engine

mod budget;
mod engine;
mod fetcher;
mod frontier;
mod parser;
mod report;

pub use budget::CrawlBudget;
pub use engine::{Crawler, CrawlerOptions};
pub use fetcher::{build_http_client, fetch_page, is_html, FetchOutcome, PageFault, MAX_REDIRECTS};
pub(crate) use fetcher::read_body;
pub use frontier::{skip_reason, Frontier, FrontierEntry, SkipReason};
pub use parser::{parse_html, ParsedPage, Renderer, TextRenderer};
pub use report::{CrawlReport, PageResult};
