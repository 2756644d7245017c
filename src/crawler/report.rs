use serde::{Deserialize, Serialize};

/// Outcome of one completed fetch attempt
///
/// Built once by the crawler and never modified. A failed attempt is still a
/// result: `error` is set and there are no extracted links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub raw_body: String,
    pub title: Option<String>,
    /// Rendered text of the page
    pub text: String,
    /// Absolute anchor targets in document order
    pub extracted_links: Vec<String>,
    pub depth: u32,
    pub error: Option<String>,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Page results in breadth-first discovery order, root first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub root: String,
    pub pages: Vec<PageResult>,
}

impl CrawlReport {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn successful(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|page| page.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|page| !page.is_success())
    }

    /// URLs of all reported pages, in report order
    pub fn urls(&self) -> Vec<&str> {
        self.pages.iter().map(|page| page.url.as_str()).collect()
    }

    /// Rough byte size of the report, used for cache accounting
    pub fn approximate_size(&self) -> usize {
        self.pages
            .iter()
            .map(|page| {
                page.url.len()
                    + page.raw_body.len()
                    + page.text.len()
                    + page.extracted_links.iter().map(String::len).sum::<usize>()
            })
            .sum()
    }
}
