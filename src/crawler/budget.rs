use crate::{CrawlError, CrawlResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource limits for one crawl run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlBudget {
    /// Deepest link distance from the root that is still fetched
    pub max_depth: u32,

    /// Maximum number of page results in the report
    pub max_pages: usize,

    /// Skip robots.txt (and the sitemaps it lists) entirely
    pub ignore_robots: bool,

    /// Upper bound on each individual request, body included
    pub timeout_per_page: Duration,
}

impl Default for CrawlBudget {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 50,
            ignore_robots: false,
            timeout_per_page: Duration::from_secs(10),
        }
    }
}

impl CrawlBudget {
    /// Rejects budgets a crawl cannot run with
    pub fn validate(&self) -> CrawlResult<()> {
        if self.max_pages == 0 {
            return Err(CrawlError::InvalidBudget(
                "max_pages must be >= 1".to_string(),
            ));
        }

        if self.timeout_per_page.is_zero() {
            return Err(CrawlError::InvalidBudget(
                "timeout_per_page must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
