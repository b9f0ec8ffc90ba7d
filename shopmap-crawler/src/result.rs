use crate::error::CrawlError;
use serde::{Deserialize, Serialize};

/// One sitemap node that could not be processed, with the error left
/// after retries were exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub url: String,
    pub attempts: u32,
    pub error: CrawlError,
}

/// Everything one domain traversal produced: the classifier matches,
/// per-node failures, cyclic references that were skipped, and basic
/// counters for the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainCrawl {
    pub domain: String,
    pub product_urls: Vec<String>,
    pub failures: Vec<NodeFailure>,
    pub skipped_cycles: Vec<String>,
    pub sitemaps_visited: usize,
    pub pages_seen: usize,
}

impl DomainCrawl {
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            product_urls: Vec::new(),
            failures: Vec::new(),
            skipped_cycles: Vec::new(),
            sitemaps_visited: 0,
            pages_seen: 0,
        }
    }

    /// True when nothing was successfully traversed and at least one
    /// node failed - the root sitemap was effectively unreachable.
    pub fn is_total_failure(&self) -> bool {
        self.sitemaps_visited == 0 && !self.failures.is_empty()
    }
}
