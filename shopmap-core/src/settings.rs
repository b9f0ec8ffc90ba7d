use shopmap_crawler::classifier::DEFAULT_INDICATORS;
use shopmap_crawler::{ProductClassifier, TraversalSettings};
use std::time::Duration;

/// Run-level configuration shared by every domain traversal in a run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub indicators: Vec<String>,
    pub case_sensitive: bool,
    pub max_depth: usize,
    pub max_retries: u32,
    pub fetch_timeout: Duration,
    pub max_response_bytes: usize,
    /// Concurrent sitemap fetches per domain (courtesy limit).
    pub concurrency: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        let traversal = TraversalSettings::default();
        Self {
            indicators: DEFAULT_INDICATORS.iter().map(|s| s.to_string()).collect(),
            case_sensitive: false,
            max_depth: traversal.max_depth,
            max_retries: traversal.max_retries,
            fetch_timeout: traversal.fetch_timeout,
            max_response_bytes: traversal.max_response_bytes,
            concurrency: traversal.concurrency,
        }
    }
}

impl RunSettings {
    pub fn classifier(&self) -> ProductClassifier {
        ProductClassifier::new(self.indicators.clone(), self.case_sensitive)
    }

    pub fn traversal(&self) -> TraversalSettings {
        TraversalSettings {
            max_depth: self.max_depth,
            max_retries: self.max_retries,
            fetch_timeout: self.fetch_timeout,
            max_response_bytes: self.max_response_bytes,
            concurrency: self.concurrency,
            ..TraversalSettings::default()
        }
    }
}
