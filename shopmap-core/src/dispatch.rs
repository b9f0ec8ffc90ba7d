use crate::settings::RunSettings;
use crate::store::ResultSet;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use shopmap_crawler::{DomainCrawl, NodeFailure, TraversalEngine, TraversalError};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

/// Callback for reporting per-domain completion as results arrive
pub type ProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// One e-commerce site to crawl, normalized from user input.
///
/// Identity is the lowercased host (plus explicit port), so scheme,
/// case and trailing-slash variants of the same site collapse to one
/// traversal.
#[derive(Debug, Clone)]
pub struct Domain {
    base: Url,
}

impl Domain {
    /// Parse a user-supplied domain, trying an https:// prefix when the
    /// input carries no scheme.
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err("empty domain".to_string());
        }

        if let Ok(url) = Url::parse(trimmed)
            && url.host_str().is_some()
        {
            return Ok(Self { base: url });
        }

        let with_scheme = format!("https://{}", trimmed);
        match Url::parse(&with_scheme) {
            Ok(url) if url.host_str().is_some() => Ok(Self { base: url }),
            _ => Err(format!("invalid domain '{}'", input)),
        }
    }

    /// Deduplication key: lowercased host plus any explicit port.
    pub fn key(&self) -> String {
        let host = self.base.host_str().unwrap_or("unknown").to_lowercase();
        match self.base.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

/// One unit of work for the distribution facility: a full traversal of
/// one domain's sitemap tree.
pub struct CrawlTask {
    pub domain: Domain,
    pub settings: RunSettings,
    pub cancel: CancellationToken,
}

impl CrawlTask {
    pub async fn run(self) -> DomainCrawl {
        let engine = TraversalEngine::new(self.settings.traversal(), self.settings.classifier())
            .with_cancellation(self.cancel);
        engine.run(self.domain.base()).await
    }
}

/// The work-distribution contract the dispatcher depends on: submit a
/// task, get back an awaitable result. `Err` means the facility itself
/// failed to execute the task (a panicked worker, a lost job), which
/// the dispatcher records as a domain failure.
pub trait WorkPool: Send + Sync {
    fn submit(&self, task: CrawlTask) -> BoxFuture<'static, Result<DomainCrawl, String>>;
}

/// Default pool: one tokio task per domain.
pub struct TokioPool;

impl WorkPool for TokioPool {
    fn submit(&self, task: CrawlTask) -> BoxFuture<'static, Result<DomainCrawl, String>> {
        let handle = tokio::spawn(task.run());
        Box::pin(async move {
            handle
                .await
                .map_err(|e| format!("worker task failed: {}", e))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Per-domain entry in the run's failure/summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainReport {
    pub domain: String,
    pub status: DomainStatus,
    pub products_found: usize,
    pub sitemaps_visited: usize,
    pub pages_seen: usize,
    pub failures: Vec<NodeFailure>,
    pub skipped_cycles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_error: Option<String>,
}

impl DomainReport {
    pub fn from_crawl(crawl: DomainCrawl) -> Self {
        let cancelled = crawl
            .failures
            .iter()
            .any(|f| matches!(f.error, shopmap_crawler::CrawlError::Traversal(TraversalError::Cancelled)));
        let status = if crawl.is_total_failure() {
            DomainStatus::Failed
        } else if cancelled {
            DomainStatus::Cancelled
        } else {
            DomainStatus::Completed
        };
        Self {
            domain: crawl.domain,
            status,
            products_found: crawl.product_urls.len(),
            sitemaps_visited: crawl.sitemaps_visited,
            pages_seen: crawl.pages_seen,
            failures: crawl.failures,
            skipped_cycles: crawl.skipped_cycles,
            infrastructure_error: None,
        }
    }

    pub fn infrastructure_failure(domain: String, reason: String) -> Self {
        Self {
            domain,
            status: DomainStatus::Failed,
            products_found: 0,
            sitemaps_visited: 0,
            pages_seen: 0,
            failures: Vec::new(),
            skipped_cycles: Vec::new(),
            infrastructure_error: Some(reason),
        }
    }

    pub fn rejected_input(input: String, reason: String) -> Self {
        Self {
            domain: input,
            status: DomainStatus::Failed,
            products_found: 0,
            sitemaps_visited: 0,
            pages_seen: 0,
            failures: Vec::new(),
            skipped_cycles: Vec::new(),
            infrastructure_error: Some(reason),
        }
    }
}

/// What one dispatcher run produced: the merged result fragments and
/// the per-domain reports, in completion order.
pub struct RunOutcome {
    pub results: ResultSet,
    pub reports: Vec<DomainReport>,
}

/// Fans domain traversals out over a `WorkPool` and merges fragments
/// as they complete. The dispatcher is the single merging coordinator:
/// traversals share no mutable state, and a domain's total failure
/// never aborts its siblings.
pub struct Dispatcher<P: WorkPool> {
    pool: P,
    settings: RunSettings,
    cancel: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl<P: WorkPool> Dispatcher<P> {
    pub fn new(pool: P, settings: RunSettings) -> Self {
        Self {
            pool,
            settings,
            cancel: CancellationToken::new(),
            progress_callback: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Normalize raw inputs into unique domains. Returns the domains
    /// to dispatch (first spelling wins) and the rejected inputs with
    /// their reasons.
    pub fn normalize(inputs: &[String]) -> (Vec<Domain>, Vec<(String, String)>) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut domains = Vec::new();
        let mut rejected = Vec::new();

        for input in inputs {
            match Domain::parse(input) {
                Ok(domain) => {
                    if seen.insert(domain.key()) {
                        domains.push(domain);
                    }
                }
                Err(reason) => rejected.push((input.clone(), reason)),
            }
        }

        (domains, rejected)
    }

    /// Submit one task per domain and collect completions as they
    /// arrive (not in submission order), merging each fragment into
    /// the running ResultSet.
    pub async fn run(&self, domains: Vec<Domain>) -> RunOutcome {
        info!("Dispatching {} domain traversal(s)", domains.len());

        let mut pending = FuturesUnordered::new();
        for domain in domains {
            let name = domain.key();
            let task = CrawlTask {
                domain,
                settings: self.settings.clone(),
                cancel: self.cancel.clone(),
            };
            let submitted = self.pool.submit(task);
            pending.push(async move { (name, submitted.await) });
        }

        let mut results = ResultSet::new();
        let mut reports = Vec::new();

        while let Some((name, outcome)) = pending.next().await {
            match outcome {
                Ok(crawl) => {
                    for url in &crawl.product_urls {
                        results.insert_discovery(url.clone(), crawl.domain.clone());
                    }
                    info!(
                        "Crawled {}: found {} product page(s)",
                        name,
                        crawl.product_urls.len()
                    );
                    if let Some(ref callback) = self.progress_callback {
                        callback(format!(
                            "{}: {} product URLs",
                            name,
                            crawl.product_urls.len()
                        ));
                    }
                    reports.push(DomainReport::from_crawl(crawl));
                }
                Err(reason) => {
                    warn!("Task for {} was lost by the work pool: {}", name, reason);
                    if let Some(ref callback) = self.progress_callback {
                        callback(format!("{}: task failed", name));
                    }
                    reports.push(DomainReport::infrastructure_failure(name, reason));
                }
            }
        }

        RunOutcome { results, reports }
    }
}
