use crate::classifier::ProductClassifier;
use crate::error::{CrawlError, ParseError, TraversalError};
use crate::fetcher::SitemapFetcher;
use crate::result::{DomainCrawl, NodeFailure};
use crate::sitemap::{self, SitemapNode};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Tuning knobs for one domain traversal.
#[derive(Debug, Clone)]
pub struct TraversalSettings {
    /// Deepest allowed index nesting; nodes beyond it are recorded as
    /// `DepthExceeded` failures.
    pub max_depth: usize,
    /// Extra attempts after the first, for transient fetch errors only.
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub fetch_timeout: Duration,
    pub max_response_bytes: usize,
    /// Concurrent sitemap fetches against one origin.
    pub concurrency: usize,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            fetch_timeout: Duration::from_secs(10),
            max_response_bytes: 10 * 1024 * 1024,
            concurrency: 5,
        }
    }
}

/// Expands one domain's sitemap tree and collects classifier matches.
///
/// The traversal is iterative: an explicit frontier queue plus a capped
/// set of in-flight fetches, with a visited set guarding against cyclic
/// or self-referential indexes. One bad nested sitemap never aborts the
/// rest of the domain.
pub struct TraversalEngine {
    fetcher: SitemapFetcher,
    classifier: ProductClassifier,
    settings: TraversalSettings,
    cancel: CancellationToken,
}

struct NodeOutcome {
    url: String,
    depth: usize,
    attempts: u32,
    result: Result<SitemapNode, CrawlError>,
}

fn record_cancelled(
    crawl: &mut DomainCrawl,
    in_flight_urls: &mut HashSet<String>,
    frontier: &mut VecDeque<(String, usize)>,
) {
    for url in in_flight_urls.drain() {
        crawl.failures.push(NodeFailure {
            url,
            attempts: 0,
            error: TraversalError::Cancelled.into(),
        });
    }
    while let Some((url, _)) = frontier.pop_front() {
        crawl.failures.push(NodeFailure {
            url,
            attempts: 0,
            error: TraversalError::Cancelled.into(),
        });
    }
}

impl TraversalEngine {
    pub fn new(settings: TraversalSettings, classifier: ProductClassifier) -> Self {
        let fetcher = SitemapFetcher::new(settings.fetch_timeout, settings.max_response_bytes);
        Self {
            fetcher,
            classifier,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Traverse starting from `<base>/sitemap.xml`. A 404 on that
    /// canonical path is a domain-level failure; no alternate sitemap
    /// locations are guessed.
    pub async fn run(&self, base: &Url) -> DomainCrawl {
        let host = base.host_str().unwrap_or("unknown");
        let domain = match base.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let mut crawl = DomainCrawl::new(domain);

        let root = match base.join("/sitemap.xml") {
            Ok(url) => url,
            Err(e) => {
                crawl.failures.push(NodeFailure {
                    url: base.to_string(),
                    attempts: 0,
                    error: ParseError::Malformed(format!("cannot derive sitemap URL: {}", e))
                        .into(),
                });
                return crawl;
            }
        };

        info!("Starting sitemap traversal of {}", crawl.domain);

        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<(String, usize)> = VecDeque::new();
        frontier.push_back((root.to_string(), 0));

        let mut in_flight = FuturesUnordered::new();
        let mut in_flight_urls: HashSet<String> = HashSet::new();

        loop {
            if self.cancel.is_cancelled() {
                record_cancelled(&mut crawl, &mut in_flight_urls, &mut frontier);
                break;
            }

            // Keep the pipe full up to the per-origin cap
            while in_flight.len() < self.settings.concurrency {
                let Some((url, depth)) = frontier.pop_front() else {
                    break;
                };

                if visited.contains(&url) {
                    debug!("Skipping already-visited sitemap {}", url);
                    crawl.skipped_cycles.push(url);
                    continue;
                }
                visited.insert(url.clone());

                if depth > self.settings.max_depth {
                    warn!("Sitemap {} exceeds depth limit {}", url, self.settings.max_depth);
                    crawl.failures.push(NodeFailure {
                        url,
                        attempts: 0,
                        error: TraversalError::DepthExceeded(self.settings.max_depth).into(),
                    });
                    continue;
                }

                in_flight_urls.insert(url.clone());
                in_flight.push(self.fetch_node(url, depth));
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    // Dropping in_flight abandons the fetches; everything
                    // still pending is reported as cancelled.
                    record_cancelled(&mut crawl, &mut in_flight_urls, &mut frontier);
                    break;
                }
                Some(outcome) = in_flight.next() => {
                    let NodeOutcome { url, depth, attempts, result } = outcome;
                    in_flight_urls.remove(&url);

                    match result {
                        Ok(SitemapNode::Index(children)) => {
                            crawl.sitemaps_visited += 1;
                            debug!("Index {} expands to {} child sitemaps", url, children.len());
                            for child in children {
                                frontier.push_back((child, depth + 1));
                            }
                        }
                        Ok(SitemapNode::UrlSet(leaves)) => {
                            crawl.sitemaps_visited += 1;
                            crawl.pages_seen += leaves.len();
                            for leaf in leaves {
                                if self.classifier.classify(&leaf) {
                                    crawl.product_urls.push(leaf);
                                }
                            }
                        }
                        Err(error) => {
                            warn!("Sitemap node {} failed after {} attempt(s): {}", url, attempts, error);
                            crawl.failures.push(NodeFailure { url, attempts, error });
                        }
                    }
                }
            }
        }

        info!(
            "Traversal of {} complete: {} product URLs, {} sitemaps, {} failures",
            crawl.domain,
            crawl.product_urls.len(),
            crawl.sitemaps_visited,
            crawl.failures.len()
        );
        crawl
    }

    /// Fetch and parse one sitemap node, retrying transient fetch
    /// errors with a linear backoff. HTTP status and parse errors are
    /// never retried.
    async fn fetch_node(&self, url: String, depth: usize) -> NodeOutcome {
        let parsed = match Url::parse(&url) {
            Ok(u) => u,
            Err(e) => {
                return NodeOutcome {
                    url,
                    depth,
                    attempts: 0,
                    result: Err(ParseError::Malformed(format!("invalid sitemap URL: {}", e))
                        .into()),
                };
            }
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            debug!("Node {} state: fetching (attempt {})", url, attempts);

            match self.fetcher.fetch(&parsed).await {
                Ok(body) => {
                    debug!("Node {} state: parsed", url);
                    let result = sitemap::parse(&body).map_err(CrawlError::from);
                    if let Ok(node) = &result {
                        match node {
                            SitemapNode::Index(_) => debug!("Node {} state: expanding", url),
                            SitemapNode::UrlSet(_) => debug!("Node {} state: classifying", url),
                        }
                    }
                    return NodeOutcome {
                        url,
                        depth,
                        attempts,
                        result,
                    };
                }
                Err(e) if e.is_transient() && attempts <= self.settings.max_retries => {
                    debug!("Transient failure on {} (attempt {}): {}", url, attempts, e);
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            return NodeOutcome {
                                url,
                                depth,
                                attempts,
                                result: Err(TraversalError::Cancelled.into()),
                            };
                        }
                        _ = tokio::time::sleep(self.settings.retry_backoff * attempts) => {}
                    }
                }
                Err(e) => {
                    return NodeOutcome {
                        url,
                        depth,
                        attempts,
                        result: Err(e.into()),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn engine() -> TraversalEngine {
        let settings = TraversalSettings {
            fetch_timeout: Duration::from_secs(2),
            retry_backoff: Duration::from_millis(10),
            ..TraversalSettings::default()
        };
        TraversalEngine::new(settings, ProductClassifier::default())
    }

    fn urlset<S: AsRef<str>>(urls: &[S]) -> String {
        let entries: String = urls
            .iter()
            .map(|u| format!("<url><loc>{}</loc></url>", u.as_ref()))
            .collect();
        format!(
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
            entries
        )
    }

    fn index<S: AsRef<str>>(children: &[S]) -> String {
        let entries: String = children
            .iter()
            .map(|u| format!("<sitemap><loc>{}</loc></sitemap>", u.as_ref()))
            .collect();
        format!(
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
            entries
        )
    }

    async fn mount_xml(server: &MockServer, at: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/xml")
                    .set_body_string(body),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_nested_index_classifies_products() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        mount_xml(
            &mock_server,
            "/sitemap.xml",
            index(&[
                &format!("{}/products.xml", base),
                &format!("{}/pages.xml", base),
            ]),
        )
        .await;
        mount_xml(
            &mock_server,
            "/products.xml",
            urlset(&[
                &format!("{}/product/1", base),
                &format!("{}/product/2", base),
            ]),
        )
        .await;
        mount_xml(
            &mock_server,
            "/pages.xml",
            urlset(&[&format!("{}/about", base), &format!("{}/item/3", base)]),
        )
        .await;

        let crawl = engine().run(&Url::parse(&base).unwrap()).await;

        assert_eq!(crawl.product_urls.len(), 3);
        assert!(crawl.failures.is_empty());
        assert_eq!(crawl.sitemaps_visited, 3);
        assert_eq!(crawl.pages_seen, 4);
        assert!(!crawl.is_total_failure());
    }

    #[tokio::test]
    async fn test_self_referential_index_terminates() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();
        let root = format!("{}/sitemap.xml", base);

        mount_xml(&mock_server, "/sitemap.xml", index(&[&root])).await;

        let crawl = engine().run(&Url::parse(&base).unwrap()).await;

        assert_eq!(crawl.sitemaps_visited, 1);
        assert_eq!(crawl.skipped_cycles, vec![root]);
        assert!(crawl.failures.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_sibling_results() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        mount_xml(
            &mock_server,
            "/sitemap.xml",
            index(&[
                &format!("{}/good.xml", base),
                &format!("{}/missing.xml", base),
            ]),
        )
        .await;
        mount_xml(
            &mock_server,
            "/good.xml",
            urlset(&[&format!("{}/shop/widget", base)]),
        )
        .await;
        // /missing.xml is not mounted: wiremock answers 404

        let crawl = engine().run(&Url::parse(&base).unwrap()).await;

        assert_eq!(crawl.product_urls, vec![format!("{}/shop/widget", base)]);
        assert_eq!(crawl.failures.len(), 1);
        assert_eq!(
            crawl.failures[0].error,
            CrawlError::Fetch(FetchError::HttpStatus(404))
        );
        assert!(!crawl.is_total_failure());
    }

    #[tokio::test]
    async fn test_root_404_is_domain_level_failure() {
        let mock_server = MockServer::start().await;

        let crawl = engine()
            .run(&Url::parse(&mock_server.uri()).unwrap())
            .await;

        assert!(crawl.product_urls.is_empty());
        assert_eq!(crawl.failures.len(), 1);
        assert!(crawl.failures[0].url.ends_with("/sitemap.xml"));
        assert!(crawl.is_total_failure());
    }

    #[tokio::test]
    async fn test_depth_limit_records_failure() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        mount_xml(
            &mock_server,
            "/sitemap.xml",
            index(&[&format!("{}/deep.xml", base)]),
        )
        .await;
        mount_xml(
            &mock_server,
            "/deep.xml",
            urlset(&[&format!("{}/product/1", base)]),
        )
        .await;

        let settings = TraversalSettings {
            max_depth: 0,
            fetch_timeout: Duration::from_secs(2),
            ..TraversalSettings::default()
        };
        let engine = TraversalEngine::new(settings, ProductClassifier::default());
        let crawl = engine.run(&Url::parse(&base).unwrap()).await;

        assert!(crawl.product_urls.is_empty());
        assert_eq!(crawl.failures.len(), 1);
        assert_eq!(
            crawl.failures[0].error,
            CrawlError::Traversal(TraversalError::DepthExceeded(0))
        );
    }

    #[tokio::test]
    async fn test_transient_timeout_is_retried() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        // First request stalls past the client timeout, then the mock
        // expires and the healthy one takes over.
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(urlset(&["ignored"]))
                    .set_delay(Duration::from_secs(5)),
            )
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        mount_xml(
            &mock_server,
            "/sitemap.xml",
            urlset(&[&format!("{}/item/42", base)]),
        )
        .await;

        let settings = TraversalSettings {
            fetch_timeout: Duration::from_millis(200),
            retry_backoff: Duration::from_millis(10),
            ..TraversalSettings::default()
        };
        let engine = TraversalEngine::new(settings, ProductClassifier::default());
        let crawl = engine.run(&Url::parse(&base).unwrap()).await;

        assert_eq!(crawl.product_urls, vec![format!("{}/item/42", base)]);
        assert!(crawl.failures.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_child_url_is_recorded() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        mount_xml(&mock_server, "/sitemap.xml", index(&["not-an-absolute-url"])).await;

        let crawl = engine().run(&Url::parse(&base).unwrap()).await;

        assert_eq!(crawl.failures.len(), 1);
        assert_eq!(crawl.failures[0].url, "not-an-absolute-url");
        assert!(matches!(
            crawl.failures[0].error,
            CrawlError::Parse(ParseError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_requests() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&["x"])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let token = CancellationToken::new();
        token.cancel();

        let engine = engine().with_cancellation(token);
        let crawl = engine
            .run(&Url::parse(&mock_server.uri()).unwrap())
            .await;

        assert_eq!(crawl.failures.len(), 1);
        assert_eq!(
            crawl.failures[0].error,
            CrawlError::Traversal(TraversalError::Cancelled)
        );
    }
}
