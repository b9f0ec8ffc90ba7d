use crate::error::FetchError;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// One HTTP GET per call, typed failures out. A pure I/O primitive:
/// retry policy belongs to the traversal engine.
pub struct SitemapFetcher {
    client: Client,
    max_response_bytes: usize,
}

impl SitemapFetcher {
    pub fn new(timeout: Duration, max_response_bytes: usize) -> Self {
        let client = Client::builder()
            .user_agent("Shopmap/0.2 (https://github.com/trapdoorsec/shopmap)")
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            max_response_bytes,
        }
    }

    /// Fetch a sitemap document. Non-2xx statuses are `HttpStatus`
    /// failures; bodies over the byte ceiling are rejected before they
    /// are fully buffered.
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        debug!("Fetching {}", url);

        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if let Some(declared) = response.content_length()
            && declared as usize > self.max_response_bytes
        {
            return Err(FetchError::TooLarge {
                limit: self.max_response_bytes,
            });
        }

        // Stream the body so a lying or absent Content-Length still
        // cannot blow past the ceiling.
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify_reqwest_error)? {
            if body.len() + chunk.len() > self.max_response_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_response_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::ConnectionFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn fetcher() -> SitemapFetcher {
        SitemapFetcher::new(Duration::from_secs(2), 1024)
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<urlset></urlset>"))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/sitemap.xml", mock_server.uri())).unwrap();
        let body = fetcher().fetch(&url).await.unwrap();
        assert_eq!(body, "<urlset></urlset>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/sitemap.xml", mock_server.uri())).unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert_eq!(err, FetchError::HttpStatus(404));
    }

    #[tokio::test]
    async fn test_fetch_body_over_ceiling() {
        let mock_server = MockServer::start().await;

        let oversized = "x".repeat(4096);
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(oversized))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/sitemap.xml", mock_server.uri())).unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert_eq!(err, FetchError::TooLarge { limit: 1024 });
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<urlset></urlset>")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let slow = SitemapFetcher::new(Duration::from_millis(200), 1024);
        let url = Url::parse(&format!("{}/sitemap.xml", mock_server.uri())).unwrap();
        let err = slow.fetch(&url).await.unwrap_err();
        assert_eq!(err, FetchError::Timeout);
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Port 1 is never listening locally
        let url = Url::parse("http://127.0.0.1:1/sitemap.xml").unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::ConnectionFailed(_)));
        assert!(err.is_transient());
    }
}
