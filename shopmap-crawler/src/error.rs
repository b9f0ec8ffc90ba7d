use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by a single sitemap fetch. No retry logic lives at
/// this level; the traversal engine decides what is worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("server returned HTTP {0}")]
    HttpStatus(u16),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("response exceeded the {limit} byte ceiling")]
    TooLarge { limit: usize },
}

impl FetchError {
    /// Timeouts and connection failures are transient; HTTP status and
    /// size rejections are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout | FetchError::ConnectionFailed(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseError {
    #[error("document contains no sitemap or url entries")]
    Empty,

    #[error("malformed sitemap markup: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraversalError {
    #[error("maximum sitemap depth {0} exceeded")]
    DepthExceeded(usize),

    #[error("traversal cancelled")]
    Cancelled,
}

/// Umbrella error carried in per-node failure records.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),
}

impl CrawlError {
    pub fn is_transient(&self) -> bool {
        match self {
            CrawlError::Fetch(e) => e.is_transient(),
            _ => false,
        }
    }
}
