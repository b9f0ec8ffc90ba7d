pub mod classifier;
pub mod error;
pub mod fetcher;
pub mod result;
pub mod sitemap;
pub mod traversal;

pub use classifier::ProductClassifier;
pub use error::{CrawlError, FetchError, ParseError, TraversalError};
pub use fetcher::SitemapFetcher;
pub use result::{DomainCrawl, NodeFailure};
pub use sitemap::SitemapNode;
pub use traversal::{TraversalEngine, TraversalSettings};
