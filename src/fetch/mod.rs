//! Link extraction from fetched pages
//!
//! The crawl workers depend only on the [`LinkProvider`] trait: given an
//! absolute URL, return the finite set of absolute URLs linked from that
//! page, or fail. The production implementation fetches over HTTP; tests
//! substitute a scripted provider.

mod http;

pub use http::HttpLinkProvider;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from resolving a page into its outgoing links
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("expected HTML for {url}, got {content_type}")]
    NotHtml { url: String, content_type: String },
}

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Resolves an absolute URL into the absolute URLs it links to
///
/// Implementations must be side-effect free from the crawler's point of
/// view: no store access, no shared crawl state.
#[async_trait]
pub trait LinkProvider: Send + Sync {
    async fn links(&self, url: &str) -> FetchResult<Vec<String>>;
}
