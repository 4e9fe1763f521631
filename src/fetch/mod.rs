//! Resource retrieval.
//!
//! Components are plain text resources fetched with a GET. The [`Fetcher`]
//! trait hides where they come from:
//! - [`HttpFetcher`]: a site served over HTTP
//! - [`DirFetcher`]: a site directory on the local file system
//! - [`MemoryFetcher`]: an in-memory site, with request accounting

mod dir;
mod http;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use dir::DirFetcher;
pub use http::HttpFetcher;
pub use memory::MemoryFetcher;

/// Resource retrieval errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected status {status} for {location}")]
    Status { status: u16, location: String },

    #[error("Failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid resource location: {0}")]
    InvalidLocation(String),

    #[error("Timed out fetching {0}")]
    TimedOut(String),
}

/// Source of component resources.
///
/// `location` is a site-relative path such as `routes/home/home.html`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError>;
}

/// Where a site's resources come from, as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Http(String),
    Dir(std::path::PathBuf),
}

impl Source {
    /// `http://` and `https://` locations are served remotely, anything else is a directory.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Http(raw.to_string())
        } else {
            Self::Dir(raw.into())
        }
    }

    pub fn into_fetcher(self) -> std::sync::Arc<dyn Fetcher> {
        match self {
            Self::Http(base_url) => std::sync::Arc::new(HttpFetcher::new(base_url)),
            Self::Dir(root) => std::sync::Arc::new(DirFetcher::new(root)),
        }
    }
}
