//! HTTP fetcher for sites served over the network.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{FetchError, Fetcher};

/// Fetches resources relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
    client: Client,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create with an explicit client (custom timeouts, proxies, ...).
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, location: &str) -> String {
        format!("{}/{}", self.base_url, location.trim_start_matches('/'))
    }

    /// Convert a response into its body, mapping unsuccessful statuses to errors.
    async fn handle_response(
        &self,
        location: &str,
        response: reqwest::Response,
    ) -> Result<Vec<u8>, FetchError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            match status {
                StatusCode::NOT_FOUND => Err(FetchError::NotFound(location.to_string())),
                _ => Err(FetchError::Status {
                    status: status.as_u16(),
                    location: location.to_string(),
                }),
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url(location);
        tracing::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        self.handle_response(location, response).await
    }
}
