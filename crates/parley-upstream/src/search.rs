use async_trait::async_trait;

use crate::UpstreamError;

const SERVICE: &str = "search";

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs a web search and returns the provider's structured result as-is.
    async fn search(&self, query: &str) -> Result<serde_json::Value, UpstreamError>;
}

/// SerpAPI-style GET client. The API key travels as a query parameter, never
/// in the result handed back to callers.
pub struct HttpSearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSearch {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider for HttpSearch {
    async fn search(&self, query: &str) -> Result<serde_json::Value, UpstreamError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| UpstreamError::Request { service: SERVICE, source: source.without_url() })?;

        if !resp.status().is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: resp.status(),
            });
        }

        resp.json()
            .await
            .map_err(|_| UpstreamError::Malformed { service: SERVICE })
    }
}
