use async_trait::async_trait;

use crate::UpstreamError;

const SERVICE: &str = "extractor";

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extracts plain text from a binary document (PDF and friends).
    async fn extract(&self, data: Vec<u8>) -> Result<String, UpstreamError>;
}

/// Client for an HTTP text-extraction service (Tika-style: PUT the bytes,
/// get plain text back).
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExtractor {
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl DocumentExtractor for HttpExtractor {
    async fn extract(&self, data: Vec<u8>) -> Result<String, UpstreamError> {
        let resp = self
            .client
            .put(&self.endpoint)
            .header(reqwest::header::ACCEPT, "text/plain")
            .body(data)
            .send()
            .await
            .map_err(|source| UpstreamError::Request { service: SERVICE, source: source.without_url() })?;

        if !resp.status().is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: resp.status(),
            });
        }

        resp.text()
            .await
            .map_err(|_| UpstreamError::Malformed { service: SERVICE })
    }
}
