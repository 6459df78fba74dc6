use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::UpstreamError;

const SERVICE: &str = "mail";

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Submits a message for delivery. Success means the transport accepted
    /// it, not that it landed in an inbox.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), UpstreamError>;
}

#[derive(Serialize)]
struct OutboundMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Transactional-mail HTTP API client (Postmark/Mailgun-style JSON POST).
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    from: String,
}

impl HttpMailer {
    pub fn new(client: reqwest::Client, endpoint: String, token: String, from: String) -> Self {
        Self {
            client,
            endpoint,
            token,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), UpstreamError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&OutboundMail {
                from: &self.from,
                to,
                subject,
                text: body,
            })
            .send()
            .await
            .map_err(|source| UpstreamError::Request { service: SERVICE, source: source.without_url() })?;

        if !resp.status().is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: resp.status(),
            });
        }

        debug!("mail accepted for delivery to {}", to);
        Ok(())
    }
}
