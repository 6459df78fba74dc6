//! External collaborators: mail transport, AI responder, web search, and
//! document text extraction. Each sits behind an async trait so handlers and
//! tests never depend on a concrete HTTP client.

pub mod extractor;
pub mod mailer;
pub mod responder;
pub mod search;

use std::time::Duration;

pub use extractor::{DocumentExtractor, HttpExtractor};
pub use mailer::{HttpMailer, Mailer};
pub use responder::{HttpResponder, Responder};
pub use search::{HttpSearch, SearchProvider};

/// Failure of an external collaborator. Display strings stay generic: they
/// may end up in client-visible 502 bodies, so no URLs, keys, or upstream
/// payloads.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} request failed")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned status {status}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("{service} response was malformed")]
    Malformed { service: &'static str },
}

/// Shared client for all collaborators; every request is bounded by the
/// timeout.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
}
