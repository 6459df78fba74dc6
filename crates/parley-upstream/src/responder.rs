use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::UpstreamError;

const SERVICE: &str = "responder";

#[async_trait]
pub trait Responder: Send + Sync {
    /// Produces a completion for the prompt.
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError>;
}

// Chat-completions wire format (OpenAI-compatible endpoints).

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

pub struct HttpResponder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpResponder {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                max_tokens: 1024,
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

        let body: CompletionResponse = resp
            .json()
            .await
            .map_err(|_| UpstreamError::Malformed { service: SERVICE })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(UpstreamError::Malformed { service: SERVICE })?;

        Ok(text.trim().to_string())
    }
}
