//! OpenAI-compatible chat completion client (Groq).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use ideascope_shared::{IdeaScopeError, Result};

use crate::{CompletionProvider, CompletionRequest, build_client, endpoint, error_for_status, network_error};

const PROVIDER: &str = "groq";

/// Chat completion client for an OpenAI-compatible `/chat/completions` API.
pub struct GroqClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl GroqClient {
    /// Create a client rooted at `base_url` (e.g. `https://api.groq.com/openai/v1`).
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint: endpoint(base_url, "chat/completions")?,
            api_key: api_key.into(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for GroqClient {
    #[instrument(skip_all, fields(model = request.model))]
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = ChatBody {
            model: request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let response = error_for_status(PROVIDER, response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| IdeaScopeError::parse(format!("{PROVIDER}: invalid completion body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request<'a>() -> CompletionRequest<'a> {
        CompletionRequest {
            model: "llama-3.1-8b-instant",
            system: "You rephrase.",
            user: "Rephrase: sneakers",
            temperature: 0.3,
            max_tokens: 500,
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama-3.1-8b-instant",
                "max_tokens": 500
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "What is the market for resale sneakers?" } }]
            })))
            .mount(&server)
            .await;

        let client = GroqClient::new(&server.uri(), "test-key", 5).unwrap();
        let text = client.complete(&request()).await.unwrap();
        assert_eq!(text, "What is the market for resale sneakers?");
    }

    #[tokio::test]
    async fn empty_choices_yield_empty_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = GroqClient::new(&server.uri(), "test-key", 5).unwrap();
        assert_eq!(client.complete(&request()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn non_success_status_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit reached" }
            })))
            .mount(&server)
            .await;

        let client = GroqClient::new(&server.uri(), "test-key", 5).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, IdeaScopeError::Provider { .. }));
        assert_eq!(err.upstream_message(), "HTTP 429: Rate limit reached");
    }
}
