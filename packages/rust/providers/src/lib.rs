//! HTTP clients for the external providers IdeaScope depends on.
//!
//! Three black-box capabilities sit behind traits so the pipeline can be
//! driven by fakes in tests:
//! - [`CompletionProvider`]: free-text chat completion (Groq), best-effort
//! - [`SearchProvider`]: schema-constrained web research (Linkup)
//! - [`GenerationProvider`]: schema-constrained generation (Gemini)
//!
//! The concrete clients are stateless apart from their `reqwest::Client`
//! and are shared across requests behind `Arc`.

mod completion;
mod generation;
mod search;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use ideascope_shared::{IdeaScopeError, Mode, Result};

pub use completion::GroqClient;
pub use generation::GeminiClient;
pub use search::{DateWindow, LinkupClient};

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("IdeaScope/", env!("CARGO_PKG_VERSION"));

/// Longest slice of a non-JSON error body echoed into an error message.
const MAX_ERROR_BODY: usize = 200;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A system + user chat completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A structured research query.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub depth: Mode,
    /// JSON Schema the provider must answer with.
    pub schema: &'a serde_json::Value,
    pub include_images: bool,
    pub window: &'a DateWindow,
}

/// Fixed sampling parameters for a structured generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

/// A prompt plus the response schema the output must conform to.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub schema: &'a serde_json::Value,
    pub sampling: Sampling,
}

// ---------------------------------------------------------------------------
// Provider traits
// ---------------------------------------------------------------------------

/// Free-text chat completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Return the assistant message text (may be empty).
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
}

/// Schema-constrained search over a fixed date window.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Return the structured JSON answer.
    async fn structured_search(&self, request: &SearchRequest<'_>) -> Result<serde_json::Value>;
}

/// Schema-constrained text generation.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Return the raw response text, which is JSON conforming to the schema.
    async fn generate_structured(&self, request: &GenerationRequest<'_>) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with the shared settings.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| IdeaScopeError::Network(format!("failed to build HTTP client: {e}")))
}

/// Validate a configured API root and join `path` onto it.
fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let base = Url::parse(base_url)
        .map_err(|e| IdeaScopeError::config(format!("invalid base URL '{base_url}': {e}")))?;
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined)
        .map_err(|e| IdeaScopeError::config(format!("invalid endpoint '{joined}': {e}")))
}

/// Turn a non-2xx response into a provider error carrying the status and
/// the provider's own message.
async fn error_for_status(provider: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = extract_error_message(&body);
    Err(IdeaScopeError::provider(
        provider,
        format!("HTTP {}: {detail}", status.as_u16()),
    ))
}

/// Pull a human-readable message out of a provider error body.
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}` and
/// `{"message": ..}`; anything else is echoed, truncated.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let candidates = [
            value.pointer("/error/message"),
            value.get("error").filter(|e| e.is_string()),
            value.get("message"),
        ];
        if let Some(msg) = candidates.into_iter().flatten().find_map(|v| v.as_str()) {
            return msg.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".into();
    }
    let mut end = trimmed.len().min(MAX_ERROR_BODY);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

/// Map a transport failure, keeping timeouts distinguishable in logs.
fn network_error(provider: &str, err: reqwest::Error) -> IdeaScopeError {
    if err.is_timeout() {
        IdeaScopeError::Network(format!("{provider}: request timed out"))
    } else {
        IdeaScopeError::Network(format!("{provider}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_error_message() {
        let body = r#"{"error":{"code":401,"message":"API key not valid","status":"UNAUTHENTICATED"}}"#;
        assert_eq!(extract_error_message(body), "API key not valid");
    }

    #[test]
    fn extracts_flat_error_messages() {
        assert_eq!(extract_error_message(r#"{"error":"rate limited"}"#), "rate limited");
        assert_eq!(extract_error_message(r#"{"message":"bad depth"}"#), "bad depth");
    }

    #[test]
    fn truncates_plain_bodies() {
        let body = "x".repeat(500);
        assert_eq!(extract_error_message(&body).len(), MAX_ERROR_BODY);
        assert_eq!(extract_error_message("   "), "empty response body");
    }

    #[test]
    fn endpoint_joins_paths() {
        let url = endpoint("https://api.groq.com/openai/v1/", "chat/completions").unwrap();
        assert_eq!(url.as_str(), "https://api.groq.com/openai/v1/chat/completions");
        assert!(endpoint("not a url", "search").is_err());
    }
}
