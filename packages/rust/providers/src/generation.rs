//! Schema-constrained generation client (Gemini `generateContent`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use ideascope_shared::{IdeaScopeError, Result};

use crate::{
    GenerationProvider, GenerationRequest, build_client, endpoint, error_for_status, network_error,
};

const PROVIDER: &str = "gemini";

/// Client for the Generative Language API.
pub struct GeminiClient {
    client: Client,
    models_root: Url,
    api_key: String,
}

impl GeminiClient {
    /// Create a client rooted at `base_url`
    /// (e.g. `https://generativelanguage.googleapis.com/v1beta`).
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            models_root: endpoint(base_url, "models")?,
            api_key: api_key.into(),
        })
    }

    fn generate_url(&self, model: &str) -> Result<Url> {
        endpoint(self.models_root.as_str(), &format!("{model}:generateContent"))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfigBody<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody<'a> {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    response_schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String> {
        let blocked = self
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|reason| format!("prompt blocked: {reason}"));

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(IdeaScopeError::provider(
                PROVIDER,
                blocked.unwrap_or_else(|| "response contained no candidates".into()),
            ));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
            return Err(IdeaScopeError::provider(
                PROVIDER,
                format!("empty candidate (finish reason {reason})"),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    #[instrument(skip_all, fields(model = request.model))]
    async fn generate_structured(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let body = GenerateBody {
            contents: [Content {
                role: "user",
                parts: [Part {
                    text: request.prompt,
                }],
            }],
            generation_config: GenerationConfigBody {
                temperature: request.sampling.temperature,
                top_k: request.sampling.top_k,
                top_p: request.sampling.top_p,
                max_output_tokens: request.sampling.max_output_tokens,
                response_mime_type: "application/json",
                response_schema: request.schema,
            },
        };

        let response = self
            .client
            .post(self.generate_url(request.model)?)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let response = error_for_status(PROVIDER, response).await?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| IdeaScopeError::parse(format!("{PROVIDER}: invalid generation body: {e}")))?;

        let text = parsed.into_text()?;
        debug!(chars = text.len(), "structured generation received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sampling;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLING: Sampling = Sampling {
        temperature: 0.5,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 1024,
    };

    #[tokio::test]
    async fn posts_schema_and_joins_parts() {
        let server = MockServer::start().await;
        let schema = serde_json::json!({ "type": "OBJECT", "properties": { "pitch": { "type": "STRING" } } });

        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "gm-key"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {
                    "topK": 40,
                    "maxOutputTokens": 1024,
                    "responseMimeType": "application/json",
                    "responseSchema": schema.clone(),
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "{\"pitch\":" }, { "text": "\"Go.\"}" }] },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&server.uri(), "gm-key", 5).unwrap();
        let request = GenerationRequest {
            model: "gemini-1.5-flash",
            prompt: "Write a pitch",
            schema: &schema,
            sampling: SAMPLING,
        };
        let text = client.generate_structured(&request).await.unwrap();
        assert_eq!(text, r#"{"pitch":"Go."}"#);
    }

    #[tokio::test]
    async fn blocked_prompt_is_provider_error() {
        let server = MockServer::start().await;
        let schema = serde_json::json!({ "type": "OBJECT" });

        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&server.uri(), "gm-key", 5).unwrap();
        let request = GenerationRequest {
            model: "gemini-1.5-flash",
            prompt: "p",
            schema: &schema,
            sampling: SAMPLING,
        };
        let err = client.generate_structured(&request).await.unwrap_err();
        assert_eq!(err.upstream_message(), "prompt blocked: SAFETY");
    }

    #[tokio::test]
    async fn server_error_carries_status() {
        let server = MockServer::start().await;
        let schema = serde_json::json!({ "type": "OBJECT" });

        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&server.uri(), "gm-key", 5).unwrap();
        let request = GenerationRequest {
            model: "gemini-1.5-flash",
            prompt: "p",
            schema: &schema,
            sampling: SAMPLING,
        };
        let err = client.generate_structured(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "gemini error: HTTP 503: The model is overloaded.");
    }
}
