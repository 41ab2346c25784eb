//! Best-effort query rephrasing before market research.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use ideascope_providers::{CompletionProvider, CompletionRequest};
use ideascope_shared::UserProfile;

use crate::prompts;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 500;

/// Turns a raw idea into a search-optimized query.
///
/// Never fails: any provider error or empty answer yields the input text.
pub struct QueryRephraser {
    provider: Option<Arc<dyn CompletionProvider>>,
    model: String,
}

impl QueryRephraser {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider: Some(provider),
            model: model.into(),
        }
    }

    /// A rephraser with no backing provider; returns the idea unchanged.
    pub fn passthrough() -> Self {
        Self {
            provider: None,
            model: String::new(),
        }
    }

    #[instrument(skip_all)]
    pub async fn rephrase(&self, idea: &str, profile: Option<&UserProfile>) -> String {
        let Some(provider) = &self.provider else {
            debug!("no completion provider configured, using original idea");
            return idea.to_string();
        };

        let prompt = prompts::rephrase_prompt(idea, profile);
        let request = CompletionRequest {
            model: &self.model,
            system: prompts::REPHRASE_SYSTEM,
            user: &prompt,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        match provider.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                let rephrased = text.trim().to_string();
                info!(original = idea, rephrased = %rephrased, "idea rephrased");
                rephrased
            }
            Ok(_) => {
                warn!("rephrase returned empty text, using original idea");
                idea.to_string()
            }
            Err(e) => {
                warn!(error = %e, "rephrase failed, using original idea");
                idea.to_string()
            }
        }
    }
}
