//! Schema-constrained generation stages.
//!
//! Each stage turns `(idea, base result, profile)` into one [`Fragment`].
//! Stages never see each other's output, so they can run in any order.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use ideascope_providers::{GenerationProvider, GenerationRequest, Sampling};
use ideascope_shared::{
    BaseResult, FitItem, FounderFitFragment, Fragment, IdeaScopeError, MvpFragment,
    PitchFragment, Result, RevenueFragment, UserProfile, clamp_score,
};

use crate::prompts;
use crate::schema::{SchemaId, SchemaRegistry};

/// Number of positive and negative founder-fit items in a response.
pub const FIT_ITEMS: usize = 3;

const TOP_K: u32 = 40;
const TOP_P: f32 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 1024;

// ---------------------------------------------------------------------------
// StageKind / StageConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Pitch,
    RevenueModels,
    Mvp,
    FounderFit,
}

impl StageKind {
    /// Reference order, also the sequential execution order.
    pub const ALL: [StageKind; 4] = [Self::Pitch, Self::RevenueModels, Self::Mvp, Self::FounderFit];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pitch => "pitch",
            Self::RevenueModels => "revenue models",
            Self::Mvp => "mvp",
            Self::FounderFit => "founder fit",
        }
    }

    pub fn schema(&self) -> SchemaId {
        match self {
            Self::Pitch => SchemaId::Pitch,
            Self::RevenueModels => SchemaId::RevenueModels,
            Self::Mvp => SchemaId::Mvp,
            Self::FounderFit => SchemaId::FounderFit,
        }
    }

    fn temperature(&self) -> f32 {
        match self {
            Self::FounderFit => 0.5,
            _ => 0.7,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable per-stage call parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub kind: StageKind,
    pub model: String,
    pub sampling: Sampling,
    pub schema: SchemaId,
}

impl StageConfig {
    pub fn for_stage(kind: StageKind, model: &str) -> Self {
        Self {
            kind,
            model: model.to_string(),
            sampling: Sampling {
                temperature: kind.temperature(),
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            schema: kind.schema(),
        }
    }
}

/// What every stage is allowed to read.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    pub idea: &'a str,
    pub base: &'a BaseResult,
    pub profile: Option<&'a UserProfile>,
}

// ---------------------------------------------------------------------------
// StageRunner
// ---------------------------------------------------------------------------

/// Runs generation stages against one provider.
pub struct StageRunner {
    provider: Arc<dyn GenerationProvider>,
    registry: Arc<SchemaRegistry>,
    configs: [StageConfig; 4],
}

impl StageRunner {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        registry: Arc<SchemaRegistry>,
        model: &str,
    ) -> Self {
        Self {
            provider,
            registry,
            configs: StageKind::ALL.map(|kind| StageConfig::for_stage(kind, model)),
        }
    }

    pub fn config(&self, kind: StageKind) -> &StageConfig {
        &self.configs[kind.index()]
    }

    /// Submit `(prompt, schema)` and decode the answer into `T`.
    pub async fn structured_generate<T: DeserializeOwned>(
        &self,
        config: &StageConfig,
        prompt: &str,
    ) -> Result<T> {
        let request = GenerationRequest {
            model: &config.model,
            prompt,
            schema: self.registry.get(config.schema),
            sampling: config.sampling,
        };
        let text = self.provider.generate_structured(&request).await?;

        serde_json::from_str(strip_fences(&text)).map_err(|e| {
            IdeaScopeError::parse(format!("{} response is not valid JSON for its schema: {e}", config.schema))
        })
    }

    /// Build the stage prompt, call the provider, and check the result.
    #[instrument(skip_all, fields(stage = kind.name()))]
    pub async fn run(&self, kind: StageKind, input: &StageInput<'_>) -> Result<Fragment> {
        let config = self.config(kind);
        debug!(model = %config.model, temperature = config.sampling.temperature, "stage started");

        let fragment = match kind {
            StageKind::Pitch => {
                let prompt = prompts::pitch_prompt(input.idea, input.base, input.profile);
                Fragment::Pitch(check_pitch(self.structured_generate(config, &prompt).await?)?)
            }
            StageKind::RevenueModels => {
                let prompt = prompts::revenue_prompt(input.idea, input.base, input.profile);
                Fragment::Revenue(check_revenue(self.structured_generate(config, &prompt).await?)?)
            }
            StageKind::Mvp => {
                let prompt = prompts::mvp_prompt(input.idea, input.base, input.profile);
                Fragment::Mvp(check_mvp(self.structured_generate(config, &prompt).await?)?)
            }
            StageKind::FounderFit => {
                let prompt = prompts::founder_fit_prompt(input.idea, input.base, input.profile);
                Fragment::FounderFit(check_founder_fit(self.structured_generate(config, &prompt).await?)?)
            }
        };

        info!("stage complete");
        Ok(fragment)
    }
}

/// Some models wrap JSON in a Markdown fence even in JSON mode.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

// ---------------------------------------------------------------------------
// Fragment checks
// ---------------------------------------------------------------------------

fn check_pitch(fragment: PitchFragment) -> Result<PitchFragment> {
    if fragment.pitch.trim().is_empty() {
        return Err(IdeaScopeError::validation("pitch is empty"));
    }
    Ok(fragment)
}

fn check_revenue(fragment: RevenueFragment) -> Result<RevenueFragment> {
    if fragment.revenue_models.is_empty() {
        return Err(IdeaScopeError::validation("no revenue models returned"));
    }
    Ok(fragment)
}

fn check_mvp(fragment: MvpFragment) -> Result<MvpFragment> {
    if fragment.mvp_design.trim().is_empty() {
        return Err(IdeaScopeError::validation("MVP design is empty"));
    }
    if fragment.mvp_features.is_empty() {
        return Err(IdeaScopeError::validation("no MVP features returned"));
    }
    Ok(fragment)
}

/// Clamp the score and enforce exactly [`FIT_ITEMS`] items per side.
/// Extra items are dropped; too few is an error.
fn check_founder_fit(mut fragment: FounderFitFragment) -> Result<FounderFitFragment> {
    fragment.founderfitscore = clamp_score(fragment.founderfitscore);
    fit_items("positivefounderfit", &mut fragment.positivefounderfit)?;
    fit_items("negativefounderfit", &mut fragment.negativefounderfit)?;
    Ok(fragment)
}

fn fit_items(field: &str, items: &mut Vec<FitItem>) -> Result<()> {
    if items.len() < FIT_ITEMS {
        return Err(IdeaScopeError::validation(format!(
            "{field} has {} items, expected {FIT_ITEMS}",
            items.len()
        )));
    }
    if items.len() > FIT_ITEMS {
        warn!(field, count = items.len(), "truncating founder fit items");
        items.truncate(FIT_ITEMS);
    }
    Ok(())
}
