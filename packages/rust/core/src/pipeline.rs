//! End-to-end evaluation pipeline: idea → rephrase → research → stages → compose.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use ideascope_providers::{GeminiClient, GroqClient, LinkupClient};
use ideascope_shared::{
    AppConfig, Fragment, IdeaScopeError, Mode, RequestId, Result, StageExecution, UserProfile,
    optional_api_key, require_api_key,
};

use crate::composer::{ComposedResult, compose};
use crate::rephrase::QueryRephraser;
use crate::research::{
    ExecutionMode, LiveMarketResearch, MarketResearchProvider, MockMarketResearch, ResearchQuery,
};
use crate::schema::SchemaRegistry;
use crate::stages::{StageInput, StageKind, StageRunner};

/// One evaluation request, as accepted by `POST /chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    /// The raw startup idea.
    pub message: String,
    /// Research depth label; `"Quick Search"` selects standard depth.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub personalized: bool,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
}

// ---------------------------------------------------------------------------
// State reporting
// ---------------------------------------------------------------------------

/// Pipeline states, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Rephrasing,
    MarketResearch,
    Generating(StageKind),
    SkippedFounderFit,
    Composing,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("Starting"),
            Self::Rephrasing => f.write_str("Rephrasing idea"),
            Self::MarketResearch => f.write_str("Researching market"),
            Self::Generating(kind) => write!(f, "Generating {kind}"),
            Self::SkippedFounderFit => f.write_str("Skipping founder fit"),
            Self::Composing => f.write_str("Composing result"),
            Self::Done => f.write_str("Done"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

/// Receives state transitions from a running pipeline.
pub trait PipelineObserver: Send + Sync {
    /// Called on every transition. In concurrent mode the `Generating`
    /// states for all stages arrive together.
    fn transition(&self, state: PipelineState);

    /// Called once after `Done`.
    fn done(&self, _result: &ComposedResult, _elapsed: Duration) {}
}

/// No-op observer for the server and tests.
pub struct SilentObserver;

impl PipelineObserver for SilentObserver {
    fn transition(&self, _state: PipelineState) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Shared, immutable evaluation pipeline. One instance serves every request.
pub struct Pipeline {
    rephraser: QueryRephraser,
    research: Arc<dyn MarketResearchProvider>,
    stages: StageRunner,
    stage_execution: StageExecution,
    degrade_on_stage_failure: bool,
}

impl Pipeline {
    pub fn new(
        rephraser: QueryRephraser,
        research: Arc<dyn MarketResearchProvider>,
        stages: StageRunner,
    ) -> Self {
        Self {
            rephraser,
            research,
            stages,
            stage_execution: StageExecution::default(),
            degrade_on_stage_failure: true,
        }
    }

    pub fn with_stage_execution(mut self, stage_execution: StageExecution) -> Self {
        self.stage_execution = stage_execution;
        self
    }

    /// Whether a stage failure in mock mode still returns the bare fixture.
    /// Has no effect in live mode.
    pub fn with_mock_degradation(mut self, enabled: bool) -> Self {
        self.degrade_on_stage_failure = enabled;
        self
    }

    /// Build every provider client from `config`.
    ///
    /// Fails when the schema registry is invalid, a required API key is
    /// missing, or the mock fixture cannot be loaded. A missing completion
    /// key only disables rephrasing.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = Arc::new(SchemaRegistry::load()?);
        let mode = ExecutionMode::from_mock_flag(config.mock.enabled);

        let rephraser = match optional_api_key(&config.completion.api_key_env) {
            Some(key) => {
                let client = GroqClient::new(
                    &config.completion.base_url,
                    key,
                    config.completion.timeout_secs,
                )?;
                QueryRephraser::new(Arc::new(client), config.completion.model.clone())
            }
            None => {
                warn!(
                    var = %config.completion.api_key_env,
                    "completion API key not set, rephrasing disabled"
                );
                QueryRephraser::passthrough()
            }
        };

        let research: Arc<dyn MarketResearchProvider> = match mode {
            ExecutionMode::Live => {
                let key = require_api_key("Linkup", &config.search.api_key_env)?;
                let client =
                    LinkupClient::new(&config.search.base_url, key, config.search.timeout_secs)?;
                Arc::new(LiveMarketResearch::new(Arc::new(client), registry.clone())?)
            }
            ExecutionMode::Mock => {
                let path = Path::new(&config.mock.fixture_path);
                info!(path = %path.display(), "loading mock research fixture");
                Arc::new(MockMarketResearch::from_path(path)?)
            }
        };

        let key = require_api_key("Gemini", &config.generation.api_key_env)?;
        let generator = GeminiClient::new(
            &config.generation.base_url,
            key,
            config.generation.timeout_secs,
        )?;
        let stages = StageRunner::new(Arc::new(generator), registry, &config.generation.model);

        info!(
            %mode,
            stage_execution = ?config.pipeline.stage_execution,
            "pipeline ready"
        );

        Ok(Self::new(rephraser, research, stages)
            .with_stage_execution(config.pipeline.stage_execution)
            .with_mock_degradation(config.mock.degrade_on_stage_failure))
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.research.execution_mode()
    }

    /// Run one evaluation.
    ///
    /// Live mode is all-or-nothing: any research or stage failure returns
    /// the error and no partial result.
    #[instrument(
        skip_all,
        fields(
            request_id = %RequestId::new(),
            mode = %self.execution_mode(),
            personalized = request.personalized
        )
    )]
    pub async fn evaluate(
        &self,
        request: &EvaluationRequest,
        observer: &dyn PipelineObserver,
    ) -> Result<ComposedResult> {
        let start = Instant::now();
        let depth = Mode::from_label(&request.model);
        let personalized = request.personalized;
        let profile = request.user_profile.as_ref();

        info!(%depth, "starting evaluation");
        observer.transition(PipelineState::Start);

        // --- Phase 1: Rephrase (never fails) ---
        observer.transition(PipelineState::Rephrasing);
        let rephrased = self.rephraser.rephrase(&request.message, profile).await;

        // --- Phase 2: Market research ---
        observer.transition(PipelineState::MarketResearch);
        let query = ResearchQuery {
            text: &rephrased,
            mode: depth,
            personalized,
            profile,
        };
        let base = match self.research.research(&query).await {
            Ok(base) => base.normalize(personalized),
            Err(e) => return Err(fail(observer, e.in_stage("market research"))),
        };

        // --- Phase 3: Generation stages ---
        let input = StageInput {
            idea: &request.message,
            base: &base,
            profile,
        };
        let fragments = match self.generate(&input, personalized, observer).await {
            Ok(fragments) => fragments,
            Err(e) if self.degrades() => {
                warn!(error = %e, "stage failed in mock mode, returning bare fixture");
                Vec::new()
            }
            Err(e) => return Err(fail(observer, e)),
        };

        // --- Phase 4: Compose ---
        observer.transition(PipelineState::Composing);
        let fragment_count = fragments.len();
        let composed = compose(&base, fragments).map_err(|e| fail(observer, e))?;

        observer.transition(PipelineState::Done);
        let elapsed = start.elapsed();
        info!(
            fragments = fragment_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "evaluation complete"
        );
        observer.done(&composed, elapsed);

        Ok(composed)
    }

    fn degrades(&self) -> bool {
        self.degrade_on_stage_failure && self.execution_mode() == ExecutionMode::Mock
    }

    async fn generate(
        &self,
        input: &StageInput<'_>,
        personalized: bool,
        observer: &dyn PipelineObserver,
    ) -> Result<Vec<Fragment>> {
        let fragments = match self.stage_execution {
            StageExecution::Concurrent => {
                let (pitch, revenue, mvp, founder_fit) = tokio::try_join!(
                    self.run_stage(StageKind::Pitch, input, observer),
                    self.run_stage(StageKind::RevenueModels, input, observer),
                    self.run_stage(StageKind::Mvp, input, observer),
                    async {
                        if personalized {
                            self.run_stage(StageKind::FounderFit, input, observer)
                                .await
                                .map(Some)
                        } else {
                            Ok(None)
                        }
                    },
                )?;
                let mut fragments = vec![pitch, revenue, mvp];
                fragments.extend(founder_fit);
                fragments
            }
            StageExecution::Sequential => {
                let mut fragments = Vec::with_capacity(StageKind::ALL.len());
                for kind in StageKind::ALL {
                    if kind == StageKind::FounderFit && !personalized {
                        continue;
                    }
                    fragments.push(self.run_stage(kind, input, observer).await?);
                }
                fragments
            }
        };

        if !personalized {
            observer.transition(PipelineState::SkippedFounderFit);
        }
        Ok(fragments)
    }

    async fn run_stage(
        &self,
        kind: StageKind,
        input: &StageInput<'_>,
        observer: &dyn PipelineObserver,
    ) -> Result<Fragment> {
        observer.transition(PipelineState::Generating(kind));
        self.stages
            .run(kind, input)
            .await
            .map_err(|e| e.in_stage(kind.name()))
    }
}

fn fail(observer: &dyn PipelineObserver, err: IdeaScopeError) -> IdeaScopeError {
    error!(error = %err, "evaluation failed");
    observer.transition(PipelineState::Failed);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeCompletion, FakeGeneration, FakeSearch, MOCK_RESEARCH, RecordingObserver, profile,
    };
    use serde_json::json;

    const IDEA: &str = "Build a marketplace for vintage sneakers";

    fn registry() -> Arc<SchemaRegistry> {
        Arc::new(SchemaRegistry::load().unwrap())
    }

    fn live(
        completion: FakeCompletion,
        search: Arc<FakeSearch>,
        generation: Arc<FakeGeneration>,
    ) -> Pipeline {
        let registry = registry();
        Pipeline::new(
            QueryRephraser::new(Arc::new(completion), "llama"),
            Arc::new(LiveMarketResearch::new(search, registry.clone()).unwrap()),
            StageRunner::new(generation, registry, "gemini"),
        )
    }

    fn mock(generation: Arc<FakeGeneration>) -> Pipeline {
        Pipeline::new(
            QueryRephraser::passthrough(),
            Arc::new(MockMarketResearch::from_json(MOCK_RESEARCH).unwrap()),
            StageRunner::new(generation, registry(), "gemini"),
        )
    }

    fn request(personalized: bool) -> EvaluationRequest {
        EvaluationRequest {
            message: IDEA.into(),
            model: "Comprehensive".into(),
            personalized,
            user_profile: personalized.then(profile),
        }
    }

    #[tokio::test]
    async fn standard_request_has_no_founder_fit() {
        let generation = Arc::new(FakeGeneration::new());
        let pipeline = live(
            FakeCompletion::reply("sneaker resale market"),
            Arc::new(FakeSearch::fixture()),
            generation.clone(),
        );

        let result = pipeline.evaluate(&request(false), &SilentObserver).await.unwrap();
        assert_eq!(result.get("personalizedstatus").unwrap(), false);
        assert!(result.keys().all(|k| !k.starts_with("founderfit")));
        assert!(!result.contains_key("positivefounderfit"));
        for key in ["pitch", "revenueModels", "mvpDesign", "mvpFeatures"] {
            assert!(result.contains_key(key), "missing {key}");
        }
        assert_eq!(generation.calls().len(), 3);
    }

    #[tokio::test]
    async fn personalized_request_has_bounded_founder_fit() {
        let generation = Arc::new(FakeGeneration::new().answering(
            "founderfit",
            json!({
                "founderfit": "You know sneakers.",
                "founderfitscore": 0,
                "positivefounderfit": [
                    { "skill": "a", "description": "x" },
                    { "skill": "b", "description": "x" },
                    { "skill": "c", "description": "x" },
                    { "skill": "d", "description": "x" }
                ],
                "negativefounderfit": [
                    { "skill": "e", "description": "x" },
                    { "skill": "f", "description": "x" },
                    { "skill": "g", "description": "x" }
                ]
            }),
        ));
        let pipeline = live(
            FakeCompletion::reply("sneaker resale market"),
            Arc::new(FakeSearch::fixture()),
            generation,
        );

        let result = pipeline.evaluate(&request(true), &SilentObserver).await.unwrap();
        assert_eq!(result.get("personalizedstatus").unwrap(), true);
        let score = result.get("founderfitscore").unwrap().as_f64().unwrap();
        assert!((1.0..=10.0).contains(&score));
        for key in ["positivefounderfit", "negativefounderfit"] {
            assert_eq!(result.get(key).unwrap().as_array().unwrap().len(), 3);
        }
    }

    #[tokio::test]
    async fn sparse_research_still_has_required_keys() {
        let pipeline = live(
            FakeCompletion::reply("q"),
            Arc::new(FakeSearch::answer(json!({ "title": "Sneaker Swap", "score": 42 }))),
            Arc::new(FakeGeneration::new()),
        );

        let result = pipeline.evaluate(&request(false), &SilentObserver).await.unwrap();
        for key in [
            "title",
            "overview",
            "score",
            "summary",
            "details",
            "marketDemand",
            "competitors",
            "targetAudience",
            "personalizedstatus",
        ] {
            assert!(result.contains_key(key), "missing {key}");
        }
        assert_eq!(result.get("score").unwrap(), 10.0);
    }

    #[tokio::test]
    async fn off_shape_research_values_do_not_fail_the_request() {
        let pipeline = live(
            FakeCompletion::reply("q"),
            Arc::new(FakeSearch::answer(json!({
                "title": "Sneaker Swap",
                "score": "7",
                "competitors": [
                    { "name": "StockX", "description": "Bid/ask sneaker exchange" },
                    { "name": "GOAT", "popularity": "Very High" }
                ],
                "targetAudience": [{
                    "group": "Collectors",
                    "onlineDestinations": [{ "name": "Sneaker Slack", "type": "Slack" }]
                }]
            }))),
            Arc::new(FakeGeneration::new()),
        );

        let result = pipeline.evaluate(&request(false), &SilentObserver).await.unwrap();
        assert_eq!(result.get("score").unwrap(), 7.0);
        let competitors = result.get("competitors").and_then(|c| c.as_array()).unwrap();
        assert_eq!(competitors.len(), 2);
        assert_eq!(competitors[0]["name"], "StockX");
        let audience = result.get("targetAudience").unwrap();
        assert_eq!(audience[0]["onlineDestinations"][0]["type"], "Other");
        for key in ["pitch", "revenueModels", "mvpDesign", "mvpFeatures"] {
            assert!(result.contains_key(key), "missing {key}");
        }
    }

    #[tokio::test]
    async fn rephrase_failure_uses_original_message() {
        let search = Arc::new(FakeSearch::fixture());
        let pipeline = live(
            FakeCompletion::failing(),
            search.clone(),
            Arc::new(FakeGeneration::new()),
        );

        pipeline.evaluate(&request(false), &SilentObserver).await.unwrap();
        let calls = search.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].query.contains(IDEA));
    }

    #[tokio::test]
    async fn stages_see_original_idea_not_rephrased_text() {
        let search = Arc::new(FakeSearch::fixture());
        let generation = Arc::new(FakeGeneration::new());
        let pipeline = live(
            FakeCompletion::reply("REPHRASED QUERY"),
            search.clone(),
            generation.clone(),
        );

        pipeline.evaluate(&request(false), &SilentObserver).await.unwrap();
        assert!(search.calls()[0].query.contains("REPHRASED QUERY"));
        for call in generation.calls() {
            assert!(call.prompt.contains(&format!("Startup Idea: {IDEA}")));
            assert!(!call.prompt.contains("REPHRASED QUERY"));
        }
    }

    #[tokio::test]
    async fn live_stage_failure_fails_the_request() {
        let observer = RecordingObserver::default();
        let pipeline = live(
            FakeCompletion::reply("q"),
            Arc::new(FakeSearch::fixture()),
            Arc::new(FakeGeneration::new().failing_on("mvpDesign")),
        );

        let err = pipeline.evaluate(&request(false), &observer).await.unwrap_err();
        assert!(matches!(&err, IdeaScopeError::Stage { stage, .. } if stage == "mvp"));
        assert_eq!(err.upstream_message(), "HTTP 500: mvpDesign unavailable");
        assert_eq!(observer.states().last(), Some(&PipelineState::Failed));
        assert!(!observer.states().contains(&PipelineState::Composing));
    }

    #[tokio::test]
    async fn research_failure_fails_the_request() {
        let generation = Arc::new(FakeGeneration::new());
        let pipeline = live(FakeCompletion::reply("q"), Arc::new(FakeSearch::failing()), generation.clone());

        let err = pipeline.evaluate(&request(false), &SilentObserver).await.unwrap_err();
        assert!(matches!(&err, IdeaScopeError::Stage { stage, .. } if stage == "market research"));
        assert!(generation.calls().is_empty());
    }

    #[tokio::test]
    async fn mock_mode_parity_with_fixture() {
        let pipeline = mock(Arc::new(FakeGeneration::new()));
        assert_eq!(pipeline.execution_mode(), ExecutionMode::Mock);

        let result = pipeline.evaluate(&request(false), &SilentObserver).await.unwrap();
        let fixture: ideascope_shared::BaseResult = serde_json::from_str(MOCK_RESEARCH).unwrap();
        let base: ideascope_shared::BaseResult =
            serde_json::from_value(result.clone().into_value()).unwrap();
        assert_eq!(base, fixture);
        for key in ["pitch", "revenueModels", "mvpDesign", "mvpFeatures"] {
            assert!(result.contains_key(key), "missing {key}");
        }
    }

    #[tokio::test]
    async fn mock_mode_degrades_to_bare_fixture() {
        let pipeline = mock(Arc::new(FakeGeneration::new().failing_on("pitch")));

        let result = pipeline.evaluate(&request(false), &SilentObserver).await.unwrap();
        assert!(result.contains_key("title"));
        assert!(!result.contains_key("pitch"));
        assert!(!result.contains_key("mvpDesign"));
    }

    #[tokio::test]
    async fn degraded_personalized_reply_mirrors_request_flag() {
        let pipeline = mock(Arc::new(FakeGeneration::new().failing_on("founderfit")));

        let result = pipeline.evaluate(&request(true), &SilentObserver).await.unwrap();
        assert_eq!(result.get("personalizedstatus").unwrap(), true);
        assert!(result.keys().all(|k| !k.contains("founderfit")));
        assert!(!result.contains_key("pitch"));
    }

    #[tokio::test]
    async fn mock_degradation_can_be_disabled() {
        let pipeline =
            mock(Arc::new(FakeGeneration::new().failing_on("pitch"))).with_mock_degradation(false);

        assert!(pipeline.evaluate(&request(false), &SilentObserver).await.is_err());
    }

    #[tokio::test]
    async fn quick_search_selects_standard_depth() {
        let search = Arc::new(FakeSearch::fixture());
        let pipeline = live(FakeCompletion::reply("q"), search.clone(), Arc::new(FakeGeneration::new()));

        let mut req = request(false);
        req.model = "Quick Search".into();
        pipeline.evaluate(&req, &SilentObserver).await.unwrap();
        req.model = "Comprehensive".into();
        pipeline.evaluate(&req, &SilentObserver).await.unwrap();

        let depths: Vec<Mode> = search.calls().iter().map(|c| c.depth).collect();
        assert_eq!(depths, vec![Mode::Standard, Mode::Deep]);
    }

    #[tokio::test]
    async fn sequential_run_visits_states_in_reference_order() {
        let observer = RecordingObserver::default();
        let generation = Arc::new(FakeGeneration::new());
        let pipeline = live(FakeCompletion::reply("q"), Arc::new(FakeSearch::fixture()), generation.clone())
            .with_stage_execution(StageExecution::Sequential);

        pipeline.evaluate(&request(false), &observer).await.unwrap();
        assert_eq!(
            observer.states(),
            vec![
                PipelineState::Start,
                PipelineState::Rephrasing,
                PipelineState::MarketResearch,
                PipelineState::Generating(StageKind::Pitch),
                PipelineState::Generating(StageKind::RevenueModels),
                PipelineState::Generating(StageKind::Mvp),
                PipelineState::SkippedFounderFit,
                PipelineState::Composing,
                PipelineState::Done,
            ]
        );
        let order: Vec<String> = generation.calls().into_iter().map(|c| c.stage).collect();
        assert_eq!(order, vec!["pitch", "revenueModels", "mvpDesign"]);
    }

    #[tokio::test]
    async fn sequential_personalized_runs_founder_fit_last() {
        let generation = Arc::new(FakeGeneration::new());
        let pipeline = live(FakeCompletion::reply("q"), Arc::new(FakeSearch::fixture()), generation.clone())
            .with_stage_execution(StageExecution::Sequential);

        pipeline.evaluate(&request(true), &SilentObserver).await.unwrap();
        let calls = generation.calls();
        assert_eq!(calls.last().map(|c| c.stage.as_str()), Some("founderfit"));
        assert_eq!(calls.last().map(|c| c.temperature), Some(0.5));
    }

    #[test]
    fn request_defaults() {
        let req: EvaluationRequest = serde_json::from_str(r#"{ "message": "idea" }"#).unwrap();
        assert_eq!(req.model, "");
        assert!(!req.personalized);
        assert!(req.user_profile.is_none());

        let req: EvaluationRequest = serde_json::from_str(
            r#"{ "message": "idea", "model": "Quick Search", "personalized": true, "userProfile": null }"#,
        )
        .unwrap();
        assert_eq!(Mode::from_label(&req.model), Mode::Standard);
        assert!(req.personalized);
    }
}
