//! In-memory provider fakes shared by unit tests and downstream crates.
//!
//! Enabled for this crate's tests and, elsewhere, through the `testing`
//! feature.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use ideascope_providers::{
    CompletionProvider, CompletionRequest, GenerationProvider, GenerationRequest, SearchProvider,
    SearchRequest,
};
use ideascope_shared::{BaseResult, IdeaScopeError, Location, Mode, Result, UserProfile};

use crate::pipeline::{PipelineObserver, PipelineState};

/// The bundled mock research fixture.
pub const MOCK_RESEARCH: &str = include_str!("../../../../fixtures/json/mock_research.json");

pub fn base_result() -> BaseResult {
    serde_json::from_str(MOCK_RESEARCH).expect("fixture parses")
}

pub fn profile() -> UserProfile {
    UserProfile {
        first_name: Some("Maya".into()),
        last_name: Some("Chen".into()),
        location: Some(Location {
            city: Some("Portland".into()),
            state: Some("OR".into()),
            country: Some("USA".into()),
        }),
        background: Some("Footwear retail buyer".into()),
        technical_skills: Some("Shopify, SQL".into()),
        industry: Some("E-commerce".into()),
        stage: Some("Idea".into()),
        team_size: Some("2".into()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

pub struct FakeCompletion {
    reply: Option<String>,
}

impl FakeCompletion {
    pub fn reply(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { reply: None }
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String> {
        self.reply
            .clone()
            .ok_or_else(|| IdeaScopeError::provider("groq", "HTTP 503: over capacity"))
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// One recorded search call.
#[derive(Debug, Clone)]
pub struct SearchCall {
    pub query: String,
    pub depth: Mode,
    pub schema: Value,
}

impl SearchCall {
    /// Description of the `competitors` field in the schema that was sent.
    pub fn competitor_hint(&self) -> String {
        self.schema["properties"]["competitors"]["description"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}

pub struct FakeSearch {
    answer: Option<Value>,
    calls: Mutex<Vec<SearchCall>>,
}

impl FakeSearch {
    /// Answers with the bundled fixture.
    pub fn fixture() -> Self {
        Self::answer(serde_json::from_str(MOCK_RESEARCH).expect("fixture parses"))
    }

    pub fn answer(value: Value) -> Self {
        Self {
            answer: Some(value),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn structured_search(&self, request: &SearchRequest<'_>) -> Result<Value> {
        self.calls.lock().expect("lock").push(SearchCall {
            query: request.query.to_string(),
            depth: request.depth,
            schema: request.schema.clone(),
        });
        self.answer
            .clone()
            .ok_or_else(|| IdeaScopeError::provider("linkup", "HTTP 401: Invalid API key"))
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// One recorded generation call; `stage` is the schema's first property.
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub stage: String,
    pub prompt: String,
    pub temperature: f32,
}

enum Reply {
    Json(Value),
    Raw(String),
    Fail,
}

/// Answers each stage with a canned fragment, keyed by the first property
/// of the schema it receives (`pitch`, `revenueModels`, `mvpDesign`,
/// `founderfit`).
pub struct FakeGeneration {
    overrides: HashMap<String, Reply>,
    calls: Mutex<Vec<GenerationCall>>,
}

impl Default for FakeGeneration {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGeneration {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(mut self, stage: &str, value: Value) -> Self {
        self.overrides.insert(stage.into(), Reply::Json(value));
        self
    }

    pub fn raw(mut self, stage: &str, text: &str) -> Self {
        self.overrides.insert(stage.into(), Reply::Raw(text.into()));
        self
    }

    pub fn failing_on(mut self, stage: &str) -> Self {
        self.overrides.insert(stage.into(), Reply::Fail);
        self
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().expect("lock").clone()
    }

    fn canned(stage: &str) -> Value {
        let fit = |skill: &str| json!({ "skill": skill, "description": "Matters for resale." });
        let feature = |name: &str| {
            json!({
                "feature": name,
                "differentiationFactor": "Grades condition from photos.",
                "uniqueImplementation": "Vision model scoring.",
                "priority": "High",
                "effort": "Medium",
                "competitiveAdvantage": "Trust without shipping to a hub."
            })
        };
        match stage {
            "pitch" => json!({ "pitch": "Sneaker collectors lose money to fakes. SoleSwap verifies every pair. Resale grew 20% a year. We grade from photos. Join the waitlist." }),
            "revenueModels" => json!({ "revenueModels": ["Commission per sale", "Authentication fee", "Seller subscriptions"] }),
            "mvpDesign" => json!({
                "mvpDesign": "A photo-first marketplace with condition grading.",
                "mvpFeatures": [feature("Photo grading"), feature("Price history"), feature("Escrow"), feature("Drops feed"), feature("Seller badges")]
            }),
            "founderfit" => json!({
                "founderfit": "Your buying background helps.",
                "founderfitscore": 6,
                "positivefounderfit": [fit("Retail buying"), fit("Shopify"), fit("SQL")],
                "negativefounderfit": [fit("Fundraising"), fit("Mobile development"), fit("Authentication")]
            }),
            other => json!({ "unknown": other }),
        }
    }
}

#[async_trait]
impl GenerationProvider for FakeGeneration {
    async fn generate_structured(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let stage = request.schema["propertyOrdering"][0]
            .as_str()
            .unwrap_or_default()
            .to_string();

        self.calls.lock().expect("lock").push(GenerationCall {
            stage: stage.clone(),
            prompt: request.prompt.to_string(),
            temperature: request.sampling.temperature,
        });

        match self.overrides.get(&stage) {
            Some(Reply::Json(value)) => Ok(value.to_string()),
            Some(Reply::Raw(text)) => Ok(text.clone()),
            Some(Reply::Fail) => Err(IdeaScopeError::provider(
                "gemini",
                format!("HTTP 500: {stage} unavailable"),
            )),
            None => Ok(Self::canned(&stage).to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Records every state transition.
#[derive(Default)]
pub struct RecordingObserver {
    states: Mutex<Vec<PipelineState>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<PipelineState> {
        self.states.lock().expect("lock").clone()
    }
}

impl PipelineObserver for RecordingObserver {
    fn transition(&self, state: PipelineState) {
        self.states.lock().expect("lock").push(state);
    }
}
