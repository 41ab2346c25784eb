//! Market research: live structured search or a static fixture.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use ideascope_providers::{DateWindow, SearchProvider, SearchRequest};
use ideascope_shared::{BaseResult, IdeaScopeError, Mode, Result, UserProfile};

use crate::prompts;
use crate::schema::{SchemaId, SchemaRegistry};

/// How market research is sourced, resolved once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Live,
    Mock,
}

impl ExecutionMode {
    pub fn from_mock_flag(mock: bool) -> Self {
        if mock { Self::Mock } else { Self::Live }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Mock => f.write_str("mock"),
        }
    }
}

/// Inputs to one research call.
#[derive(Debug, Clone, Copy)]
pub struct ResearchQuery<'a> {
    /// Rephrased idea text.
    pub text: &'a str,
    pub mode: Mode,
    pub personalized: bool,
    /// Only consulted when `personalized` is set.
    pub profile: Option<&'a UserProfile>,
}

/// Source of the base market analysis.
#[async_trait]
pub trait MarketResearchProvider: Send + Sync {
    fn execution_mode(&self) -> ExecutionMode;

    /// Produce the raw (not yet normalized) base result.
    async fn research(&self, query: &ResearchQuery<'_>) -> Result<BaseResult>;
}

// ---------------------------------------------------------------------------
// Live
// ---------------------------------------------------------------------------

/// Research backed by a structured search provider.
pub struct LiveMarketResearch {
    search: Arc<dyn SearchProvider>,
    registry: Arc<SchemaRegistry>,
    window: DateWindow,
}

impl LiveMarketResearch {
    pub fn new(search: Arc<dyn SearchProvider>, registry: Arc<SchemaRegistry>) -> Result<Self> {
        Ok(Self {
            search,
            registry,
            window: DateWindow::research()?,
        })
    }
}

#[async_trait]
impl MarketResearchProvider for LiveMarketResearch {
    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Live
    }

    #[instrument(skip_all, fields(depth = %query.mode, personalized = query.personalized))]
    async fn research(&self, query: &ResearchQuery<'_>) -> Result<BaseResult> {
        let profile = query.profile.filter(|_| query.personalized);
        let text = prompts::research_query(query.text, profile);
        let schema = self.registry.get(SchemaId::market_research(query.personalized));

        let request = SearchRequest {
            query: &text,
            depth: query.mode,
            schema,
            include_images: false,
            window: &self.window,
        };

        let value = self.search.structured_search(&request).await?;
        let base: BaseResult = serde_json::from_value(value)
            .map_err(|e| IdeaScopeError::parse(format!("market research does not match schema: {e}")))?;

        info!(
            title = %base.title,
            competitors = base.competitors.len(),
            audiences = base.target_audience.len(),
            "market research complete"
        );
        Ok(base)
    }
}

// ---------------------------------------------------------------------------
// Mock
// ---------------------------------------------------------------------------

/// Research that always answers with a fixture loaded at startup.
#[derive(Debug, Clone)]
pub struct MockMarketResearch {
    fixture: BaseResult,
}

impl MockMarketResearch {
    pub fn new(fixture: BaseResult) -> Self {
        Self { fixture }
    }

    /// Load and validate the fixture file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| IdeaScopeError::io(path, e))?;
        Self::from_json(&raw).map_err(|e| {
            IdeaScopeError::config(format!("invalid mock fixture {}: {e}", path.display()))
        })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let fixture: BaseResult = serde_json::from_str(raw)
            .map_err(|e| IdeaScopeError::parse(format!("fixture is not a market research result: {e}")))?;
        Ok(Self::new(fixture))
    }

    pub fn fixture(&self) -> &BaseResult {
        &self.fixture
    }
}

#[async_trait]
impl MarketResearchProvider for MockMarketResearch {
    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Mock
    }

    async fn research(&self, query: &ResearchQuery<'_>) -> Result<BaseResult> {
        info!(depth = %query.mode, "serving market research from fixture");
        Ok(self.fixture.clone())
    }
}
