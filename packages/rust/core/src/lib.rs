//! Evaluation pipeline and domain logic for IdeaScope.
//!
//! This crate ties together query rephrasing, market research, the
//! generation stages, and response composition into one [`Pipeline`].

pub mod composer;
pub mod pipeline;
pub mod prompts;
pub mod rephrase;
pub mod research;
pub mod schema;
pub mod stages;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use composer::{ComposedResult, compose};
pub use pipeline::{EvaluationRequest, Pipeline, PipelineObserver, PipelineState, SilentObserver};
pub use rephrase::QueryRephraser;
pub use research::{ExecutionMode, LiveMarketResearch, MarketResearchProvider, MockMarketResearch};
pub use schema::{SCHEMA_VERSION, SchemaId, SchemaRegistry};
pub use stages::{StageConfig, StageKind, StageRunner};
