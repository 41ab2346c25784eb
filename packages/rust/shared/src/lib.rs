//! Shared types, error model, and configuration for IdeaScope.
//!
//! This crate is the foundation depended on by all other IdeaScope crates.
//! It provides:
//! - [`IdeaScopeError`]: the unified error type
//! - Domain types ([`UserProfile`], [`BaseResult`], [`Fragment`], [`Mode`])
//! - Configuration ([`AppConfig`], config loading, API key lookup)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, GenerationConfig, MockConfig, PipelineConfig, SearchConfig,
    ServerConfig, StageExecution, config_dir, config_file_path, init_config, load_config,
    load_config_from, optional_api_key, require_api_key,
};
pub use error::{IdeaScopeError, Result};
pub use types::{
    BaseResult, Competitor, DestinationType, FitItem, FounderFitFragment, Fragment, Level,
    Location, MarketDemand, Mode, MvpFeature, MvpFragment, OnlineDestination, PainPoints,
    PitchFragment, RequestId, RevenueFragment, TargetAudienceGroup, TimingTrends, UserProfile,
    MAX_SCORE, MIN_SCORE, QUICK_SEARCH_LABEL, clamp_score,
};
