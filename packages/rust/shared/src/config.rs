//! Application configuration for IdeaScope.
//!
//! User config lives at `~/.ideascope/ideascope.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IdeaScopeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "ideascope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".ideascope";

// ---------------------------------------------------------------------------
// Config structs (matching ideascope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Mock research settings.
    #[serde(default)]
    pub mock: MockConfig,

    /// Query-rephrasing completion provider (Groq).
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Structured market-research search provider (Linkup).
    #[serde(default)]
    pub search: SearchConfig,

    /// Structured generation provider (Gemini).
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Orchestration settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5000
}

/// `[mock]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    /// Serve the research step from a fixture instead of the search provider.
    #[serde(default)]
    pub enabled: bool,

    /// Path to the fixture JSON.
    #[serde(default = "default_fixture_path")]
    pub fixture_path: String,

    /// Return the bare fixture when a generation stage fails in mock mode.
    #[serde(default = "default_true")]
    pub degrade_on_stage_failure: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fixture_path: default_fixture_path(),
            degrade_on_stage_failure: true,
        }
    }
}

fn default_fixture_path() -> String {
    "fixtures/json/mock_research.json".into()
}
fn default_true() -> bool {
    true
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// OpenAI-compatible API root.
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_completion_key_env")]
    pub api_key_env: String,

    /// Chat model used for rephrasing.
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            api_key_env: default_completion_key_env(),
            model: default_completion_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_completion_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_completion_key_env() -> String {
    "GROQ_API_KEY".into()
}
fn default_completion_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search API root.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds. Deep searches are slow.
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key_env: default_search_key_env(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

fn default_search_base_url() -> String {
    "https://api.linkup.so/v1".into()
}
fn default_search_key_env() -> String {
    "LINKUP_API_KEY".into()
}
fn default_search_timeout_secs() -> u64 {
    300
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Generative Language API root.
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_generation_key_env")]
    pub api_key_env: String,

    /// Model used by every generation stage.
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            api_key_env: default_generation_key_env(),
            model: default_generation_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_generation_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_generation_model() -> String {
    "gemini-1.5-flash".into()
}

/// How the independent generation stages are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageExecution {
    /// Fan out all stages at once and fail fast on the first error.
    #[default]
    Concurrent,
    /// Pitch, revenue, MVP, founder fit, one after another.
    Sequential,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub stage_execution: StageExecution,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.ideascope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| IdeaScopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.ideascope/ideascope.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| IdeaScopeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        IdeaScopeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| IdeaScopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| IdeaScopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| IdeaScopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key named by `var_name`, failing if it is unset or empty.
pub fn require_api_key(provider: &str, var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(IdeaScopeError::config(format!(
            "{provider} API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Read the API key named by `var_name` if it is set and non-empty.
pub fn optional_api_key(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .filter(|val| !val.trim().is_empty())
}
