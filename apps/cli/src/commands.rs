//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use ideascope_core::{
    ComposedResult, EvaluationRequest, Pipeline, PipelineObserver, PipelineState, SchemaId,
    SchemaRegistry,
};
use ideascope_shared::{AppConfig, UserProfile, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// IdeaScope: market research and startup idea evaluation.
#[derive(Parser)]
#[command(
    name = "ideascope",
    version,
    about = "Evaluate startup ideas with structured market research and generated pitch, revenue, and MVP plans.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.ideascope/ideascope.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve market research from the mock fixture.
    #[arg(long, env = "IDEASCOPE_MOCK", global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start the HTTP server.
    Serve {
        /// Address to bind.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Evaluate one idea and print the composed JSON.
    Evaluate {
        /// The startup idea.
        idea: String,

        /// Research depth label; "Quick Search" selects standard depth.
        #[arg(short, long, default_value = "")]
        model: String,

        /// Personalize with a founder profile and run the founder-fit stage.
        #[arg(long)]
        personalized: bool,

        /// Founder profile JSON (camelCase keys).
        #[arg(long)]
        profile: Option<PathBuf>,
    },

    /// Print the validated structured-output schemas.
    Schemas {
        /// Only print this schema (e.g. "pitch", "market_research").
        #[arg(long)]
        id: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "ideascope=info,tower_http=info",
        1 => "ideascope=debug,tower_http=debug",
        _ => "ideascope=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref(), cli.mock)?;

    match cli.command {
        Command::Serve { bind, port } => cmd_serve(config, bind, port).await,
        Command::Evaluate {
            idea,
            model,
            personalized,
            profile,
        } => cmd_evaluate(&config, idea, model, personalized, profile.as_deref()).await,
        Command::Schemas { id } => cmd_schemas(id.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// File config (or defaults) with CLI overrides applied.
fn resolve_config(path: Option<&Path>, mock: bool) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if mock {
        config.mock.enabled = true;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(mut config: AppConfig, bind: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let pipeline = Pipeline::from_config(&config)?;
    info!(
        bind = %config.server.bind,
        port = config.server.port,
        mode = %pipeline.execution_mode(),
        "starting server"
    );

    ideascope_server::run_server(&config.server, Arc::new(pipeline)).await?;
    Ok(())
}

async fn cmd_evaluate(
    config: &AppConfig,
    idea: String,
    model: String,
    personalized: bool,
    profile: Option<&Path>,
) -> Result<()> {
    let user_profile = profile.map(read_profile).transpose()?;
    if personalized && user_profile.is_none() {
        warn!("personalized evaluation without --profile, founder fit will have little to work with");
    }

    let pipeline = Pipeline::from_config(config)?;
    let request = EvaluationRequest {
        message: idea,
        model,
        personalized,
        user_profile,
    };

    let reporter = CliProgress::new();
    let result = pipeline.evaluate(&request, &reporter).await?;

    let json = serde_json::to_string_pretty(&result)?;
    println!("{json}");
    Ok(())
}

fn read_profile(path: &Path) -> Result<UserProfile> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read profile {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("invalid profile JSON in {}", path.display()))
}

fn cmd_schemas(id: Option<&str>) -> Result<()> {
    let registry = SchemaRegistry::load()?;
    let only: Option<SchemaId> = id.map(str::parse::<SchemaId>).transpose()?;

    println!("# schema version {}", registry.version());
    for (schema_id, schema) in registry.iter() {
        if only.is_some_and(|o| o != schema_id) {
            continue;
        }
        println!("\n## {schema_id}");
        println!("{}", serde_json::to_string_pretty(schema)?);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner that follows the pipeline state machine.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl PipelineObserver for CliProgress {
    fn transition(&self, state: PipelineState) {
        match state {
            PipelineState::Failed => self.spinner.finish_and_clear(),
            state => self.spinner.set_message(state.to_string()),
        }
    }

    fn done(&self, result: &ComposedResult, elapsed: Duration) {
        self.spinner.finish_and_clear();
        let title = result
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("untitled");
        eprintln!("  Evaluated \"{title}\" in {:.1}s", elapsed.as_secs_f64());
    }
}
