//! IdeaScope CLI: serve the evaluation API or run one evaluation locally.
//!
//! Each evaluation rephrases the idea, runs structured market research, and
//! generates pitch, revenue models, MVP plan, and (optionally) founder fit.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
