mod catalog;
mod cli;
mod config;
mod coordinator;
mod errors;
mod finder;
mod lint;
mod manifest;
mod openai;
mod pool;
mod provider;
mod review;
mod translate;

use anyhow::Result;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load env variables from .env if present
    let _ = dotenvy::dotenv();

    let cli = <Cli as clap::Parser>::parse();

    // RUST_LOG wins; -v only raises the default level
    let default_filter = if cli.verbose() { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Translate(args) => cli::handle_translate(args).await,
        Commands::TranslateText(args) => cli::handle_translate_text(args).await,
        Commands::Review(args) => cli::handle_review(args).await,
    }
}
