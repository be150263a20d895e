use crate::config::{Config, load_config};
use crate::coordinator::{self, ReviewRequest, TranslateRequest};
use crate::openai::OpenAiTranslator;
use crate::provider::TranslationService;
use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "locsmith",
    version,
    about = "Bulk-localize string catalogs and translation manifests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate pending catalog entries, or fan out a translation manifest
    Translate(TranslateArgs),
    /// Translate a literal string into the given languages
    TranslateText(TranslateTextArgs),
    /// Re-evaluate catalog entries marked needs_review
    Review(ReviewArgs),
}

#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// File or directory to translate
    pub path: PathBuf,
    /// Target language; may repeat. Defaults to the languages already in the file
    #[arg(long = "lang", value_name = "CODE")]
    pub languages: Vec<String>,
    /// Restrict a manifest run to these file basenames; may repeat
    #[arg(long = "only-files", value_name = "NAME")]
    pub only_files: Vec<String>,
    /// Write translations back into the input file instead of a .loc sibling
    #[arg(long)]
    pub overwrite: bool,
    /// Mark fresh translations as needing review
    #[arg(long = "needs-review")]
    pub needs_review: bool,
    /// Skip the large-run confirmation prompt
    #[arg(long = "skip-confirm")]
    pub skip_confirm: bool,
    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct TranslateTextArgs {
    /// Text to translate
    pub text: String,
    /// Target language; may repeat
    #[arg(long = "lang", value_name = "CODE", required = true)]
    pub languages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// File or directory of string catalogs to review
    pub path: PathBuf,
    /// Restrict review to this language; may repeat
    #[arg(long = "lang", value_name = "CODE")]
    pub languages: Vec<String>,
    /// Persist verdicts into the input file instead of a .loc sibling
    #[arg(long)]
    pub overwrite: bool,
    /// Skip the large-run confirmation prompt
    #[arg(long = "skip-confirm")]
    pub skip_confirm: bool,
    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Commands::Translate(args) => args.verbose,
            Commands::Review(args) => args.verbose,
            Commands::TranslateText(_) => false,
        }
    }
}

pub async fn handle_translate(args: TranslateArgs) -> Result<()> {
    let cfg = load_config()?;
    let translator = build_service(&cfg)?;
    let service: Arc<dyn TranslationService> = translator.clone();
    coordinator::translate_files(
        service,
        &args.path,
        cfg.concurrency,
        TranslateRequest {
            languages: args.languages,
            only_files: args.only_files,
            overwrite: args.overwrite,
            mark_needs_review: args.needs_review,
            skip_confirm: args.skip_confirm,
        },
    )
    .await?;
    report_usage(&translator);
    Ok(())
}

pub async fn handle_translate_text(args: TranslateTextArgs) -> Result<()> {
    let cfg = load_config()?;
    let translator = build_service(&cfg)?;
    let service: Arc<dyn TranslationService> = translator.clone();
    coordinator::translate_text(service, &args.text, &args.languages, cfg.concurrency).await?;
    report_usage(&translator);
    Ok(())
}

pub async fn handle_review(args: ReviewArgs) -> Result<()> {
    let cfg = load_config()?;
    let translator = build_service(&cfg)?;
    let service: Arc<dyn TranslationService> = translator.clone();
    coordinator::review_files(
        service,
        &args.path,
        cfg.concurrency,
        ReviewRequest {
            languages: args.languages,
            overwrite: args.overwrite,
            skip_confirm: args.skip_confirm,
        },
    )
    .await?;
    report_usage(&translator);
    Ok(())
}

fn build_service(cfg: &Config) -> Result<Arc<OpenAiTranslator>> {
    let api_key = env::var("OPENAI_API_KEY")
        .ok()
        .or_else(|| cfg.openai.api_key.clone())
        .unwrap_or_default();
    if api_key.is_empty() {
        return Err(anyhow!("OPENAI_API_KEY not set and no key in config"));
    }
    Ok(Arc::new(OpenAiTranslator::new(
        api_key,
        cfg.openai.model.clone(),
    )?))
}

fn report_usage(translator: &OpenAiTranslator) {
    let usage = translator.usage_snapshot();
    if usage.requests == 0 {
        return;
    }
    info!(
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        total_tokens = usage.total_tokens,
        requests = usage.requests,
        "OpenAI usage summary"
    );
}
