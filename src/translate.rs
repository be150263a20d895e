use crate::catalog::{Catalog, SharedCatalog};
use crate::errors::LocsmithError;
use crate::lint::lint;
use crate::pool::WorkerPool;
use crate::provider::TranslationService;
use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const CONFIRMATION_THRESHOLD: usize = 200;

#[derive(Clone, Default)]
pub struct TranslateOptions {
    /// Target languages; empty/None keeps the languages already in the file.
    pub languages: Option<Vec<String>>,
    pub overwrite: bool,
    pub mark_needs_review: bool,
    pub skip_confirm: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum TaskOutcome {
    Translated,
    Skipped,
}

struct WorkItem {
    key: String,
    language: String,
    text: String,
    comment: Option<String>,
}

/// Translates every pending entry of one string catalog, committing each
/// success through the shared-catalog actor so the file on disk is always a
/// valid checkpoint.
pub struct CatalogTranslator {
    service: Arc<dyn TranslationService>,
    pool: WorkerPool,
    options: TranslateOptions,
}

impl CatalogTranslator {
    pub fn new(
        service: Arc<dyn TranslationService>,
        pool: WorkerPool,
        options: TranslateOptions,
    ) -> Self {
        Self {
            service,
            pool,
            options,
        }
    }

    /// Returns the number of newly translated entries, or `None` when the
    /// user declined the large-run confirmation.
    pub async fn translate_file(&self, path: &Path) -> Result<Option<usize>> {
        let catalog = Catalog::load(path, self.options.languages.as_deref())?;

        if !self.options.skip_confirm {
            let workload = catalog.localizable_strings_count();
            let prompt = format!(
                "About to translate {} strings into {} languages ({} entries). Continue? [Y/n] ",
                catalog.strings.len(),
                catalog.target_languages().len(),
                workload,
            );
            if !confirm_over_threshold(workload, &prompt) {
                return Ok(None);
            }
        }

        let items: Vec<WorkItem> = catalog
            .pending_translations()
            .into_iter()
            .map(|(key, language)| WorkItem {
                text: catalog.source_text(&key).to_string(),
                comment: catalog.comment(&key).map(str::to_string),
                key,
                language,
            })
            .collect();
        if items.is_empty() {
            info!(path = ?path, "No translations needed");
            return Ok(Some(0));
        }

        let source_language = catalog.source_language.clone();
        let out_path = output_path(path, self.options.overwrite);
        let shared = SharedCatalog::new(catalog, out_path);

        let pb = ProgressBar::new(items.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{msg} {bar:40.cyan/blue} {pos}/{len}")
                .unwrap()
                .progress_chars("##-"),
        );
        pb.set_message(path.display().to_string());

        let tasks: Vec<_> = items
            .into_iter()
            .map(|item| {
                let service = self.service.clone();
                let shared = shared.clone();
                let pb = pb.clone();
                let source_language = source_language.clone();
                let mark_needs_review = self.options.mark_needs_review;
                async move {
                    let outcome = translate_one(
                        service.as_ref(),
                        &shared,
                        &item,
                        &source_language,
                        mark_needs_review,
                        &pb,
                    )
                    .await;
                    pb.inc(1);
                    outcome
                }
            })
            .collect();

        let outcomes = self.pool.run_all(tasks).await;
        pb.finish_and_clear();

        let translated = outcomes
            .iter()
            .filter(|outcome| **outcome == TaskOutcome::Translated)
            .count();
        Ok(Some(translated))
    }
}

// Provider and lint errors become a per-entry skip after one retry; they
// never abort the file.
async fn translate_one(
    service: &dyn TranslationService,
    shared: &SharedCatalog,
    item: &WorkItem,
    source_language: &str,
    mark_needs_review: bool,
    pb: &ProgressBar,
) -> TaskOutcome {
    let mut last_reason = String::new();
    for _attempt in 0..2 {
        match service
            .translate(
                &item.text,
                source_language,
                &item.language,
                item.comment.as_deref(),
            )
            .await
        {
            Ok(candidate) => {
                if lint(&item.text, source_language, &candidate, &item.language) {
                    shared
                        .commit_translation(&item.key, &item.language, candidate, mark_needs_review)
                        .await;
                    return TaskOutcome::Translated;
                }
                last_reason = LocsmithError::TranslationFailedLinting.to_string();
            }
            Err(err) => last_reason = err.to_string(),
        }
    }
    pb.println(format!(
        "{} {}  {}: {}",
        "skipped".red().bold(),
        item.language.red(),
        item.key,
        last_reason,
    ));
    TaskOutcome::Skipped
}

pub(crate) fn output_path(path: &Path, overwrite: bool) -> PathBuf {
    if overwrite {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("catalog");
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("xcstrings");
    path.with_file_name(format!("{stem}.loc.{ext}"))
}

/// Default-yes confirmation read from stdin; only shown for large runs.
pub(crate) fn confirm_over_threshold(workload: usize, prompt: &str) -> bool {
    if workload <= CONFIRMATION_THRESHOLD {
        return true;
    }
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer_is_yes(&answer),
        Err(_) => true,
    }
}

pub(crate) fn answer_is_yes(answer: &str) -> bool {
    !matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "n" | "no"
    )
}
