use crate::finder::{FileFinder, FileType};
use crate::manifest::{ManifestOptions, ManifestTranslator};
use crate::pool::WorkerPool;
use crate::provider::TranslationService;
use crate::review::{CatalogReviewer, ReviewOptions};
use crate::translate::{CatalogTranslator, TranslateOptions};
use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub struct TranslateRequest {
    /// Empty means: every language already present in the file.
    pub languages: Vec<String>,
    /// Empty means: every file listed in a manifest.
    pub only_files: Vec<String>,
    pub overwrite: bool,
    pub mark_needs_review: bool,
    pub skip_confirm: bool,
}

pub struct ReviewRequest {
    pub languages: Vec<String>,
    pub overwrite: bool,
    pub skip_confirm: bool,
}

// One translator per detected file type, each with its own configuration.
enum FileTranslator {
    Catalog(CatalogTranslator),
    Manifest(ManifestTranslator),
}

/// Translate every matching file under `path`, then print the run summary.
pub async fn translate_files(
    service: Arc<dyn TranslationService>,
    path: &Path,
    concurrency: usize,
    request: TranslateRequest,
) -> Result<()> {
    let started = Instant::now();
    let finder = FileFinder::new(path, None)?;
    let files = finder.find()?;

    let translator = match finder.file_type() {
        FileType::StringCatalog => FileTranslator::Catalog(CatalogTranslator::new(
            service,
            WorkerPool::new(concurrency),
            TranslateOptions {
                languages: non_empty(request.languages),
                overwrite: request.overwrite,
                mark_needs_review: request.mark_needs_review,
                skip_confirm: request.skip_confirm,
            },
        )),
        FileType::Manifest => FileTranslator::Manifest(ManifestTranslator::new(
            service,
            ManifestOptions {
                languages: non_empty(request.languages),
                only_files: non_empty(request.only_files),
                overwrite: request.overwrite,
            },
        )),
    };

    let mut translated = 0usize;
    for file in &files {
        match &translator {
            FileTranslator::Catalog(catalog) => match catalog.translate_file(file).await? {
                Some(count) => translated += count,
                None => {
                    println!("{}", "Translation canceled".yellow());
                    return Ok(());
                }
            },
            FileTranslator::Manifest(manifest) => translated += manifest.translate_file(file).await?,
        }
    }

    print_summary("Translated", translated, started);
    Ok(())
}

/// Evaluate `needs_review` entries in every catalog under `path`.
pub async fn review_files(
    service: Arc<dyn TranslationService>,
    path: &Path,
    concurrency: usize,
    request: ReviewRequest,
) -> Result<()> {
    let started = Instant::now();
    // Review only ever applies to string catalogs.
    let finder = FileFinder::new(path, Some(FileType::StringCatalog))?;
    let files = finder.find()?;

    let reviewer = CatalogReviewer::new(
        service,
        WorkerPool::new(concurrency),
        ReviewOptions {
            languages: non_empty(request.languages),
            overwrite: request.overwrite,
            skip_confirm: request.skip_confirm,
        },
    );

    let mut reviewed = 0usize;
    for file in &files {
        match reviewer.review_file(file).await? {
            Some(count) => reviewed += count,
            None => {
                println!("{}", "Review canceled".yellow());
                return Ok(());
            }
        }
    }

    print_summary("Reviewed", reviewed, started);
    Ok(())
}

/// Translate one literal string into each requested language and print a
/// `language: translation` line per target, in the order given.
pub async fn translate_text(
    service: Arc<dyn TranslationService>,
    text: &str,
    languages: &[String],
    concurrency: usize,
) -> Result<()> {
    let pool = WorkerPool::new(concurrency);
    let tasks: Vec<_> = languages
        .iter()
        .enumerate()
        .map(|(index, language)| {
            let service = service.clone();
            let language = language.clone();
            let text = text.to_string();
            async move {
                // empty source language: the provider detects it
                let result = service.translate(&text, "", &language, None).await;
                (index, language, result)
            }
        })
        .collect();

    let mut results = pool.run_all(tasks).await;
    results.sort_by_key(|(index, ..)| *index);
    for (_, language, result) in results {
        match result {
            Ok(translation) => println!("{}: {}", language.bold(), translation),
            Err(err) => println!("{}: {}", language.red().bold(), err.to_string().red()),
        }
    }
    Ok(())
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() { None } else { Some(values) }
}

fn print_summary(verb: &str, count: usize, started: Instant) {
    let line = format!(
        "{verb} {count} strings in {:.1}s",
        started.elapsed().as_secs_f64(),
    );
    println!("{}", line.green().bold());
}
