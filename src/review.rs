use crate::catalog::{Catalog, SharedCatalog};
use crate::errors::LocsmithError;
use crate::pool::WorkerPool;
use crate::provider::{Quality, TranslationService};
use crate::translate::{confirm_over_threshold, output_path};
use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Default)]
pub struct ReviewOptions {
    /// Restrict evaluation to these languages; None/empty means all.
    pub languages: Option<Vec<String>>,
    pub overwrite: bool,
    pub skip_confirm: bool,
}

struct ReviewItem {
    key: String,
    language: String,
    source: String,
    translation: String,
    comment: Option<String>,
}

/// Re-evaluates entries marked `needs_review`. Approved entries flip to
/// `translated`; rejected ones keep their state and the verdict explanation
/// is reported. The catalog is persisted after every completed evaluation.
pub struct CatalogReviewer {
    service: Arc<dyn TranslationService>,
    pool: WorkerPool,
    options: ReviewOptions,
}

impl CatalogReviewer {
    pub fn new(
        service: Arc<dyn TranslationService>,
        pool: WorkerPool,
        options: ReviewOptions,
    ) -> Self {
        Self {
            service,
            pool,
            options,
        }
    }

    /// Returns the number of entries evaluated regardless of verdict, or
    /// `None` when the user declined the large-run confirmation.
    pub async fn review_file(&self, path: &Path) -> Result<Option<usize>> {
        if !self.service.supports_evaluation() {
            return Err(LocsmithError::EvaluationNotSupported.into());
        }

        let catalog = Catalog::load(path, None)?;
        let candidates = catalog.review_candidates(self.options.languages.as_deref());

        if !self.options.skip_confirm {
            let prompt = format!(
                "About to review {} translations. Continue? [Y/n] ",
                candidates.len(),
            );
            if !confirm_over_threshold(candidates.len(), &prompt) {
                return Ok(None);
            }
        }

        let items: Vec<ReviewItem> = candidates
            .into_iter()
            .filter_map(|(key, language)| {
                let translation = catalog.translation(&key, &language)?.to_string();
                Some(ReviewItem {
                    source: catalog.source_text(&key).to_string(),
                    comment: catalog.comment(&key).map(str::to_string),
                    key,
                    language,
                    translation,
                })
            })
            .collect();
        if items.is_empty() {
            info!(path = ?path, "No translations marked for review");
            return Ok(Some(0));
        }

        let out_path = output_path(path, self.options.overwrite);
        let shared = SharedCatalog::new(catalog, out_path);

        let tasks: Vec<_> = items
            .into_iter()
            .map(|item| {
                let service = self.service.clone();
                let shared = shared.clone();
                async move { review_one(service.as_ref(), &shared, &item).await }
            })
            .collect();

        let outcomes = self.pool.run_all(tasks).await;
        Ok(Some(outcomes.into_iter().filter(|done| *done).count()))
    }
}

// One retry on failure, then the entry is left untouched. Every completed
// evaluation persists the catalog, whatever the verdict.
async fn review_one(
    service: &dyn TranslationService,
    shared: &SharedCatalog,
    item: &ReviewItem,
) -> bool {
    let mut last_reason = String::new();
    for _attempt in 0..2 {
        match service
            .evaluate(
                &item.source,
                &item.translation,
                &item.language,
                item.comment.as_deref(),
            )
            .await
        {
            Ok(verdict) => {
                match verdict.quality {
                    Quality::Good => {
                        shared.approve(&item.key, &item.language).await;
                        println!("{} {}  {}", "approved".green(), item.language, item.key);
                    }
                    Quality::Poor => {
                        shared.flush().await;
                        println!(
                            "{} {}  {}: {}",
                            "needs review".yellow(),
                            item.language.yellow(),
                            item.key,
                            verdict.explanation,
                        );
                    }
                }
                return true;
            }
            Err(err) => last_reason = err.to_string(),
        }
    }
    eprintln!(
        "{} {}  {}: {}",
        "skipped".red().bold(),
        item.language.red(),
        item.key,
        last_reason,
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TranslationState;
    use crate::provider::testing::ScriptedService;
    use std::fs;
    use tempfile::TempDir;

    const NEEDS_REVIEW: &str = r#"{
        "sourceLanguage": "en",
        "strings": {
            "Hello": {
                "localizations": {
                    "fr": { "stringUnit": { "state": "needs_review", "value": "Bonjour" } }
                }
            }
        }
    }"#;

    fn reviewer(service: ScriptedService, options: ReviewOptions) -> CatalogReviewer {
        CatalogReviewer::new(Arc::new(service), WorkerPool::new(2), options)
    }

    fn options() -> ReviewOptions {
        ReviewOptions {
            overwrite: true,
            skip_confirm: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn good_verdict_flips_state_to_translated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.xcstrings");
        fs::write(&path, NEEDS_REVIEW).unwrap();

        let service = ScriptedService::always("").with_verdict(Quality::Good, "");
        let count = reviewer(service, options())
            .review_file(&path)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count, 1);

        let catalog = Catalog::load(&path, None).unwrap();
        assert_eq!(catalog.state("Hello", "fr"), TranslationState::Translated);
        assert_eq!(catalog.translation("Hello", "fr"), Some("Bonjour"));
    }

    #[tokio::test]
    async fn poor_verdict_keeps_state_and_counts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.xcstrings");
        fs::write(&path, NEEDS_REVIEW).unwrap();

        let service = ScriptedService::always("").with_verdict(Quality::Poor, "too literal");
        let count = reviewer(service, options())
            .review_file(&path)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count, 1);

        let catalog = Catalog::load(&path, None).unwrap();
        assert_eq!(catalog.state("Hello", "fr"), TranslationState::NeedsReview);
    }

    #[tokio::test]
    async fn fails_fast_without_evaluation_support() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.xcstrings");
        fs::write(&path, NEEDS_REVIEW).unwrap();

        let err = reviewer(ScriptedService::always(""), options())
            .review_file(&path)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LocsmithError>(),
            Some(LocsmithError::EvaluationNotSupported)
        ));
    }

    #[tokio::test]
    async fn language_filter_excludes_other_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.xcstrings");
        fs::write(&path, NEEDS_REVIEW).unwrap();

        let mut opts = options();
        opts.languages = Some(vec!["de".to_string()]);
        let service = ScriptedService::always("").evaluating();
        let count = reviewer(service, opts)
            .review_file(&path)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn evaluation_failure_retries_once_then_skips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.xcstrings");
        fs::write(&path, NEEDS_REVIEW).unwrap();

        // evaluating, but the verdict script is empty: every call errors
        let service = Arc::new(ScriptedService::always("").evaluating());
        let count = CatalogReviewer::new(service.clone(), WorkerPool::new(2), options())
            .review_file(&path)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(
            service
                .evaluate_calls
                .load(std::sync::atomic::Ordering::SeqCst),
            2
        );

        let catalog = Catalog::load(&path, None).unwrap();
        assert_eq!(catalog.state("Hello", "fr"), TranslationState::NeedsReview);
    }
}
