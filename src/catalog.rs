use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Per-string translation state as stored in the catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationState {
    New,
    Translated,
    NeedsReview,
    Stale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringUnit {
    pub state: TranslationState,
    #[serde(default)]
    pub value: String,
    #[serde(flatten)]
    extra: IndexMap<String, Value>,
}

impl StringUnit {
    fn new() -> Self {
        Self {
            state: TranslationState::New,
            value: String::new(),
            extra: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Localization {
    #[serde(rename = "stringUnit", skip_serializing_if = "Option::is_none")]
    pub string_unit: Option<StringUnit>,
    // Keeps `variations` and anything else we don't model intact on rewrite.
    #[serde(flatten)]
    extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub localizations: IndexMap<String, Localization>,
    #[serde(flatten)]
    extra: IndexMap<String, Value>,
}

/// In-memory string catalog. Key order and unrecognized fields survive a
/// load/write round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub source_language: String,
    #[serde(default)]
    pub strings: IndexMap<String, StringGroup>,
    #[serde(flatten)]
    extra: IndexMap<String, Value>,
    #[serde(skip)]
    target_languages: Vec<String>,
}

impl Catalog {
    /// Loads a catalog. When `languages` is given, the target-language set
    /// becomes exactly that list: translations for dropped languages are
    /// discarded and added languages start untranslated.
    pub fn load(path: &Path, languages: Option<&[String]>) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
        let mut catalog: Catalog =
            serde_json::from_str(&raw).with_context(|| format!("Parsing string catalog {:?}", path))?;
        match languages {
            Some(langs) if !langs.is_empty() => catalog.retarget(langs),
            _ => catalog.target_languages = catalog.derive_target_languages(),
        }
        Ok(catalog)
    }

    fn derive_target_languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = Vec::new();
        for group in self.strings.values() {
            for lang in group.localizations.keys() {
                if *lang != self.source_language && !langs.contains(lang) {
                    langs.push(lang.clone());
                }
            }
        }
        langs
    }

    fn retarget(&mut self, languages: &[String]) {
        let source = self.source_language.clone();
        let targets: Vec<String> = languages
            .iter()
            .filter(|lang| **lang != source)
            .cloned()
            .collect();
        for group in self.strings.values_mut() {
            group
                .localizations
                .retain(|lang, _| *lang == source || targets.contains(lang));
        }
        self.target_languages = targets;
    }

    pub fn target_languages(&self) -> &[String] {
        &self.target_languages
    }

    /// Keys × target languages; what the confirmation threshold compares.
    pub fn localizable_strings_count(&self) -> usize {
        self.strings.len() * self.target_languages.len()
    }

    fn unit(&self, key: &str, language: &str) -> Option<&StringUnit> {
        self.strings
            .get(key)
            .and_then(|group| group.localizations.get(language))
            .and_then(|loc| loc.string_unit.as_ref())
    }

    /// A missing localization reads as untranslated.
    pub fn state(&self, key: &str, language: &str) -> TranslationState {
        self.unit(key, language)
            .map(|unit| unit.state)
            .unwrap_or(TranslationState::New)
    }

    pub fn translation(&self, key: &str, language: &str) -> Option<&str> {
        self.unit(key, language)
            .map(|unit| unit.value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Text to translate for a key: the source-language unit when present,
    /// otherwise the key itself.
    pub fn source_text<'a>(&'a self, key: &'a str) -> &'a str {
        self.unit(key, &self.source_language)
            .map(|unit| unit.value.as_str())
            .filter(|value| !value.is_empty())
            .unwrap_or(key)
    }

    pub fn comment(&self, key: &str) -> Option<&str> {
        self.strings
            .get(key)
            .and_then(|group| group.comment.as_deref())
    }

    fn unit_mut(&mut self, key: &str, language: &str) -> Option<&mut StringUnit> {
        let group = self.strings.get_mut(key)?;
        let loc = group
            .localizations
            .entry(language.to_string())
            .or_insert_with(Localization::default);
        Some(loc.string_unit.get_or_insert_with(StringUnit::new))
    }

    /// `new`/`stale`/`needs_review` → `translated`, recording the value.
    pub fn set_translation(&mut self, key: &str, language: &str, value: impl Into<String>) {
        if let Some(unit) = self.unit_mut(key, language) {
            unit.value = value.into();
            unit.state = TranslationState::Translated;
        }
    }

    /// `translated` → `needs_review`; the value stays in place.
    pub fn set_needs_review(&mut self, key: &str, language: &str) {
        if let Some(unit) = self.unit_mut(key, language) {
            unit.state = TranslationState::NeedsReview;
        }
    }

    /// `needs_review` → `translated` (evaluator approved).
    pub fn set_translated(&mut self, key: &str, language: &str) {
        if let Some(unit) = self.unit_mut(key, language) {
            unit.state = TranslationState::Translated;
        }
    }

    /// (key, target language) pairs still awaiting translation. Anything
    /// not yet `translated` counts, including `stale` and missing units.
    pub fn pending_translations(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for key in self.strings.keys() {
            for lang in &self.target_languages {
                if self.state(key, lang) != TranslationState::Translated {
                    out.push((key.clone(), lang.clone()));
                }
            }
        }
        out
    }

    /// (key, language) pairs marked `needs_review` that carry a value,
    /// optionally restricted to `languages`.
    pub fn review_candidates(&self, languages: Option<&[String]>) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (key, group) in &self.strings {
            for (lang, loc) in &group.localizations {
                if *lang == self.source_language {
                    continue;
                }
                if let Some(filter) = languages {
                    if !filter.is_empty() && !filter.contains(lang) {
                        continue;
                    }
                }
                let reviewable = loc
                    .string_unit
                    .as_ref()
                    .map(|unit| unit.state == TranslationState::NeedsReview && !unit.value.is_empty())
                    .unwrap_or(false);
                if reviewable {
                    out.push((key.clone(), lang.clone()));
                }
            }
        }
        out
    }

    /// Atomically rewrites the catalog: write a `.tmp` sibling, then rename
    /// over the destination so a crash never leaves a torn file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let pretty = serde_json::to_string_pretty(self)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "catalog".to_string());
        let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
        fs::write(&tmp_path, pretty).with_context(|| format!("Writing {:?}", tmp_path))?;
        fs::rename(&tmp_path, path).with_context(|| format!("Renaming {:?} into place", path))?;
        Ok(())
    }
}

/// Serializes all catalog mutation and persistence behind one lock. Worker
/// tasks translate off-lock, then commit results here, so every persist
/// observes a consistent snapshot.
#[derive(Clone)]
pub struct SharedCatalog {
    inner: Arc<Mutex<Catalog>>,
    path: Arc<PathBuf>,
}

impl SharedCatalog {
    pub fn new(catalog: Catalog, path: PathBuf) -> Self {
        Self {
            inner: Arc::new(Mutex::new(catalog)),
            path: Arc::new(path),
        }
    }

    pub async fn commit_translation(&self, key: &str, language: &str, value: String, needs_review: bool) {
        let mut catalog = self.inner.lock().await;
        catalog.set_translation(key, language, value);
        if needs_review {
            catalog.set_needs_review(key, language);
        }
        self.persist(&catalog);
    }

    pub async fn approve(&self, key: &str, language: &str) {
        let mut catalog = self.inner.lock().await;
        catalog.set_translated(key, language);
        self.persist(&catalog);
    }

    /// Persists the current snapshot without mutating. The evaluator calls
    /// this after a rejected verdict.
    pub async fn flush(&self) {
        let catalog = self.inner.lock().await;
        self.persist(&catalog);
    }

    // Save failures are logged and never abort other tasks; the on-disk
    // snapshot may lag the in-memory state until the next persist.
    fn persist(&self, catalog: &Catalog) {
        if let Err(err) = catalog.write(&self.path) {
            warn!(?err, path = ?self.path, "Failed to save translation");
        }
    }
}
