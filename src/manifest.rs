use crate::errors::LocsmithError;
use crate::provider::TranslationService;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const LOCALE_TOKEN: &str = "{locale}";

/// Declarative whole-file translation fan-out: every listed file is
/// translated into every listed locale, with `{locale}` in the file URL
/// resolved to the locale's folder name. Unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Manifest {
    pub source_locale: FileLocale,
    #[serde(default)]
    pub comment: Option<String>,
    pub locales: Vec<FileLocale>,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileLocale {
    pub locale_id: String,
    #[serde(default)]
    pub folder_name: Option<String>,
}

impl FileLocale {
    pub fn folder(&self) -> &str {
        self.folder_name.as_deref().unwrap_or(&self.locale_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileEntry {
    /// Path template relative to the manifest, e.g. `"{locale}/app.txt"`.
    pub file_url: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub skip_translation: bool,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
        let manifest: Manifest =
            serde_json::from_str(&raw).with_context(|| format!("Parsing manifest {:?}", path))?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), LocsmithError> {
        for locale in std::iter::once(&self.source_locale).chain(self.locales.iter()) {
            if locale.locale_id.trim().is_empty() {
                return Err(LocsmithError::FailedToParseLocale(locale.locale_id.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct ManifestOptions {
    /// Restrict fan-out to these locale ids; None/empty means all.
    pub languages: Option<Vec<String>>,
    /// Restrict fan-out to files with these basenames; None/empty means all.
    pub only_files: Option<Vec<String>>,
    pub overwrite: bool,
}

/// Translates whole files across a manifest's (file × locale) grid, writing
/// into the locale folder tree. Serial per output; the payload here is entire
/// files, not catalog entries.
pub struct ManifestTranslator {
    service: Arc<dyn TranslationService>,
    options: ManifestOptions,
}

impl ManifestTranslator {
    pub fn new(service: Arc<dyn TranslationService>, options: ManifestOptions) -> Self {
        Self { service, options }
    }

    /// Always returns 0: per-string counts are not meaningful in this mode.
    pub async fn translate_file(&self, path: &Path) -> Result<usize> {
        let manifest = Manifest::load(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let files: Vec<&FileEntry> = manifest
            .files
            .iter()
            .filter(|file| self.selected(file))
            .collect();

        // Every source file must exist before any translation begins.
        let mut sources = Vec::new();
        for file in &files {
            let source_path = base.join(substitute(&file.file_url, manifest.source_locale.folder()));
            if !source_path.exists() {
                return Err(LocsmithError::FileNotFound(source_path).into());
            }
            sources.push(source_path);
        }

        for (file, source_path) in files.iter().zip(&sources) {
            for locale in &manifest.locales {
                if locale.locale_id == manifest.source_locale.locale_id {
                    continue;
                }
                if let Some(languages) = &self.options.languages {
                    if !languages.is_empty() && !languages.contains(&locale.locale_id) {
                        continue;
                    }
                }

                let out_path = base.join(substitute(&file.file_url, locale.folder()));
                if out_path.exists() && !self.options.overwrite {
                    info!(path = ?out_path, "Output exists, skipping; pass --overwrite to replace");
                    continue;
                }

                let text = fs::read_to_string(source_path)
                    .with_context(|| format!("Reading {:?}", source_path))?;
                let content = if file.skip_translation {
                    text
                } else {
                    let comment = join_comments(&manifest.comment, &file.comment);
                    match self
                        .service
                        .translate(
                            &text,
                            &manifest.source_locale.locale_id,
                            &locale.locale_id,
                            comment.as_deref(),
                        )
                        .await
                    {
                        Ok(translated) => translated,
                        Err(err) => {
                            eprintln!(
                                "{} {}  {}: {}",
                                "skipped".red().bold(),
                                locale.locale_id.red(),
                                file.file_url,
                                err,
                            );
                            continue;
                        }
                    }
                };

                if let Err(err) = write_output(&out_path, &content) {
                    warn!(?err, path = ?out_path, "Failed to save translation");
                    continue;
                }
                info!(path = ?out_path, locale = %locale.locale_id, "Wrote translation");
            }
        }
        Ok(0)
    }

    fn selected(&self, file: &FileEntry) -> bool {
        match &self.options.only_files {
            Some(names) if !names.is_empty() => Path::new(&file.file_url)
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| names.iter().any(|wanted| wanted == name))
                .unwrap_or(false),
            _ => true,
        }
    }
}

fn substitute(template: &str, folder: &str) -> String {
    template.replace(LOCALE_TOKEN, folder)
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Creating {:?}", parent))?;
    }
    fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
    Ok(())
}

fn join_comments(manifest: &Option<String>, file: &Option<String>) -> Option<String> {
    match (manifest, file) {
        (Some(a), Some(b)) => Some(format!("{a}\n{b}")),
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedService;
    use tempfile::TempDir;

    const PLAN: &str = r#"{
        "sourceLocale": { "localeId": "en" },
        "locales": [
            { "localeId": "fr" },
            { "localeId": "de", "folderName": "de-DE" }
        ],
        "files": [
            { "fileUrl": "{locale}/app.txt" }
        ]
    }"#;

    fn write_plan(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("plan.json");
        fs::write(&path, body).unwrap();
        path
    }

    fn translator(service: ScriptedService, options: ManifestOptions) -> ManifestTranslator {
        ManifestTranslator::new(Arc::new(service), options)
    }

    #[tokio::test]
    async fn fans_out_across_locales_and_creates_folders() {
        let dir = TempDir::new().unwrap();
        let path = write_plan(&dir, PLAN);
        fs::create_dir(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en/app.txt"), "X").unwrap();

        let count = translator(ScriptedService::always("Y"), ManifestOptions::default())
            .translate_file(&path)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(fs::read_to_string(dir.path().join("fr/app.txt")).unwrap(), "Y");
        assert_eq!(
            fs::read_to_string(dir.path().join("de-DE/app.txt")).unwrap(),
            "Y"
        );
    }

    #[tokio::test]
    async fn missing_source_aborts_before_any_output() {
        let dir = TempDir::new().unwrap();
        let path = write_plan(&dir, PLAN);

        let err = translator(ScriptedService::always("Y"), ManifestOptions::default())
            .translate_file(&path)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LocsmithError>(),
            Some(LocsmithError::FileNotFound(_))
        ));
        assert!(!dir.path().join("fr/app.txt").exists());
    }

    #[tokio::test]
    async fn skip_translation_copies_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = write_plan(
            &dir,
            r#"{
                "sourceLocale": { "localeId": "en" },
                "locales": [{ "localeId": "fr" }],
                "files": [{ "fileUrl": "{locale}/legal.txt", "skipTranslation": true }]
            }"#,
        );
        fs::create_dir(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en/legal.txt"), "verbatim").unwrap();

        translator(ScriptedService::always("must not be used"), ManifestOptions::default())
            .translate_file(&path)
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("fr/legal.txt")).unwrap(),
            "verbatim"
        );
    }

    #[tokio::test]
    async fn existing_outputs_survive_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = write_plan(&dir, PLAN);
        fs::create_dir(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en/app.txt"), "X").unwrap();
        fs::create_dir(dir.path().join("fr")).unwrap();
        fs::write(dir.path().join("fr/app.txt"), "already here").unwrap();

        translator(ScriptedService::always("Y"), ManifestOptions::default())
            .translate_file(&path)
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("fr/app.txt")).unwrap(),
            "already here"
        );
        // the untouched locale is still produced
        assert_eq!(
            fs::read_to_string(dir.path().join("de-DE/app.txt")).unwrap(),
            "Y"
        );
    }

    #[tokio::test]
    async fn only_files_filters_by_basename() {
        let dir = TempDir::new().unwrap();
        let path = write_plan(
            &dir,
            r#"{
                "sourceLocale": { "localeId": "en" },
                "locales": [{ "localeId": "fr" }],
                "files": [
                    { "fileUrl": "{locale}/app.txt" },
                    { "fileUrl": "{locale}/other.txt" }
                ]
            }"#,
        );
        fs::create_dir(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en/app.txt"), "X").unwrap();
        fs::write(dir.path().join("en/other.txt"), "X").unwrap();

        let options = ManifestOptions {
            only_files: Some(vec!["app.txt".to_string()]),
            ..Default::default()
        };
        translator(ScriptedService::always("Y"), options)
            .translate_file(&path)
            .await
            .unwrap();
        assert!(dir.path().join("fr/app.txt").exists());
        assert!(!dir.path().join("fr/other.txt").exists());
    }

    #[tokio::test]
    async fn language_filter_limits_target_locales() {
        let dir = TempDir::new().unwrap();
        let path = write_plan(&dir, PLAN);
        fs::create_dir(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en/app.txt"), "X").unwrap();

        let options = ManifestOptions {
            languages: Some(vec!["de".to_string()]),
            ..Default::default()
        };
        translator(ScriptedService::always("Y"), options)
            .translate_file(&path)
            .await
            .unwrap();
        assert!(!dir.path().join("fr/app.txt").exists());
        assert!(dir.path().join("de-DE/app.txt").exists());
    }

    #[test]
    fn unknown_manifest_fields_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_plan(
            &dir,
            r#"{
                "sourceLocale": { "localeId": "en" },
                "locales": [],
                "files": [],
                "outputs": []
            }"#,
        );
        assert!(Manifest::load(&path).is_err());
    }

    #[test]
    fn empty_locale_id_fails_to_parse() {
        let dir = TempDir::new().unwrap();
        let path = write_plan(
            &dir,
            r#"{
                "sourceLocale": { "localeId": "en" },
                "locales": [{ "localeId": "" }],
                "files": []
            }"#,
        );
        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LocsmithError>(),
            Some(LocsmithError::FailedToParseLocale(_))
        ));
    }
}
