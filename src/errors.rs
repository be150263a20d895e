use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocsmithError {
    #[error("Unhandled file type: {0}")]
    UnhandledFileType(String),
    #[error("Could not search directory {path:?}: {source}")]
    CouldNotSearchDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("Provider returned no translation")]
    NoTranslationReturned,
    #[error("Translation failed linting")]
    TranslationFailedLinting,
    #[error("The configured provider does not support quality evaluation")]
    EvaluationNotSupported,
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("Failed to parse locale: {0:?}")]
    FailedToParseLocale(String),
}
