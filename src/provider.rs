use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Poor,
}

/// Outcome of a quality evaluation of one existing translation.
#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    pub quality: Quality,
    #[serde(default)]
    pub explanation: String,
}

/// A remote service that translates single strings and, optionally, judges
/// existing translations. Implementations are invoked from many concurrent
/// tasks; no ordering is assumed.
#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        comment: Option<&str>,
    ) -> Result<String>;

    /// Review runs refuse to start when this is false.
    fn supports_evaluation(&self) -> bool {
        false
    }

    async fn evaluate(
        &self,
        source: &str,
        translation: &str,
        language: &str,
        comment: Option<&str>,
    ) -> Result<Verdict> {
        let _ = (source, translation, language, comment);
        Err(crate::errors::LocsmithError::EvaluationNotSupported.into())
    }
}
