use crate::errors::LocsmithError;
use crate::provider::{TranslationService, Verdict};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub struct OpenAiTranslator {
    client: Client,
    api_key: String,
    model: String,
    usage: Arc<UsageCounters>,
}

impl OpenAiTranslator {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("OPENAI_API_KEY is empty"));
        }
        let client = Client::builder()
            .user_agent(concat!("locsmith/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
            usage: Arc::new(UsageCounters::default()),
        })
    }

    // One request, no internal retry: the callers own the retry policy.
    async fn chat(&self, system: String, user: String, temperature: f32) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system,
                },
                ChatMessage {
                    role: "user".into(),
                    content: user,
                },
            ],
            temperature,
        };

        let resp = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI error {}: {}", status, text));
        }
        let data: ChatResponse = resp.json().await?;

        if let Some(usage) = data.usage.as_ref() {
            if let Some(v) = usage.prompt_tokens {
                self.usage.prompt_tokens.fetch_add(v, Ordering::Relaxed);
            }
            if let Some(v) = usage.completion_tokens {
                self.usage.completion_tokens.fetch_add(v, Ordering::Relaxed);
            }
            if let Some(v) = usage.total_tokens {
                self.usage.total_tokens.fetch_add(v, Ordering::Relaxed);
            }
        }
        self.usage.requests.fetch_add(1, Ordering::Relaxed);

        Ok(data
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default())
    }

    pub fn usage_snapshot(&self) -> TokenUsageSnapshot {
        TokenUsageSnapshot {
            prompt_tokens: self.usage.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.usage.completion_tokens.load(Ordering::Relaxed),
            total_tokens: self.usage.total_tokens.load(Ordering::Relaxed),
            requests: self.usage.requests.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl TranslationService for OpenAiTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        comment: Option<&str>,
    ) -> Result<String> {
        let direction = if source_language.is_empty() {
            format!("- Detect the source language and translate to {target_language}.\n")
        } else {
            format!("- Translate from {source_language} to {target_language}.\n")
        };
        let mut system = format!(
            concat!(
                "You are a professional localization engine.\n",
                "{}",
                "- Preserve placeholders and format specifiers verbatim, e.g. {{like_this}}, %@, %d, %1$@.\n",
                "- Preserve leading and trailing whitespace, including newlines.\n",
                "- Output MUST be only the translated text: no quotes, no code fences, no labels, no explanations.\n",
            ),
            direction,
        );
        if let Some(comment) = comment {
            system.push_str(&format!("- Context from the developer: {comment}\n"));
        }

        let raw = self.chat(system, text.to_string(), 1.0).await?;
        let cleaned = strip_wrapping_quotes(&raw);
        if cleaned.is_empty() && !text.is_empty() {
            return Err(LocsmithError::NoTranslationReturned.into());
        }
        Ok(cleaned.to_string())
    }

    fn supports_evaluation(&self) -> bool {
        true
    }

    async fn evaluate(
        &self,
        source: &str,
        translation: &str,
        language: &str,
        comment: Option<&str>,
    ) -> Result<Verdict> {
        let mut system = format!(
            concat!(
                "You review translations for quality.\n",
                "- The user message is a JSON object with the source text and its {} translation.\n",
                "- Respond with ONLY a JSON object: {{\"quality\": \"good\" or \"poor\", \"explanation\": \"...\"}}.\n",
                "- \"good\" means accurate and natural; anything misleading, broken, or unnatural is \"poor\".\n",
            ),
            language,
        );
        if let Some(comment) = comment {
            system.push_str(&format!("- Context from the developer: {comment}\n"));
        }
        let user = serde_json::json!({
            "source": source,
            "translation": translation,
        })
        .to_string();

        let raw = self.chat(system, user, 0.0).await?;
        let verdict: Verdict = serde_json::from_str(extract_json_object(&raw))
            .with_context(|| format!("Unexpected evaluation response: {raw}"))?;
        Ok(verdict)
    }
}

// The model occasionally wraps its answer in quotes despite instructions.
// Only a matched pair is stripped; inner whitespace stays intact.
fn strip_wrapping_quotes(raw: &str) -> &str {
    for (open, close) in [("\"", "\""), ("\u{201c}", "\u{201d}"), ("'", "'")] {
        if raw.len() >= open.len() + close.len()
            && raw.starts_with(open)
            && raw.ends_with(close)
        {
            return &raw[open.len()..raw.len() - close.len()];
        }
    }
    raw
}

// Tolerates code fences around the verdict object.
fn extract_json_object(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[derive(Default)]
struct UsageCounters {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
    requests: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenUsageSnapshot {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub requests: u64,
}
