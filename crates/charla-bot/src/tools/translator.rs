//! Translation adapter with a backend fallback chain
//!
//! Free translation services degrade without warning, and a common failure
//! signature is echoing the input back unchanged. The adapter therefore
//! holds an ordered chain of interchangeable backends and walks it until
//! one produces a non-degenerate result, recording which backend answered.

use std::time::Duration;

use async_trait::async_trait;
use charla_agent::{Tool, ToolResult};
use serde::Deserialize;
use thiserror::Error;

use crate::lang::{self, Lang};
use crate::router::TranslationQuery;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest input the adapter accepts, in characters
pub const MAX_TEXT_LEN: usize = 1000;

/// Default LibreTranslate-style endpoint
pub const DEFAULT_LIBRE_URL: &str = "https://libretranslate.com/translate";

/// Default MyMemory-style endpoint
pub const DEFAULT_MYMEMORY_URL: &str = "https://api.mymemory.translated.net/get";

/// Translation adapter errors
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("text is empty")]
    EmptyText,

    #[error("text exceeds {MAX_TEXT_LEN} characters")]
    InputTooLong,

    #[error("no translation backend produced a usable result")]
    Unavailable,
}

impl TranslateError {
    /// User-facing error text
    pub fn user_message(&self) -> String {
        match self {
            TranslateError::EmptyText => {
                "❌ No encontré texto para traducir. Ejemplo: traduce 'hello' al español"
                    .to_string()
            }
            TranslateError::InputTooLong => format!(
                "❌ Texto demasiado largo. Máximo {} caracteres.",
                MAX_TEXT_LEN
            ),
            TranslateError::Unavailable => {
                "❌ El servicio de traducción no está disponible. Intenta más tarde.".to_string()
            }
        }
    }
}

/// Errors from an individual backend attempt
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// A completed translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub original: String,
    pub translated: String,
    pub source: String,
    pub target: String,
    /// Which backend in the chain answered
    pub backend: &'static str,
}

/// One interchangeable translation service
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Backend name for logging and the result record
    fn name(&self) -> &'static str;

    /// Translate `text` between two concrete language codes
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, BackendError>;
}

/// LibreTranslate-style backend: POST JSON, `translatedText` in the body
pub struct LibreBackend {
    http: reqwest::Client,
    base_url: String,
}

impl LibreBackend {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_LIBRE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for LibreBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibreResponse {
    translated_text: Option<String>,
}

#[async_trait]
impl TranslationBackend for LibreBackend {
    fn name(&self) -> &'static str {
        "libretranslate"
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, BackendError> {
        let response = self
            .http
            .post(&self.base_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({
                "q": text,
                "source": source,
                "target": target,
                "format": "text",
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: LibreResponse = response.json().await?;
        body.translated_text
            .ok_or_else(|| BackendError::UnexpectedResponse("missing translatedText".into()))
    }
}

/// MyMemory-style backend: GET with `langpair`, nested response data
pub struct MyMemoryBackend {
    http: reqwest::Client,
    base_url: String,
}

impl MyMemoryBackend {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_MYMEMORY_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for MyMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: Option<MyMemoryData>,
}

#[derive(Debug, Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

#[async_trait]
impl TranslationBackend for MyMemoryBackend {
    fn name(&self) -> &'static str {
        "mymemory"
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, BackendError> {
        let langpair = format!("{}|{}", source, target);
        let response = self
            .http
            .get(&self.base_url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: MyMemoryResponse = response.json().await?;
        body.response_data
            .and_then(|d| d.translated_text)
            .ok_or_else(|| BackendError::UnexpectedResponse("missing translatedText".into()))
    }
}

/// The adapter: input validation, source resolution, and the chain walk
pub struct Translator {
    backends: Vec<Box<dyn TranslationBackend>>,
}

impl Translator {
    /// Build the default chain: LibreTranslate first, MyMemory second
    pub fn new() -> Self {
        Self {
            backends: vec![
                Box::new(LibreBackend::new()),
                Box::new(MyMemoryBackend::new()),
            ],
        }
    }

    /// Build with an explicit backend chain (tried in order)
    pub fn with_backends(backends: Vec<Box<dyn TranslationBackend>>) -> Self {
        Self { backends }
    }

    /// Translate, walking the chain until a usable result appears
    pub async fn translate(&self, query: &TranslationQuery) -> Result<Translation, TranslateError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Err(TranslateError::EmptyText);
        }
        if text.chars().count() > MAX_TEXT_LEN {
            return Err(TranslateError::InputTooLong);
        }

        let source = resolve_source(text, &query.source, &query.target);
        tracing::info!(%source, target = %query.target, chars = text.len(), "translating");

        for backend in &self.backends {
            match backend.translate(text, &source, &query.target).await {
                Ok(translated) if !is_degenerate(text, &translated) => {
                    return Ok(Translation {
                        original: text.to_string(),
                        translated,
                        source,
                        target: query.target.clone(),
                        backend: backend.name(),
                    });
                }
                Ok(_) => {
                    tracing::warn!(backend = backend.name(), "backend echoed the input, trying next");
                }
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "backend failed, trying next");
                }
            }
        }

        Err(TranslateError::Unavailable)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve an "auto" source to a concrete code the backends accept
fn resolve_source(text: &str, source: &str, target: &str) -> String {
    if source != "auto" && !source.is_empty() {
        return source.to_lowercase();
    }
    match lang::detect_language(text) {
        Some(detected) => detected.code().to_string(),
        // Undetectable: assume the text is in the language opposite the target
        None if target == "es" => Lang::En.code().to_string(),
        None => Lang::Es.code().to_string(),
    }
}

/// A result equal to the input (modulo case and whitespace) is the known
/// failure signature of a degraded free backend.
fn is_degenerate(input: &str, output: &str) -> bool {
    let output = output.trim();
    output.is_empty() || output.eq_ignore_ascii_case(input.trim())
}

/// Format a translation for display
pub fn format_translation(t: &Translation) -> String {
    format!(
        "🌍 {} → {}\n{}\n➡️ {}\n\n_Traducción automática — {}_",
        lang::language_name(&t.source),
        lang::language_name(&t.target),
        t.original,
        t.translated,
        t.backend,
    )
}

#[async_trait]
impl Tool for Translator {
    fn name(&self) -> &str {
        "translate_text"
    }

    fn description(&self) -> &str {
        "Translate text between languages. Detects the source language \
         automatically; target is an ISO 639-1 code such as 'es', 'en', 'fr'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Text to translate" },
                "source": { "type": "string", "description": "Source language code, or 'auto'" },
                "target": { "type": "string", "description": "Target language code (e.g. 'es')" }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolResult {
        let text = match arguments.get("text").and_then(|v| v.as_str()) {
            Some(t) => t.to_string(),
            None => return ToolResult::error("Missing 'text' argument"),
        };
        let source = arguments
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("auto")
            .to_string();
        let target = arguments
            .get("target")
            .and_then(|v| v.as_str())
            .unwrap_or("es")
            .to_string();

        let query = TranslationQuery {
            text,
            source,
            target,
        };

        match self.translate(&query).await {
            Ok(translation) => ToolResult::text(format_translation(&translation)),
            Err(e) => {
                tracing::warn!(error = %e, "translation failed");
                ToolResult::error(e.user_message())
            }
        }
    }
}
