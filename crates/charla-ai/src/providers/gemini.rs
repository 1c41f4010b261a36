//! Google Gemini `generateContent` provider

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    backend::ChatBackend,
    error::{Error, Result},
    types::{AssistantMetadata, Content, Context, Message, StopReason, Usage},
};

/// Total request timeout. External calls are bounded; a hung upstream
/// degrades to an error, not a stuck message handler.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default model id
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API client
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from the `GEMINI_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| Error::InvalidApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Override the model id
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The configured model id
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, context: &Context) -> GeminiRequest {
        let contents = context.messages.iter().map(convert_message).collect();

        let tools = if context.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTools {
                function_declarations: context
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            system_instruction: context.system_prompt.as_ref().map(|s| GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(s)],
            }),
            contents,
            tools,
            generation_config: context.temperature.map(|t| GenerationConfig {
                temperature: Some(t),
            }),
        }
    }
}

#[async_trait::async_trait]
impl ChatBackend for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, context: &Context) -> Result<Message> {
        let request = self.build_request(context);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        tracing::debug!(model = %self.model, messages = context.messages.len(), "gemini request");

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_str().to_string(), body));
        }

        let body: GeminiResponse = response.json().await?;
        parse_response(body, &self.model)
    }
}

fn convert_message(msg: &Message) -> GeminiContent {
    match msg {
        Message::User { content, .. } => GeminiContent {
            role: Some("user".to_string()),
            parts: content
                .iter()
                .filter_map(|c| c.as_text().map(GeminiPart::text))
                .collect(),
        },
        Message::Assistant { content, .. } => GeminiContent {
            role: Some("model".to_string()),
            parts: content
                .iter()
                .map(|c| match c {
                    Content::Text { text } => GeminiPart::text(text),
                    Content::ToolCall {
                        name, arguments, ..
                    } => GeminiPart {
                        function_call: Some(GeminiFunctionCall {
                            name: name.clone(),
                            args: arguments.clone(),
                        }),
                        ..Default::default()
                    },
                })
                .collect(),
        },
        // Gemini expects function responses as user-role parts; the
        // tool-call id is ours alone and is not sent back.
        Message::ToolResult {
            tool_name,
            content,
            is_error,
            ..
        } => GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                function_response: Some(GeminiFunctionResponse {
                    name: tool_name.clone(),
                    response: serde_json::json!({
                        "content": content,
                        "is_error": is_error,
                    }),
                }),
                ..Default::default()
            }],
        },
    }
}

fn parse_response(body: GeminiResponse, model: &str) -> Result<Message> {
    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("no candidates in response".to_string()))?;

    let mut content = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(text) = part.text {
            content.push(Content::text(text));
        }
        if let Some(call) = part.function_call {
            // Gemini does not assign call ids; synthesize one so tool
            // results can be correlated locally.
            content.push(Content::tool_call(
                Uuid::new_v4().to_string(),
                call.name,
                call.args,
            ));
        }
    }

    let has_tool_calls = content.iter().any(Content::is_tool_call);
    let stop_reason = match candidate.finish_reason.as_deref() {
        Some("MAX_TOKENS") => StopReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST") => {
            StopReason::Blocked
        }
        _ if has_tool_calls => StopReason::ToolUse,
        _ => StopReason::Stop,
    };

    let usage = body
        .usage_metadata
        .map(|u| Usage {
            input: u.prompt_token_count,
            output: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(Message::Assistant {
        content,
        metadata: AssistantMetadata {
            model: Some(model.to_string()),
            usage,
            stop_reason: Some(stop_reason),
            timestamp: chrono::Utc::now().timestamp_millis(),
        },
    })
}

// ---- Wire types ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTools>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}
