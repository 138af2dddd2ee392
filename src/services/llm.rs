use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::core::extraction::{AnswerExtractor, Extraction, ExtractionContext, ExtractorError};
use crate::core::schema::{self, FieldDomain};
use crate::core::FieldId;
use crate::models::{ChatMessage, ChatRole};

/// Name of the callable function declared to the completion gateway
pub const EXTRACT_FUNCTION_NAME: &str = "extract_profile_data";

/// Errors that can occur when calling the completion gateway
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("rate limited by the completion gateway")]
    RateLimited,

    #[error("authentication failed")]
    Unauthorized,

    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),
}

impl LlmError {
    /// Transient failures worth another attempt; definitive rejections
    /// (bad request, bad key) are not
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RequestError(_)
                | LlmError::RateLimited
                | LlmError::Unavailable(_)
                | LlmError::Timeout(_)
        )
    }
}

/// Completion gateway settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// What one completion call produced: free text, extracted field values,
/// or both
#[derive(Debug, Clone, Default)]
pub struct LlmReply {
    pub content: Option<String>,
    pub extracted: Option<Value>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// The completion call is the only suspension point of a dialogue turn, so
/// it carries the bounded timeout and the retry policy: exponential backoff
/// on 429/5xx/network failures, immediate failure on definitive rejections.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// One chat completion with the extraction function declared.
    pub async fn chat(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<LlmReply, LlmError> {
        let request = self.build_request(system_prompt, history, message);

        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(reply) => return Ok(reply),
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    let delay = Duration::from_secs(1 << attempt);
                    tracing::warn!(
                        "Completion call failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        err
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<LlmReply, LlmError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout_secs)
                } else {
                    LlmError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::Unauthorized,
                429 => LlmError::RateLimited,
                400 => LlmError::InvalidRequest(body),
                500..=599 => LlmError::Unavailable(format!("{}: {}", status, body)),
                _ => LlmError::InvalidResponse(format!("unexpected status {}", status)),
            });
        }

        let body = response.text().await?;
        parse_reply(&body)
    }

    fn build_request(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> ChatRequest {
        let mut messages = vec![WireMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        }];

        for msg in history {
            messages.push(WireMessage {
                role: match msg.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            });
        }

        messages.push(WireMessage {
            role: "user".to_string(),
            content: message.to_string(),
        });

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            tools: vec![extraction_tool()],
            tool_choice: "auto".to_string(),
            temperature: 0.3,
        }
    }
}

/// Parse a chat-completions response body into content + extracted values.
///
/// A malformed tool-call payload degrades to no-extraction rather than a
/// turn failure; the dialogue must keep moving.
pub fn parse_reply(body: &str) -> Result<LlmReply, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

    let content = choice
        .message
        .content
        .filter(|text| !text.trim().is_empty());

    let extracted = choice
        .message
        .tool_calls
        .iter()
        .find(|call| call.function.name == EXTRACT_FUNCTION_NAME)
        .and_then(|call| match serde_json::from_str(&call.function.arguments) {
            Ok(args) => Some(args),
            Err(e) => {
                tracing::warn!("Discarding malformed tool-call arguments: {}", e);
                None
            }
        });

    Ok(LlmReply { content, extracted })
}

/// The "extract profile data" function declaration, generated from the
/// field catalog so the parameter schema always matches the stored domains
pub fn extraction_tool() -> Value {
    let mut properties = serde_json::Map::new();
    for field in schema::fields() {
        let prop = match field.domain {
            FieldDomain::Enum(tokens) => serde_json::json!({
                "type": "string",
                "enum": tokens,
                "description": field.prompt,
            }),
            FieldDomain::Integer { min, max } => serde_json::json!({
                "type": "integer",
                "minimum": min,
                "maximum": max,
                "description": field.prompt,
            }),
            FieldDomain::FreeText => serde_json::json!({
                "type": "string",
                "description": field.prompt,
            }),
            FieldDomain::StringArray => serde_json::json!({
                "type": "array",
                "items": { "type": "string" },
                "description": field.prompt,
            }),
        };
        properties.insert(field.id.as_str().to_string(), prop);
    }

    serde_json::json!({
        "type": "function",
        "function": {
            "name": EXTRACT_FUNCTION_NAME,
            "description": "Record profile fields the user has clearly and unambiguously answered. Omit every field the user was evasive or joking about.",
            "parameters": {
                "type": "object",
                "properties": properties,
                "additionalProperties": false,
            }
        }
    })
}

// ----- Chat completions wire types -----

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    tools: Vec<Value>,
    tool_choice: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

/// The live `AnswerExtractor`: wraps the gateway client and decodes
/// tool-call arguments into raw field updates
pub struct LlmExtractor {
    client: LlmClient,
}

impl LlmExtractor {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    fn system_prompt(ctx: &ExtractionContext<'_>) -> String {
        let mut prompt = String::from(
            "You are Diana, the friendly profile assistant of the Amora dating app. \
             You chat naturally with the user while collecting their profile, one \
             question at a time. Call extract_profile_data only for fields the user \
             answered clearly and unambiguously, normalized to the declared values. \
             If an answer is evasive, joking or empty, do not record anything for \
             that field and never guess. Keep replies short and warm.",
        );

        if let Some(target) = ctx.target {
            let spec = schema::spec(target);
            prompt.push_str(&format!(
                " The open question asks for the user's {} (\"{}\").",
                target.as_str().replace('_', " "),
                spec.prompt
            ));
        }

        prompt
    }
}

#[async_trait]
impl AnswerExtractor for LlmExtractor {
    async fn extract(&self, ctx: ExtractionContext<'_>) -> Result<Extraction, ExtractorError> {
        let system_prompt = Self::system_prompt(&ctx);

        let reply = match self.client.chat(&system_prompt, ctx.history, ctx.message).await {
            Ok(reply) => reply,
            Err(LlmError::InvalidResponse(e)) => {
                // A malformed completion body degrades to no-extraction; the
                // deterministic fallback question keeps the dialogue moving
                tracing::warn!("Malformed completion body, treating as abstention: {}", e);
                LlmReply::default()
            }
            Err(e) => return Err(ExtractorError::Upstream(e.to_string())),
        };

        let mut updates = Vec::new();
        if let Some(args) = reply.extracted.as_ref().and_then(|v| v.as_object()) {
            for (key, value) in args {
                if value.is_null() {
                    continue;
                }
                match FieldId::parse(key) {
                    Some(id) => updates.push((id, value.clone())),
                    None => tracing::debug!("Ignoring unknown extracted field '{}'", key),
                }
            }
        }

        Ok(Extraction {
            updates,
            reply: reply.content,
        })
    }
}
