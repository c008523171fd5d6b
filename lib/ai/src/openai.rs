//! OpenAI-compatible HTTP backend.
//!
//! Talks to any service exposing the `/chat/completions` endpoint (OpenAI,
//! Groq, Ollama, vLLM...). Structured output uses `response_format` with a
//! JSON schema; tools are declared as functions.

use crate::backend::{LlmBackend, LlmRequest, LlmResponse, TokenUsage, ToolInvocation, Turn};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default endpoint: Groq's OpenAI-compatible API.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Configuration for an OpenAI-compatible backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmBackendConfig {
    /// Base URL for the API, without the `/chat/completions` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key (if required).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for LlmBackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Backend for OpenAI-compatible chat completion APIs.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    config: LlmBackendConfig,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new(config: LlmBackendConfig) -> Result<Self, LlmError> {
        if config.timeout_seconds == 0 {
            return Err(LlmError::InvalidConfig {
                reason: "timeout_seconds must be greater than zero".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &LlmBackendConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = self.endpoint();
        let body = ChatRequest::from_request(request);

        debug!(
            endpoint = %url,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "posting chat completion"
        );

        let mut http = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.config.api_key
            && !api_key.is_empty()
        {
            http = http.bearer_auth(api_key);
        }

        let response = http.send().await.map_err(|e| {
            warn!(error = %e, endpoint = %url, "failed to reach completion service");
            if e.is_timeout() {
                LlmError::Timeout {
                    timeout_secs: self.config.timeout_seconds,
                }
            } else {
                LlmError::RequestFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = %url, status = %status, body = %body, "completion service returned error");

            return Err(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                LlmError::RateLimited { retry_after_secs }
            } else if status.is_server_error() {
                LlmError::ProviderUnavailable {
                    provider: self.config.base_url.clone(),
                    reason: format!("HTTP {status}: {body}"),
                }
            } else {
                LlmError::RequestFailed {
                    reason: format!("HTTP {status}: {body}"),
                }
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| LlmError::ResponseParseFailed {
            reason: e.to_string(),
        })?;

        parsed.into_response(request)
    }

    fn provider(&self) -> &str {
        "openai_compatible"
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<JsonValue>,
}

impl<'a> ChatRequest<'a> {
    fn from_request(request: &'a LlmRequest) -> Self {
        let response_format = request.output_schema.as_ref().map(|schema| {
            serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": schema.strict,
                }
            })
        });

        let tools = request
            .tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect();

        Self {
            model: &request.model,
            messages: build_messages(request),
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            response_format,
            tools,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Flattens a request into chat messages.
///
/// Consecutive tool-call turns become one assistant message carrying all the
/// calls, which must precede their `tool` result messages.
fn build_messages(request: &LlmRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.context.len() + 2);

    if let Some(instructions) = &request.instructions {
        messages.push(ChatMessage::text("system", instructions.clone()));
    }

    for turn in &request.context {
        match turn {
            Turn::Message { role, content } => {
                messages.push(ChatMessage::text(role.as_str(), content.clone()));
            }
            Turn::ToolCall(call) => {
                let wire = WireToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: WireFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                };
                match messages.last_mut() {
                    Some(last) if last.role == "assistant" && !last.tool_calls.is_empty() => {
                        last.tool_calls.push(wire);
                    }
                    _ => messages.push(ChatMessage {
                        role: "assistant",
                        content: None,
                        tool_calls: vec![wire],
                        tool_call_id: None,
                    }),
                }
            }
            Turn::ToolResult {
                tool_call_id,
                output,
            } => messages.push(ChatMessage {
                role: "tool",
                content: Some(output.clone()),
                tool_calls: Vec::new(),
                tool_call_id: Some(tool_call_id.clone()),
            }),
        }
    }

    if !request.input.is_empty() {
        messages.push(ChatMessage::text("user", request.input.clone()));
    }

    messages
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl ChatResponse {
    fn into_response(self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(LlmError::ResponseParseFailed {
                reason: "response contained no choices".to_string(),
            });
        };

        let content = choice.message.content.unwrap_or_default();
        let structured_output = request
            .output_schema
            .as_ref()
            .and_then(|_| serde_json::from_str(content.trim()).ok());

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolInvocation::new(call.id, call.function.name, call.function.arguments))
            .collect();

        let usage = self
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            structured_output,
            tool_calls,
            usage,
            model: self.model.unwrap_or_else(|| request.model.clone()),
        })
    }
}
