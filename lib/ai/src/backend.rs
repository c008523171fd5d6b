//! Completion backend abstraction.
//!
//! Provides a unified interface to the external completion service. Pipelines
//! only ever see [`LlmBackend`], so tests can substitute a scripted backend
//! for the HTTP one.

use crate::error::LlmError;
use crate::schema::OutputSchema;
use crate::tool::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A request to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Model identifier.
    pub model: String,
    /// Primary input text, sent as the final user turn. Empty when the whole
    /// input lives in `context`.
    pub input: String,
    /// System instructions, if any.
    pub instructions: Option<String>,
    /// Prior conversation turns, oldest first.
    pub context: Vec<Turn>,
    /// Schema the output must conform to.
    pub output_schema: Option<OutputSchema>,
    /// Tools the service may ask the caller to run.
    pub tools: Vec<ToolDefinition>,
    /// Temperature for sampling.
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff.
    pub top_p: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    /// Creates a new request with just a model and an input.
    #[must_use]
    pub fn new(model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            instructions: None,
            context: Vec::new(),
            output_schema: None,
            tools: Vec::new(),
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }

    /// Adds system instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Sets the prior conversation turns.
    #[must_use]
    pub fn with_context(mut self, context: Vec<Turn>) -> Self {
        self.context = context;
        self
    }

    /// Adds an output schema for structured output.
    #[must_use]
    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Declares the tools available for this request.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Returns the tool-result turns carried in the context.
    pub fn tool_results(&self) -> impl Iterator<Item = (&str, &str)> {
        self.context.iter().filter_map(|turn| match turn {
            Turn::ToolResult {
                tool_call_id,
                output,
            } => Some((tool_call_id.as_str(), output.as_str())),
            _ => None,
        })
    }
}

/// One entry of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    /// A plain message.
    Message { role: MessageRole, content: String },
    /// A tool invocation requested by the service.
    ToolCall(ToolInvocation),
    /// The output of a local tool, correlated by call id.
    ToolResult {
        tool_call_id: String,
        output: String,
    },
}

impl Turn {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::Message {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Message {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Creates a tool result entry.
    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            output: output.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
    /// System message.
    System,
}

impl MessageRole {
    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// A tool invocation requested by the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Correlates this call with its result.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// Serialized JSON arguments, as sent by the service.
    pub arguments: String,
}

impl ToolInvocation {
    /// Creates a new tool invocation.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parses the serialized arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid JSON.
    pub fn parse_arguments(&self) -> serde_json::Result<JsonValue> {
        serde_json::from_str(&self.arguments)
    }
}

/// A response from the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub content: String,
    /// Structured output (if an output schema was requested and the text
    /// parsed as JSON).
    pub structured_output: Option<JsonValue>,
    /// Tool invocations requested by the service.
    pub tool_calls: Vec<ToolInvocation>,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
}

impl LlmResponse {
    /// Creates a plain text response.
    #[must_use]
    pub fn text(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            structured_output: None,
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
            model: model.into(),
        }
    }

    /// Creates a structured response whose text is the serialized value.
    #[must_use]
    pub fn structured(model: impl Into<String>, value: JsonValue) -> Self {
        Self {
            content: value.to_string(),
            structured_output: Some(value),
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
            model: model.into(),
        }
    }

    /// Creates a response that only requests tool invocations.
    #[must_use]
    pub fn tool_calls(model: impl Into<String>, tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            content: String::new(),
            structured_output: None,
            tool_calls,
            usage: TokenUsage::default(),
            model: model.into(),
        }
    }

    /// Returns true if the service asked for tool invocations.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Returns the total number of tokens.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Trait for completion backends.
///
/// One call to [`LlmBackend::generate`] is one network round trip. Backends
/// never retry.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generates a response for the given request.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion service call fails.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Returns a short provider name for logs.
    fn provider(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_request_builder() {
        let request = LlmRequest::new("llama", "Alexandre and Paolla go to the movies on Monday")
            .with_instructions("Extract the event information");

        assert_eq!(request.model, "llama");
        assert_eq!(
            request.instructions.as_deref(),
            Some("Extract the event information")
        );
        assert_eq!(request.temperature, None);
        assert_eq!(request.max_tokens, None);
        assert!(request.tools.is_empty());
        assert!(request.output_schema.is_none());
    }

    #[test]
    fn tool_results_filters_context() {
        let request = LlmRequest::new("llama", "").with_context(vec![
            Turn::user("What is Apple's share price?"),
            Turn::ToolCall(ToolInvocation::new("call_1", "get_stock", r#"{"ticker":"AAPL"}"#)),
            Turn::tool_result("call_1", r#"{"ticker":"AAPL"}"#),
        ]);

        let results: Vec<_> = request.tool_results().collect();
        assert_eq!(results, vec![("call_1", r#"{"ticker":"AAPL"}"#)]);
    }

    #[test]
    fn turn_serde_is_tagged() {
        let turn = Turn::tool_result("call_9", "42");
        let json = serde_json::to_value(&turn).expect("serialize");
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_call_id"], "call_9");

        let call = Turn::ToolCall(ToolInvocation::new("call_9", "get_stock", "{}"));
        let json = serde_json::to_value(&call).expect("serialize");
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["name"], "get_stock");
    }

    #[test]
    fn tool_invocation_parses_arguments() {
        let call = ToolInvocation::new("call_1", "get_stock", r#"{"ticker":"NVDA"}"#);
        let args = call.parse_arguments().expect("valid json");
        assert_eq!(args["ticker"], "NVDA");

        let broken = ToolInvocation::new("call_2", "get_stock", "{ticker:");
        assert!(broken.parse_arguments().is_err());
    }

    #[test]
    fn response_constructors() {
        let structured = LlmResponse::structured("llama", serde_json::json!({"ok": true}));
        assert_eq!(structured.content, r#"{"ok":true}"#);
        assert!(!structured.has_tool_calls());

        let calls = LlmResponse::tool_calls(
            "llama",
            vec![ToolInvocation::new("call_1", "get_stock", "{}")],
        );
        assert!(calls.has_tool_calls());
        assert!(calls.content.is_empty());
    }

    #[test]
    fn token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }
}
