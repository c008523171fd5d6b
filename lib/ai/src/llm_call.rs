//! LLM Call primitive.
//!
//! The fundamental operation: one request to the completion service with
//! optional structured output. Every pipeline step is an `LlmCall`.

use crate::backend::{LlmBackend, LlmRequest, LlmResponse, TokenUsage, Turn};
use crate::error::{ExtractionError, LlmError};
use crate::schema::OutputSchema;
use crate::tool::ToolDefinition;
use llm_flows_core::LlmInvocationId;
use rootcause::prelude::ResultExt;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Sampling parameters shared by the calls of a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    /// Temperature for sampling.
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff.
    pub top_p: Option<f32>,
}

impl Sampling {
    /// Deterministic sampling: temperature 0, top-p 1.
    #[must_use]
    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.0),
            top_p: Some(1.0),
        }
    }
}

/// The result of an LLM Call.
#[derive(Debug, Clone)]
pub struct LlmCallResult {
    /// Unique identifier for this invocation.
    pub id: LlmInvocationId,
    /// The raw response.
    pub response: LlmResponse,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// The typed result of a structured extraction.
#[derive(Debug, Clone)]
pub struct Extracted<T> {
    /// Unique identifier for this invocation.
    pub id: LlmInvocationId,
    /// The validated value.
    pub value: T,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// An LLM Call executor.
///
/// A builder over [`LlmRequest`] that runs the request against a backend,
/// assigns it an invocation id and measures its latency.
#[derive(Debug, Clone)]
pub struct LlmCall {
    request: LlmRequest,
}

impl LlmCall {
    /// Creates a new call for the given model and input.
    #[must_use]
    pub fn new(model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            request: LlmRequest::new(model, input),
        }
    }

    /// Wraps an already-built request.
    #[must_use]
    pub fn from_request(request: LlmRequest) -> Self {
        Self { request }
    }

    /// Adds system instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.request.instructions = Some(instructions.into());
        self
    }

    /// Applies sampling parameters.
    #[must_use]
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.request.temperature = sampling.temperature;
        self.request.top_p = sampling.top_p;
        self
    }

    /// Sets the prior conversation turns.
    #[must_use]
    pub fn with_context(mut self, context: Vec<Turn>) -> Self {
        self.request.context = context;
        self
    }

    /// Declares tools the service may call.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.request.tools = tools;
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.max_tokens = Some(max_tokens);
        self
    }

    /// Returns the request this call will send.
    #[must_use]
    pub fn request(&self) -> &LlmRequest {
        &self.request
    }

    /// Sends the request and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged.
    #[instrument(skip_all, fields(provider = backend.provider(), model = %self.request.model))]
    pub async fn execute(&self, backend: &dyn LlmBackend) -> Result<LlmCallResult, LlmError> {
        let id = LlmInvocationId::new();
        debug!(
            invocation = %id,
            context_turns = self.request.context.len(),
            tools = self.request.tools.len(),
            structured = self.request.output_schema.is_some(),
            "sending completion request"
        );

        let started = Instant::now();
        let result = backend.generate(&self.request).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => {
                debug!(
                    invocation = %id,
                    latency_ms,
                    tool_calls = response.tool_calls.len(),
                    tokens = response.usage.total(),
                    "completion received"
                );
                Ok(LlmCallResult {
                    id,
                    response,
                    latency_ms,
                })
            }
            Err(e) => {
                warn!(invocation = %id, latency_ms, error = %e, "completion request failed");
                Err(e)
            }
        }
    }

    /// Sends the request constrained to the schema of `T` and returns the
    /// validated value.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Transport`, caused by the backend's
    /// `LlmError`, if the backend fails, and
    /// `ExtractionError::SchemaValidation` if the response does not conform.
    pub async fn extract<T>(
        self,
        backend: &dyn LlmBackend,
    ) -> llm_flows_core::Result<Extracted<T>, ExtractionError>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let schema = OutputSchema::for_type::<T>();
        let schema_name = schema.name.clone();
        let call = Self {
            request: self.request.with_output_schema(schema.clone()),
        };

        let result = call
            .execute(backend)
            .await
            .context_with(|| ExtractionError::Transport {
                schema: schema_name.clone(),
            })?;

        let value = schema.parse::<T>(&result.response).inspect_err(|e| {
            warn!(invocation = %result.id, schema = %schema_name, error = %e, "structured output rejected");
        })?;

        Ok(Extracted {
            id: result.id,
            value,
            usage: result.response.usage,
            latency_ms: result.latency_ms,
        })
    }
}
