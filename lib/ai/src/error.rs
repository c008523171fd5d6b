//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `LlmError`: transport-level failures talking to the completion service
//! - `ExtractionError`: structured-output calls (a transport failure carries
//!   the `LlmError` report as its cause)
//! - `PromptError`: prompt template rendering

use thiserror::Error;

/// Errors from completion backend operations.
///
/// Every variant is a transport failure: nothing here is retried, the error
/// propagates to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// Provider is unavailable or answered with a server error.
    #[error("LLM provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },
    /// Request failed.
    #[error("LLM request failed: {reason}")]
    RequestFailed { reason: String },
    /// The response envelope could not be parsed.
    #[error("failed to parse LLM response: {reason}")]
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    #[error("LLM request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    /// Rate limit exceeded.
    #[error("rate limited{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },
    /// Invalid configuration.
    #[error("invalid LLM configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Errors from structured extraction calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    /// The completion service could not produce a response.
    #[error("extraction of '{schema}' failed")]
    Transport { schema: String },
    /// The response could not be coerced into the requested schema.
    #[error("output schema validation failed for '{schema}': {reason}")]
    SchemaValidation { schema: String, reason: String },
}

impl ExtractionError {
    /// Returns true if the failure came from the schema contract rather than
    /// the transport.
    #[must_use]
    pub fn is_schema_validation(&self) -> bool {
        matches!(self, Self::SchemaValidation { .. })
    }
}

/// Errors from prompt template operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    /// A placeholder in the template has no value.
    #[error("missing required variable '{variable}' in template '{template}'")]
    MissingVariable { template: String, variable: String },
    /// A placeholder was opened but never closed.
    #[error("unterminated placeholder in template '{template}'")]
    Unterminated { template: String },
}
