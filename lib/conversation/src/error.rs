//! Error types for the conversation crate.
//!
//! - `ToolError`: a single tool invocation failed
//! - `ExchangeError`: a tool-call round trip failed; the cause is the child
//!   report underneath it

use llm_flows_core::find_context;
use rootcause::Report;
use thiserror::Error;

/// Errors from tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// The service asked for a tool that is not registered.
    #[error("unknown tool '{name}'")]
    UnknownTool { name: String },
    /// The argument payload is not a JSON object or misses a parameter.
    #[error("invalid arguments for tool '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },
    /// The tool ran and failed.
    #[error("tool '{name}' execution failed: {reason}")]
    ExecutionFailed { name: String, reason: String },
}

/// Errors from a tool-call exchange.
///
/// The failing `LlmError` or `ToolError` is kept as the child of the report
/// this context sits on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// A completion request failed.
    #[error("{phase} completion request failed")]
    Transport { phase: &'static str },
    /// A requested tool call could not be resolved.
    #[error("tool call '{call_id}' to '{name}' failed")]
    Tool { name: String, call_id: String },
}

/// Returns true if the report was caused by a call to an unregistered tool.
#[must_use]
pub fn is_unknown_tool<C: ?Sized>(report: &Report<C>) -> bool {
    matches!(
        find_context::<ToolError, C>(report),
        Some(ToolError::UnknownTool { .. })
    )
}
