//! AI primitives for llm-flows.
//!
//! This crate provides the building blocks every pipeline is made of:
//!
//! - **LLM Call**: single request to a completion service, optionally
//!   constrained to a JSON schema derived from a Rust type
//! - **Backends**: the [`LlmBackend`] seam and an OpenAI-compatible HTTP
//!   implementation
//! - **Output schemas**: strict schema generation and fail-closed validation
//!
//! Pipelines in `llm-flows-workflow` compose these primitives.

pub mod backend;
pub mod error;
pub mod llm_call;
pub mod openai;
pub mod prompt;
pub mod schema;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tool;

pub use backend::{LlmBackend, LlmRequest, LlmResponse, MessageRole, TokenUsage, ToolInvocation, Turn};
pub use error::{ExtractionError, LlmError, PromptError};
pub use llm_call::{Extracted, LlmCall, LlmCallResult, Sampling};
pub use openai::{LlmBackendConfig, OpenAiCompatibleBackend};
pub use prompt::PromptTemplate;
pub use schema::OutputSchema;
pub use tool::ToolDefinition;
