//! Core types shared by the llm-flows crates.
//!
//! This crate provides strongly-typed identifiers for the transient entities
//! a pipeline run creates, and the rootcause-based `Result` alias every
//! layer reports failures through.

pub mod error;
pub mod id;

pub use error::{Result, find_context};
pub use id::{ConversationId, LlmInvocationId, ParseIdError, PipelineRunId};
