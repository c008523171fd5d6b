//! Conversation state and tool calling for llm-flows.
//!
//! This crate provides:
//!
//! - **Conversation**: append-only turn history owned by one exchange
//! - **Tool Registry**: local functions the completion service may call
//! - **Exchange**: a single tool-call round trip

pub mod conversation;
pub mod error;
pub mod exchange;
pub mod tool;

pub use conversation::Conversation;
pub use error::{ExchangeError, ToolError, is_unknown_tool};
pub use exchange::{FOLLOW_UP_INSTRUCTION, ToolExchange, exchange};
pub use tool::{Tool, ToolRegistry, required_str};
