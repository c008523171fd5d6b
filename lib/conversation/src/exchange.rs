//! Single-round tool-call exchange.
//!
//! One request declares the registered tools. Every tool call in the reply
//! is resolved locally and its output appended to the conversation, then a
//! second request asks for the final answer. Tool calls in the second reply
//! are not followed.

use crate::conversation::Conversation;
use crate::error::ExchangeError;
use crate::tool::ToolRegistry;
use llm_flows_ai::{LlmBackend, LlmCall, ToolInvocation, Turn};
use rootcause::prelude::ResultExt;
use tracing::{info, instrument};

/// Instruction for the follow-up request.
pub const FOLLOW_UP_INSTRUCTION: &str =
    "Answer with an analysis based on the data returned by the function.";

/// Outcome of a tool-call exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExchange {
    /// Final answer text.
    pub answer: String,
    /// Every turn of the exchange, including tool calls and results.
    pub conversation: Conversation,
    /// The tool calls that were resolved, in the order they were requested.
    pub tool_calls: Vec<ToolInvocation>,
}

/// Runs one tool-call round trip.
///
/// `call` carries the question, model and sampling; the registry's tools are
/// declared on both requests. If the first reply requests no tools its text
/// is the answer and no second request is made.
///
/// # Errors
///
/// `ExchangeError::Transport` if either request fails, and
/// `ExchangeError::Tool` if any requested call cannot be resolved, including
/// calls to tools that are not registered (see [`is_unknown_tool`]).
///
/// [`is_unknown_tool`]: crate::error::is_unknown_tool
#[instrument(skip_all, fields(tools = registry.len()))]
pub async fn exchange(
    backend: &dyn LlmBackend,
    registry: &ToolRegistry,
    call: LlmCall,
    follow_up: &str,
) -> llm_flows_core::Result<ToolExchange, ExchangeError> {
    let call = call.with_tools(registry.definitions());

    let mut conversation = Conversation::new();
    for turn in &call.request().context {
        conversation.push(turn.clone());
    }
    if !call.request().input.is_empty() {
        conversation.push(Turn::user(call.request().input.clone()));
    }

    let first = call
        .execute(backend)
        .await
        .context(ExchangeError::Transport { phase: "initial" })?;

    if !first.response.has_tool_calls() {
        info!(conversation = %conversation.id(), "answered without tool calls");
        conversation.push(Turn::assistant(first.response.content.clone()));
        return Ok(ToolExchange {
            answer: first.response.content,
            conversation,
            tool_calls: Vec::new(),
        });
    }

    let tool_calls = first.response.tool_calls;
    let mut outputs = Vec::with_capacity(tool_calls.len());
    for invocation in &tool_calls {
        let output = registry
            .execute(invocation)
            .await
            .context_with(|| ExchangeError::Tool {
                name: invocation.name.clone(),
                call_id: invocation.id.clone(),
            })?;
        outputs.push(output);
    }

    // Calls first, then one result per call, so the service sees a single
    // assistant turn followed by its results.
    for invocation in &tool_calls {
        conversation.push(Turn::ToolCall(invocation.clone()));
    }
    for (invocation, output) in tool_calls.iter().zip(outputs) {
        conversation.push(Turn::tool_result(invocation.id.clone(), output));
    }

    let mut request = call.request().clone();
    request.input = String::new();
    request.instructions = Some(follow_up.to_string());
    request.context = conversation.turns().to_vec();

    let second = LlmCall::from_request(request)
        .execute(backend)
        .await
        .context(ExchangeError::Transport { phase: "follow-up" })?;

    info!(
        conversation = %conversation.id(),
        tool_calls = tool_calls.len(),
        "tool exchange complete"
    );
    conversation.push(Turn::assistant(second.response.content.clone()));

    Ok(ToolExchange {
        answer: second.response.content,
        conversation,
        tool_calls,
    })
}
