//! Stock question answering with a tool-call round trip.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use llm_flows_conversation::{FOLLOW_UP_INSTRUCTION, ToolExchange, ToolRegistry, exchange};
use llm_flows_market::{QuoteSource, StockLookupTool};
use rootcause::prelude::ResultExt;
use std::sync::Arc;
use tracing::{info, instrument};

const PIPELINE: &str = "stock";

/// Builds a registry offering the `get_stock` tool over `source`.
#[must_use]
pub fn stock_tools(source: Arc<dyn QuoteSource>) -> ToolRegistry {
    ToolRegistry::new().with_tool(StockLookupTool::new(source))
}

/// Answers a question, letting the model look up stocks.
///
/// # Errors
///
/// Returns `PipelineError::StageFailed` if a request fails or the model asks
/// for a tool that is not registered.
#[instrument(skip_all, fields(tools = tools.len()))]
pub async fn answer_stock_question(
    ctx: &PipelineContext,
    tools: &ToolRegistry,
    question: &str,
) -> llm_flows_core::Result<ToolExchange, PipelineError> {
    let result = exchange(ctx.backend(), tools, ctx.call(question), FOLLOW_UP_INSTRUCTION)
        .await
        .context(PipelineError::StageFailed {
            pipeline: PIPELINE,
            stage: "exchange",
        })?;

    info!(
        conversation = %result.conversation.id(),
        tool_calls = result.tool_calls.len(),
        "stock question answered"
    );
    Ok(result)
}
