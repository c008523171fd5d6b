//! Sequential prompt chain with a confidence gate.
//!
//! Classify and score the input, stop unless it is confidently a calendar
//! event, then extract details and compose a confirmation. Each stage is one
//! structured call.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::prompts;
use crate::stage::{PipelineRun, PipelineStage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const PIPELINE: &str = "prompt_chain";

/// First-stage classification of the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EventExtraction {
    /// Raw description of the event.
    pub description: String,
    /// Whether this text describes a calendar event.
    pub is_calendar_event: bool,
    /// Confidence score between 0 and 1.
    pub confidence_score: f64,
}

/// Structured event details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventDetails {
    /// Name of the event.
    pub name: String,
    /// Date and time of the event. Use ISO 8601 format for this value.
    pub date: String,
    /// Expected duration in minutes.
    pub duration_minutes: Option<u32>,
    /// List of participants.
    pub participants: Vec<String>,
}

/// The message returned to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventConfirmation {
    /// Natural language confirmation message.
    pub confirmation_message: String,
    /// Generated calendar link, if applicable.
    pub calendar_link: Option<String>,
}

/// Runs the chain.
///
/// Returns `Ok(None)` when the input is not a calendar event or its
/// confidence does not exceed the threshold; later stages are then skipped.
///
/// # Errors
///
/// Returns `PipelineError::StageFailed` naming the stage that failed.
#[instrument(skip_all, fields(input_len = text.len()))]
pub async fn process_calendar_request(
    ctx: &PipelineContext,
    text: &str,
) -> llm_flows_core::Result<Option<EventConfirmation>, PipelineError> {
    let mut run = PipelineRun::new(PIPELINE);
    let date_context = ctx.date_context();

    let extraction = ctx
        .extract::<EventExtraction>(
            &prompts::chain_classify(),
            &[("date_context", date_context.as_str()), ("text", text)],
        )
        .await
        .map_err(|e| run.failed("classify", e))?
        .value;
    run.advance(PipelineStage::Classified)?;

    if !extraction.is_calendar_event || !ctx.policy().exceeds(extraction.confidence_score) {
        run.advance(PipelineStage::Rejected)?;
        info!(
            run = %run.id,
            is_calendar_event = extraction.is_calendar_event,
            confidence = extraction.confidence_score,
            "not a calendar event"
        );
        return Ok(None);
    }
    run.advance(PipelineStage::Routed)?;

    let details = ctx
        .extract::<EventDetails>(
            &prompts::chain_details(),
            &[
                ("date_context", date_context.as_str()),
                ("description", extraction.description.as_str()),
            ],
        )
        .await
        .map_err(|e| run.failed("details", e))?
        .value;
    run.advance(PipelineStage::Detailed)?;

    let details_json = serde_json::to_string(&details)
        .map_err(|e| run.failed("confirm", e))?;
    let confirmation = ctx
        .extract::<EventConfirmation>(
            &prompts::chain_confirm(),
            &[("signature", ctx.signature()), ("details", details_json.as_str())],
        )
        .await
        .map_err(|e| run.failed("confirm", e))?
        .value;
    run.advance(PipelineStage::Composed)?;

    info!(run = %run.id, event = %details.name, "calendar request confirmed");
    Ok(Some(confirmation))
}
