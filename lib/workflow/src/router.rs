//! Confidence-scored router.
//!
//! A single classification decides whether the input creates an event,
//! modifies one, or is something else. Confident calendar requests are
//! dispatched to a handler that extracts the details and formats the reply
//! locally.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::prompts;
use crate::stage::{PipelineRun, PipelineStage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

const PIPELINE: &str = "router";

/// Kind of calendar request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Create a new event.
    NewEvent,
    /// Change an existing event.
    ModifyEvent,
    /// Anything else.
    Other,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NewEvent => "new_event",
            Self::ModifyEvent => "modify_event",
            Self::Other => "other",
        })
    }
}

/// Routing decision for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalendarRequestType {
    /// Type of calendar request being made.
    pub request_type: RequestType,
    /// Confidence score between 0 and 1.
    pub confidence_score: f64,
    /// Cleaned description of the request.
    pub description: String,
}

/// Details for creating an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NewEventDetails {
    /// Name of the event.
    pub name: String,
    /// Date and time of the event (ISO 8601).
    pub date: String,
    /// Duration in minutes.
    pub duration_minutes: u32,
    /// List of participants.
    pub participants: Vec<String>,
}

/// One field change on an existing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Change {
    /// Field to change.
    pub field: String,
    /// New value for the field.
    pub new_value: String,
}

/// Details for modifying an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModifyEventDetails {
    /// Description identifying the existing event.
    pub event_identifier: String,
    /// List of changes to make.
    pub changes: Vec<Change>,
    /// New participants to add.
    pub participants_to_add: Vec<String>,
    /// Participants to remove.
    pub participants_to_remove: Vec<String>,
}

/// Reply to a routed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// User-facing message.
    pub message: String,
    /// Calendar link, if applicable.
    pub calendar_link: Option<String>,
}

impl NewEventDetails {
    /// Formats the reply for a created event.
    #[must_use]
    pub fn to_response(&self) -> CalendarResponse {
        CalendarResponse {
            success: true,
            message: format!(
                "Created new event '{}' for {} with {}",
                self.name,
                self.date,
                self.participants.join(", ")
            ),
            calendar_link: Some(format!("calendar://new?event={}", self.name)),
        }
    }
}

impl ModifyEventDetails {
    /// Formats the reply for a modified event.
    #[must_use]
    pub fn to_response(&self) -> CalendarResponse {
        let changes = self
            .changes
            .iter()
            .map(|c| format!("{} to {}", c.field, c.new_value))
            .collect::<Vec<_>>()
            .join(", ");

        CalendarResponse {
            success: true,
            message: format!("Modified event '{}': {}", self.event_identifier, changes),
            calendar_link: Some(format!("calendar://modify?event={}", self.event_identifier)),
        }
    }
}

/// Classifies and dispatches a calendar request.
///
/// Returns `Ok(None)` when the confidence is below the threshold or the
/// request is neither a new event nor a modification.
///
/// # Errors
///
/// Returns `PipelineError::StageFailed` naming the stage that failed.
#[instrument(skip_all, fields(input_len = text.len()))]
pub async fn route_calendar_request(
    ctx: &PipelineContext,
    text: &str,
) -> llm_flows_core::Result<Option<CalendarResponse>, PipelineError> {
    let mut run = PipelineRun::new(PIPELINE);

    let route = ctx
        .extract::<CalendarRequestType>(&prompts::route_classify(), &[("text", text)])
        .await
        .map_err(|e| run.failed("classify", e))?
        .value;
    run.advance(PipelineStage::Classified)?;

    if !ctx.policy().meets(route.confidence_score) || route.request_type == RequestType::Other {
        run.advance(PipelineStage::Rejected)?;
        info!(
            run = %run.id,
            request_type = %route.request_type,
            confidence = route.confidence_score,
            "request not routed"
        );
        return Ok(None);
    }
    run.advance(PipelineStage::Routed)?;
    info!(run = %run.id, request_type = %route.request_type, "request routed");

    let response = match route.request_type {
        RequestType::NewEvent => handle_new_event(ctx, &mut run, &route.description).await?,
        RequestType::ModifyEvent => handle_modify_event(ctx, &mut run, &route.description).await?,
        RequestType::Other => return Ok(None),
    };
    run.advance(PipelineStage::Composed)?;

    Ok(Some(response))
}

async fn handle_new_event(
    ctx: &PipelineContext,
    run: &mut PipelineRun,
    description: &str,
) -> llm_flows_core::Result<CalendarResponse, PipelineError> {
    let date_context = ctx.date_context();
    let details = ctx
        .extract::<NewEventDetails>(
            &prompts::route_new_event(),
            &[("date_context", date_context.as_str()), ("description", description)],
        )
        .await
        .map_err(|e| run.failed("new_event", e))?
        .value;
    run.advance(PipelineStage::Detailed)?;

    Ok(details.to_response())
}

async fn handle_modify_event(
    ctx: &PipelineContext,
    run: &mut PipelineRun,
    description: &str,
) -> llm_flows_core::Result<CalendarResponse, PipelineError> {
    let date_context = ctx.date_context();
    let details = ctx
        .extract::<ModifyEventDetails>(
            &prompts::route_modify_event(),
            &[("date_context", date_context.as_str()), ("description", description)],
        )
        .await
        .map_err(|e| run.failed("modify_event", e))?
        .value;
    run.advance(PipelineStage::Detailed)?;

    Ok(details.to_response())
}
