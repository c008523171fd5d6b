//! Parallel validation gate.
//!
//! A calendar classification check and a safety check run concurrently on
//! the same input. The request is accepted only if both agree.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::policy::ConfidencePolicy;
use crate::prompts;
use rootcause::prelude::ResultExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const PIPELINE: &str = "validation";

/// Whether the input asks for a calendar operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalendarValidation {
    /// Whether this is a calendar request.
    pub is_calendar_request: bool,
    /// Confidence score between 0 and 1.
    pub confidence_score: f64,
}

/// Whether the input looks like an attack on the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SafetyCheck {
    /// Whether the input appears safe.
    pub is_safe: bool,
    /// Possible security concerns found in the input.
    pub risk_flags: Vec<String>,
}

/// Both checks and the decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Calendar classification result.
    pub calendar: CalendarValidation,
    /// Safety check result.
    pub safety: SafetyCheck,
    /// Whether the request passed the gate.
    pub accepted: bool,
}

/// The gate decision: a calendar request, scored above the threshold, that
/// is safe.
#[must_use]
pub fn accept(
    is_calendar_request: bool,
    confidence_score: f64,
    is_safe: bool,
    policy: ConfidencePolicy,
) -> bool {
    is_calendar_request && policy.exceeds(confidence_score) && is_safe
}

/// Runs both checks and returns the decision.
///
/// # Errors
///
/// Returns `PipelineError::StageFailed` if either check fails.
pub async fn validate_request(
    ctx: &PipelineContext,
    text: &str,
) -> llm_flows_core::Result<bool, PipelineError> {
    Ok(validate_request_detailed(ctx, text).await?.accepted)
}

/// Runs both checks concurrently and returns both records with the decision.
///
/// The first failure cancels the other check; no partial result is returned.
///
/// # Errors
///
/// Returns `PipelineError::StageFailed` naming the check that failed.
#[instrument(skip_all, fields(input_len = text.len()))]
pub async fn validate_request_detailed(
    ctx: &PipelineContext,
    text: &str,
) -> llm_flows_core::Result<ValidationOutcome, PipelineError> {
    let calendar_template = prompts::calendar_check();
    let safety_template = prompts::safety_check();
    let variables = [("text", text)];

    let calendar = async {
        ctx.extract::<CalendarValidation>(&calendar_template, &variables)
            .await
            .context(PipelineError::StageFailed {
                pipeline: PIPELINE,
                stage: "calendar_check",
            })
    };
    let safety = async {
        ctx.extract::<SafetyCheck>(&safety_template, &variables)
            .await
            .context(PipelineError::StageFailed {
                pipeline: PIPELINE,
                stage: "safety_check",
            })
    };

    let (calendar, safety) = tokio::try_join!(calendar, safety)?;
    let (calendar, safety) = (calendar.value, safety.value);

    let accepted = accept(
        calendar.is_calendar_request,
        calendar.confidence_score,
        safety.is_safe,
        ctx.policy(),
    );
    info!(
        accepted,
        is_calendar_request = calendar.is_calendar_request,
        confidence = calendar.confidence_score,
        is_safe = safety.is_safe,
        risk_flags = safety.risk_flags.len(),
        "validation complete"
    );

    Ok(ValidationOutcome {
        calendar,
        safety,
        accepted,
    })
}
