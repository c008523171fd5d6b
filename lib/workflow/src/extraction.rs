//! Structured extraction.
//!
//! One deterministic call turns free text into a typed record.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::prompts;
use llm_flows_ai::Sampling;
use rootcause::prelude::ResultExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const PIPELINE: &str = "extraction";

/// An event mentioned in free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CalendarEvent {
    /// Name of the event.
    pub name: String,
    /// When the event happens, as stated in the text.
    pub date: String,
    /// People taking part.
    pub participants: Vec<String>,
}

/// Extracts a [`CalendarEvent`] from text.
///
/// # Errors
///
/// Returns `PipelineError::StageFailed` if the call fails or the response
/// does not match the schema.
#[instrument(skip_all, fields(input_len = text.len()))]
pub async fn extract_calendar_event(
    ctx: &PipelineContext,
    text: &str,
) -> llm_flows_core::Result<CalendarEvent, PipelineError> {
    let failed = PipelineError::StageFailed {
        pipeline: PIPELINE,
        stage: "extract",
    };

    let call = ctx
        .templated_call(&prompts::event_extraction(), &[("text", text)])
        .context_with(|| failed.clone())?
        .with_sampling(Sampling::deterministic());

    let extracted = call
        .extract::<CalendarEvent>(ctx.backend())
        .await
        .context(failed)?;

    info!(
        invocation = %extracted.id,
        participants = extracted.value.participants.len(),
        "event extracted"
    );
    Ok(extracted.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineReportExt;
    use llm_flows_ai::LlmError;
    use llm_flows_ai::testing::ScriptedBackend;
    use std::sync::Arc;

    const INPUT: &str = "Alexandre and Paolla are going to the movies on Monday";

    fn context(backend: &Arc<ScriptedBackend>) -> PipelineContext {
        PipelineContext::new(backend.clone(), "openai/gpt-oss-20b")
    }

    #[tokio::test]
    async fn extracts_event_deterministically() {
        let backend = Arc::new(ScriptedBackend::new().with_structured(serde_json::json!({
            "name": "Movies",
            "date": "Monday",
            "participants": ["Alexandre", "Paolla"]
        })));

        let event = extract_calendar_event(&context(&backend), INPUT)
            .await
            .expect("event");

        assert_eq!(event.participants, vec!["Alexandre", "Paolla"]);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].input, INPUT);
        assert_eq!(requests[0].instructions.as_deref(), Some("Extract the event information."));
        assert_eq!(requests[0].temperature, Some(0.0));
        assert_eq!(requests[0].top_p, Some(1.0));
        assert_eq!(
            requests[0].output_schema.as_ref().map(|s| s.name.as_str()),
            Some("CalendarEvent")
        );
    }

    #[tokio::test]
    async fn missing_field_fails_closed() {
        let backend = Arc::new(ScriptedBackend::new().with_structured(serde_json::json!({
            "name": "Movies",
            "date": "Monday"
        })));

        let err = extract_calendar_event(&context(&backend), INPUT)
            .await
            .unwrap_err();
        assert!(err.is_schema_validation());
    }

    #[tokio::test]
    async fn wrong_type_fails_closed() {
        let backend = Arc::new(ScriptedBackend::new().with_structured(serde_json::json!({
            "name": "Movies",
            "date": "Monday",
            "participants": "Alexandre, Paolla"
        })));

        let err = extract_calendar_event(&context(&backend), INPUT)
            .await
            .unwrap_err();
        assert!(err.is_schema_validation());
    }

    #[tokio::test]
    async fn plain_text_fails_closed() {
        let backend = Arc::new(ScriptedBackend::new().with_text("Sure! The event is on Monday."));

        let err = extract_calendar_event(&context(&backend), INPUT)
            .await
            .unwrap_err();
        assert!(err.is_schema_validation());
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let backend = Arc::new(ScriptedBackend::new().with_error(LlmError::Timeout { timeout_secs: 60 }));

        let err = extract_calendar_event(&context(&backend), INPUT)
            .await
            .unwrap_err();
        assert!(!err.is_schema_validation());
        assert_eq!(err.stage(), Some("extract"));
        assert_eq!(
            llm_flows_core::find_context::<LlmError, _>(&err),
            Some(&LlmError::Timeout { timeout_secs: 60 })
        );
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn identical_responses_give_identical_results() {
        let reply = serde_json::json!({
            "name": "Movies",
            "date": "Monday",
            "participants": ["Alexandre", "Paolla"]
        });
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_structured(reply.clone())
                .with_structured(reply),
        );
        let ctx = context(&backend);

        let first = extract_calendar_event(&ctx, INPUT).await.expect("first");
        let second = extract_calendar_event(&ctx, INPUT).await.expect("second");
        assert_eq!(first, second);
    }
}
