//! Error types for the workflow crate.
//!
//! `PipelineError` names the pipeline and stage that failed. The primitive's
//! own error (extraction, prompt rendering, tool exchange) is the child report
//! underneath it, so the rendered report reads from pipeline down to cause.

use crate::stage::PipelineStage;
use llm_flows_ai::ExtractionError;
use llm_flows_core::find_context;
use rootcause::Report;
use thiserror::Error;

/// Errors from pipeline execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A stage of a pipeline failed; no partial result is returned.
    #[error("pipeline '{pipeline}' failed at stage '{stage}'")]
    StageFailed {
        pipeline: &'static str,
        stage: &'static str,
    },
    /// A stage transition that is not allowed was attempted.
    #[error("invalid stage transition from {from} to {to}")]
    InvalidTransition {
        from: PipelineStage,
        to: PipelineStage,
    },
    /// A confidence threshold outside 0..=1 was configured.
    #[error("invalid confidence threshold {threshold}: must be a finite value between 0 and 1")]
    InvalidThreshold { threshold: f64 },
}

/// Queries on a pipeline failure report.
pub trait PipelineReportExt {
    /// Returns the stage name for stage failures.
    fn stage(&self) -> Option<&'static str>;

    /// Returns true if a response failed schema validation.
    fn is_schema_validation(&self) -> bool;
}

impl PipelineReportExt for Report<PipelineError> {
    fn stage(&self) -> Option<&'static str> {
        match self.current_context() {
            PipelineError::StageFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }

    fn is_schema_validation(&self) -> bool {
        find_context::<ExtractionError, _>(self).is_some_and(ExtractionError::is_schema_validation)
    }
}
