//! Pipeline stage state machine.
//!
//! Gated pipelines move one way through
//! `Start -> Classified -> {Rejected | Routed -> Detailed -> Composed}`.
//! A [`PipelineRun`] tracks one invocation and refuses any other move.

use crate::error::PipelineError;
use llm_flows_core::PipelineRunId;
use rootcause::markers::SendSync;
use rootcause::{IntoReport, Report};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The stage a gated pipeline has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Nothing has run yet.
    Start,
    /// The input has been classified and scored.
    Classified,
    /// The gate or router turned the input away.
    Rejected,
    /// The gate passed or the router picked a handler.
    Routed,
    /// Detailed fields have been extracted.
    Detailed,
    /// The final output has been produced.
    Composed,
}

impl PipelineStage {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Composed)
    }

    /// Returns true if moving to `next` is allowed.
    #[must_use]
    pub fn can_advance_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Start, Self::Classified)
                | (Self::Classified, Self::Rejected | Self::Routed)
                | (Self::Routed, Self::Detailed)
                | (Self::Detailed, Self::Composed)
        )
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidTransition` for backwards, skipping or
    /// post-terminal moves.
    pub fn advance(self, next: Self) -> Result<Self, PipelineError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(PipelineError::InvalidTransition { from: self, to: next })
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Classified => "classified",
            Self::Rejected => "rejected",
            Self::Routed => "routed",
            Self::Detailed => "detailed",
            Self::Composed => "composed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation of a gated pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    /// Unique identifier for this run.
    pub id: PipelineRunId,
    /// Pipeline name.
    pub pipeline: &'static str,
    stage: PipelineStage,
}

impl PipelineRun {
    /// Starts a run.
    #[must_use]
    pub fn new(pipeline: &'static str) -> Self {
        Self {
            id: PipelineRunId::new(),
            pipeline,
            stage: PipelineStage::Start,
        }
    }

    /// Returns the current stage.
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Advances the run.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidTransition` if the move is not allowed.
    pub fn advance(&mut self, next: PipelineStage) -> Result<(), PipelineError> {
        self.stage = self.stage.advance(next)?;
        debug!(run = %self.id, pipeline = self.pipeline, stage = %self.stage, "stage reached");
        Ok(())
    }

    /// Wraps a failure inside the named stage.
    #[must_use]
    pub fn failed<E>(&self, stage: &'static str, source: E) -> Report<PipelineError>
    where
        E: IntoReport<SendSync>,
    {
        source.into_report().context(PipelineError::StageFailed {
            pipeline: self.pipeline,
            stage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineReportExt;
    use llm_flows_ai::PromptError;

    #[test]
    fn happy_path() {
        let mut run = PipelineRun::new("prompt_chain");
        for stage in [
            PipelineStage::Classified,
            PipelineStage::Routed,
            PipelineStage::Detailed,
            PipelineStage::Composed,
        ] {
            run.advance(stage).expect("advance");
        }
        assert!(run.stage().is_terminal());
    }

    #[test]
    fn rejection_is_terminal() {
        let stage = PipelineStage::Start
            .advance(PipelineStage::Classified)
            .and_then(|s| s.advance(PipelineStage::Rejected))
            .expect("reject");
        assert!(stage.is_terminal());
        assert!(stage.advance(PipelineStage::Routed).is_err());
    }

    #[test]
    fn refuses_backwards_and_skipping() {
        assert_eq!(
            PipelineStage::Detailed.advance(PipelineStage::Classified),
            Err(PipelineError::InvalidTransition {
                from: PipelineStage::Detailed,
                to: PipelineStage::Classified,
            })
        );
        assert!(PipelineStage::Start.advance(PipelineStage::Detailed).is_err());
        assert!(PipelineStage::Classified.advance(PipelineStage::Composed).is_err());
        assert!(PipelineStage::Routed.advance(PipelineStage::Routed).is_err());
    }

    #[test]
    fn failed_names_pipeline_and_stage() {
        let run = PipelineRun::new("router");
        let err = run.failed(
            "classify",
            PromptError::Unterminated {
                template: "route".to_string(),
            },
        );
        assert_eq!(err.stage(), Some("classify"));
        assert!(matches!(
            llm_flows_core::find_context::<PromptError, _>(&err),
            Some(PromptError::Unterminated { .. })
        ));
        assert!(err.to_string().contains("router"));
    }
}
