//! Confidence thresholds.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Default confidence threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Decides whether a model-reported confidence score is high enough.
///
/// Scores are sanitized before comparison: non-finite scores never pass and
/// finite scores are clamped into `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidencePolicy {
    threshold: f64,
}

impl ConfidencePolicy {
    /// Creates a policy.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidThreshold` unless the threshold is a
    /// finite value in `0..=1`.
    pub fn new(threshold: f64) -> Result<Self, PipelineError> {
        if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
            Ok(Self { threshold })
        } else {
            Err(PipelineError::InvalidThreshold { threshold })
        }
    }

    /// Returns the threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// True if the score is strictly above the threshold.
    #[must_use]
    pub fn exceeds(&self, score: f64) -> bool {
        sanitize(score).is_some_and(|s| s > self.threshold)
    }

    /// True if the score is at or above the threshold.
    #[must_use]
    pub fn meets(&self, score: f64) -> bool {
        sanitize(score).is_some_and(|s| s >= self.threshold)
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl TryFrom<f64> for ConfidencePolicy {
    type Error = PipelineError;

    fn try_from(threshold: f64) -> Result<Self, Self::Error> {
        Self::new(threshold)
    }
}

impl From<ConfidencePolicy> for f64 {
    fn from(policy: ConfidencePolicy) -> Self {
        policy.threshold
    }
}

fn sanitize(score: f64) -> Option<f64> {
    score.is_finite().then(|| score.clamp(0.0, 1.0))
}
