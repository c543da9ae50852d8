//! Capability interface for fitted prediction pipelines

use crate::error::PipelineError;
use crate::feature_row::FeatureRow;

/// What a loaded pipeline can do, declared once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineCapabilities {
    /// Whether `predict_probability` yields a class distribution
    pub probability: bool,
}

/// Label for a row plus the outcome of asking for its class distribution.
#[derive(Debug)]
pub struct ScoredLabel {
    pub label: i64,
    pub probabilities: Result<Vec<f64>, PipelineError>,
}

/// A fitted transform-then-classify pipeline.
///
/// Implementations are shared across concurrent requests and must not change
/// observable state between calls.
pub trait Pipeline: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &str;

    fn capabilities(&self) -> PipelineCapabilities;

    /// Predict the class label for a single row.
    fn predict(&self, row: &FeatureRow) -> Result<i64, PipelineError>;

    /// Class probability distribution for a single row.
    fn predict_probability(&self, _row: &FeatureRow) -> Result<Vec<f64>, PipelineError> {
        Err(PipelineError::ProbabilityUnsupported)
    }

    /// Label and class distribution from one evaluation of the pipeline.
    ///
    /// Only a label failure fails the call. Backends that produce both from a
    /// single run should override this.
    fn predict_scored(&self, row: &FeatureRow) -> Result<ScoredLabel, PipelineError> {
        let label = self.predict(row)?;
        Ok(ScoredLabel {
            label,
            probabilities: self.predict_probability(row),
        })
    }
}
