//! Prediction service: validated request in, shaped prediction out

use crate::error::{PipelineError, ServiceError};
use crate::feature_row::FeatureRow;
use crate::metrics::ServiceMetrics;
use crate::models::host::ModelHost;
use crate::models::pipeline::ScoredLabel;
use crate::types::{Outcome, PredictionRequest, PredictionResponse};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Stateless request handler over a shared model host
#[derive(Clone)]
pub struct PredictionService {
    host: Arc<ModelHost>,
    metrics: Arc<ServiceMetrics>,
}

impl PredictionService {
    pub fn new(host: Arc<ModelHost>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { host, metrics }
    }

    pub fn host(&self) -> &ModelHost {
        &self.host
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    /// Run one prediction.
    ///
    /// Blocks the calling thread for the duration of inference.
    pub fn predict(&self, request: PredictionRequest) -> Result<PredictionResponse, ServiceError> {
        let start_time = Instant::now();

        let Some(loaded) = self.host.pipeline() else {
            warn!("Prediction requested while model is not loaded");
            self.metrics.record_failure(ServiceError::Unavailable.kind());
            return Err(ServiceError::Unavailable);
        };

        let row = FeatureRow::from_request(&request);

        let scored = if loaded.capabilities().probability {
            loaded.pipeline().predict_scored(&row)
        } else {
            loaded.pipeline().predict(&row).map(|label| ScoredLabel {
                label,
                probabilities: Err(PipelineError::ProbabilityUnsupported),
            })
        };

        let scored = match scored {
            Ok(scored) => scored,
            Err(e) => {
                error!(model = %loaded.pipeline().name(), error = %e, "Inference failed");
                let err = ServiceError::from(e);
                self.metrics.record_failure(err.kind());
                return Err(err);
            }
        };

        let outcome = Outcome::from_label(scored.label);
        let probability = confidence(scored.probabilities);
        let latency = start_time.elapsed();

        self.metrics.record_prediction(latency, outcome, probability);
        info!(
            prediction = outcome.as_label(),
            probability = ?probability,
            latency_us = latency.as_micros() as u64,
            "Prediction served"
        );

        Ok(PredictionResponse::new(outcome, probability, request))
    }
}

/// Highest class probability, if the pipeline produced a usable distribution.
///
/// Never fails the request: any problem just leaves the confidence out.
fn confidence(probabilities: Result<Vec<f64>, PipelineError>) -> Option<f64> {
    match probabilities {
        Ok(distribution) => {
            let max = distribution.iter().copied().fold(f64::NAN, f64::max);
            if (0.0..=1.0).contains(&max) {
                Some(max)
            } else {
                debug!(distribution = ?distribution, "Discarding malformed probability distribution");
                None
            }
        }
        Err(PipelineError::ProbabilityUnsupported) => None,
        Err(e) => {
            warn!(error = %e, "Probability unavailable, omitting confidence");
            None
        }
    }
}
