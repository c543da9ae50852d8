//! Error types for model loading, pipeline execution and request handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Startup errors raised while bringing the model host up.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model file not found at {} or {}", primary.display(), fallback.display())]
    NotFound { primary: PathBuf, fallback: PathBuf },

    #[error("failed to load model from {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
}

/// Failures raised by a pipeline while running inference.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline was not built with a probability output.
    #[error("pipeline does not expose class probabilities")]
    ProbabilityUnsupported,

    #[error("pipeline input `{0}` has no matching feature column")]
    MissingColumn(String),

    #[error("feature `{column}` cannot be fed to a {expected} input")]
    InputType {
        column: String,
        expected: &'static str,
    },

    #[error("unexpected pipeline output: {0}")]
    Output(String),

    #[error("pipeline runtime error: {0}")]
    Runtime(String),
}

impl From<ort::Error> for PipelineError {
    fn from(err: ort::Error) -> Self {
        PipelineError::Runtime(err.to_string())
    }
}

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Location of the field, e.g. `["body", "Experience_Years"]`
    pub loc: Vec<String>,
    /// Human-readable reason
    pub msg: String,
    /// Machine-readable error kind
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(field: &str, kind: &str, msg: impl Into<String>) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    /// Error for a request body that is not a JSON object at all.
    pub fn body(kind: &str, msg: impl Into<String>) -> Self {
        Self {
            loc: vec!["body".to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    /// Name of the offending field, if the error points at one.
    pub fn field(&self) -> Option<&str> {
        self.loc.get(1).map(String::as_str)
    }
}

/// Per-request errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request validation failed ({} field errors)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Model not loaded")]
    Unavailable,

    #[error("Prediction error: {0}")]
    Inference(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::Unavailable => "unavailable",
            ServiceError::Inference(_) => "inference",
        }
    }
}

impl From<PipelineError> for ServiceError {
    fn from(err: PipelineError) -> Self {
        ServiceError::Inference(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ServiceError::Validation(errors) => json!({ "detail": errors }),
            other => json!({ "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
