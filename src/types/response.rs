//! Response bodies for the prediction API

use crate::config::ModelCardConfig;
use crate::types::request::PredictionRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SELECTED_MESSAGE: &str = "Likely to be Selected";
pub const REJECTED_MESSAGE: &str = "Unlikely to be Selected";

/// Binary selection outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rejected,
    Selected,
}

impl Outcome {
    /// Coerce a raw classifier label into an outcome. Any non-zero label counts as selected.
    pub fn from_label(label: i64) -> Self {
        if label != 0 {
            Outcome::Selected
        } else {
            Outcome::Rejected
        }
    }

    pub fn as_label(self) -> u8 {
        match self {
            Outcome::Rejected => 0,
            Outcome::Selected => 1,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Outcome::Rejected => REJECTED_MESSAGE,
            Outcome::Selected => SELECTED_MESSAGE,
        }
    }
}

/// Result of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Selection prediction (0 or 1)
    pub prediction: u8,
    /// Highest class probability, when the pipeline reports one
    pub probability: Option<f64>,
    /// Human-readable result
    pub message: String,
    /// The request fields as supplied by the caller
    pub input: PredictionRequest,
}

impl PredictionResponse {
    pub fn new(outcome: Outcome, probability: Option<f64>, input: PredictionRequest) -> Self {
        Self {
            prediction: outcome.as_label(),
            probability,
            message: outcome.message().to_string(),
            input,
        }
    }
}

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

impl ServiceInfo {
    pub fn current() -> Self {
        let endpoints = [
            ("/predict", "POST - Make prediction"),
            ("/health", "GET - Health check"),
            ("/model/info", "GET - Model information"),
        ]
        .into_iter()
        .map(|(path, description)| (path.to_string(), description.to_string()))
        .collect();

        Self {
            message: "ML Applicant Predictor API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoints,
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
}

impl HealthStatus {
    pub fn new(model_loaded: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            model_loaded,
        }
    }
}

/// Body of `GET /model/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub preprocessing: Preprocessing,
    pub features: Vec<String>,
    pub metrics: EvaluationMetrics,
    pub training_samples: u64,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessing {
    pub categorical: String,
    pub numerical: String,
}

/// Offline evaluation scores reported for the shipped model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

impl ModelInfo {
    /// Describe a loaded model from its model card and feature schema.
    pub fn describe(card: &ModelCardConfig, features: &[&str]) -> Self {
        Self {
            model_type: card.model_type.clone(),
            preprocessing: Preprocessing {
                categorical: card.categorical_encoder.clone(),
                numerical: card.numerical_scaler.clone(),
            },
            features: features.iter().map(|f| f.to_string()).collect(),
            metrics: card.metrics.clone(),
            training_samples: card.training_samples,
            model_loaded: true,
        }
    }
}
