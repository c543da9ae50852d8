//! Applicant Selection Predictor
//!
//! Serves a pre-trained applicant selection pipeline (categorical encoder,
//! numerical scaler and classifier exported to ONNX) over HTTP.

pub mod config;
pub mod error;
pub mod feature_row;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod server;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use error::{ModelError, PipelineError, ServiceError};
pub use feature_row::FeatureRow;
pub use models::host::ModelHost;
pub use models::pipeline::{Pipeline, PipelineCapabilities};
pub use server::{build_app, AppState};
pub use service::PredictionService;
pub use types::{PredictionRequest, PredictionResponse};
