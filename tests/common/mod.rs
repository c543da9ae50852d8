//! Shared fixtures for HTTP-level tests

#![allow(dead_code)]

use applicant_predictor::{
    config::{AppConfig, ModelsConfig},
    metrics::ServiceMetrics,
    server::{build_app, AppState},
    FeatureRow, ModelHost, Pipeline, PipelineCapabilities, PipelineError, PredictionService,
};
use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header::CONTENT_TYPE, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Deterministic stand-in for the fitted pipeline.
///
/// Selects applicants with at least three skills and reports a fixed
/// distribution. Every row it sees is recorded.
pub struct StubPipeline {
    pub probability: bool,
    pub fail: bool,
    pub rows: Mutex<Vec<FeatureRow>>,
}

impl StubPipeline {
    pub fn new() -> Self {
        Self {
            probability: true,
            fail: false,
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn without_probability() -> Self {
        Self {
            probability: false,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl Pipeline for StubPipeline {
    fn name(&self) -> &str {
        "stub"
    }

    fn capabilities(&self) -> PipelineCapabilities {
        PipelineCapabilities {
            probability: self.probability,
        }
    }

    fn predict(&self, row: &FeatureRow) -> Result<i64, PipelineError> {
        self.rows.lock().unwrap().push(row.clone());
        if self.fail {
            return Err(PipelineError::Runtime("classifier exploded".to_string()));
        }
        let skills = row
            .get("Number of Skills")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| PipelineError::MissingColumn("Number of Skills".to_string()))?;
        Ok(i64::from(skills >= 3.0))
    }

    fn predict_probability(&self, _row: &FeatureRow) -> Result<Vec<f64>, PipelineError> {
        Ok(vec![0.15, 0.85])
    }
}

pub fn models_config() -> ModelsConfig {
    ModelsConfig {
        primary_path: "does-not-exist/model.onnx".to_string(),
        fallback_path: "does-not-exist/notebooks/model.onnx".to_string(),
        onnx_threads: 1,
    }
}

/// Test application around a host and its metrics.
pub struct TestApp {
    pub app: Router,
    pub host: Arc<ModelHost>,
    pub metrics: Arc<ServiceMetrics>,
}

impl TestApp {
    pub fn with_host(host: ModelHost) -> Self {
        let host = Arc::new(host);
        let metrics = Arc::new(ServiceMetrics::new());
        let service = PredictionService::new(host.clone(), metrics.clone());
        let state = AppState::new(service, AppConfig::default().model_card);

        Self {
            app: build_app(state, &[]),
            host,
            metrics,
        }
    }

    pub fn ready(pipeline: Arc<StubPipeline>) -> Self {
        Self::with_host(ModelHost::with_pipeline(&models_config(), pipeline))
    }

    pub fn not_ready() -> Self {
        Self::with_host(ModelHost::new(&models_config()))
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }
}

pub fn google_applicant() -> Value {
    json!({
        "Companies": "Google",
        "Job_Title": "Software Developer",
        "Educational_Degree": "B.Tech",
        "Experience_Years": 5.0,
        "Number_of_Skills": 4
    })
}
