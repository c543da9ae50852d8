//! HTTP surface: routes, request extraction and server lifecycle

use crate::config::ModelCardConfig;
use crate::error::{FieldError, ServiceError};
use crate::feature_row::FEATURE_NAMES;
use crate::service::PredictionService;
use crate::types::{HealthStatus, ModelInfo, PredictionRequest, PredictionResponse, ServiceInfo};
use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Request, State},
    http::{self, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Span};
use uuid::Uuid;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
    pub model_card: Arc<ModelCardConfig>,
}

impl AppState {
    pub fn new(service: PredictionService, model_card: ModelCardConfig) -> Self {
        Self {
            service,
            model_card: Arc::new(model_card),
        }
    }
}

/// JSON body parsed and validated into a [`PredictionRequest`].
///
/// The body is decoded regardless of `Content-Type`; every failure becomes a
/// 422 with per-field details.
pub struct ValidatedRequest(pub PredictionRequest);

impl<S> FromRequest<S> for ValidatedRequest
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            ServiceError::Validation(vec![FieldError::body("body_read", e.body_text())])
        })?;

        let body: Value = serde_json::from_slice(&bytes).map_err(|e| {
            ServiceError::Validation(vec![FieldError::body(
                "json_invalid",
                format!("JSON decode error: {}", e),
            )])
        })?;

        PredictionRequest::from_json(body)
            .map(ValidatedRequest)
            .map_err(ServiceError::Validation)
    }
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::current())
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::new(state.service.host().is_ready()))
}

async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfo>, ServiceError> {
    if !state.service.host().is_ready() {
        return Err(ServiceError::Unavailable);
    }
    Ok(Json(ModelInfo::describe(&state.model_card, &FEATURE_NAMES)))
}

async fn predict(
    State(state): State<AppState>,
    request: Result<ValidatedRequest, ServiceError>,
) -> Result<Json<PredictionResponse>, ServiceError> {
    let ValidatedRequest(request) = request.inspect_err(|e| {
        state.service.metrics().record_failure(e.kind());
        warn!(error = %e, "Rejected prediction request");
    })?;

    let service = state.service.clone();
    let span = Span::current();

    // Model execution is CPU-bound; keep it off the async workers
    let response = tokio::task::spawn_blocking(move || span.in_scope(|| service.predict(request)))
        .await
        .map_err(|e| {
            error!(error = %e, "Inference task failed");
            state.service.metrics().record_failure("inference");
            ServiceError::Inference(format!("inference task failed: {}", e))
        })??;

    Ok(Json(response))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" }))).into_response()
}

fn make_span(request: &http::Request<Body>) -> Span {
    info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %Uuid::new_v4(),
    )
}

/// Build the application router.
pub fn build_app(state: AppState, cors_allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/model/info", get(model_info))
        .route("/predict", post(predict))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(create_cors_layer(cors_allowed_origins))
        .with_state(state)
}

fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins = parse_origins(allowed_origins);
        if origins.is_empty() {
            warn!("No configured CORS origin is valid, cross-origin requests will be refused");
        }

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    cors.max_age(Duration::from_secs(3600))
}

fn parse_origins(allowed_origins: &[String]) -> Vec<http::HeaderValue> {
    allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<http::HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// Serve `app` until Ctrl+C or SIGTERM, then drain in-flight requests.
pub async fn serve(app: Router, bind_addr: &str) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
