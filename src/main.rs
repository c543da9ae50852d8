//! Applicant Predictor - Main Entry Point
//!
//! Loads the selection pipeline, then serves predictions over HTTP until
//! shutdown. The process refuses to serve if the model cannot be loaded.

use anyhow::{Context, Result};
use applicant_predictor::{
    config::AppConfig,
    logging,
    metrics::{MetricsReporter, ServiceMetrics},
    models::host::ModelHost,
    server::{self, AppState},
    service::PredictionService,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    info!("Starting Applicant Predictor v{}", env!("CARGO_PKG_VERSION"));
    let config_path = AppConfig::source_path();
    if Path::new(&config_path).exists() {
        info!(path = %config_path, "Configuration loaded");
    } else {
        warn!(path = %config_path, "Configuration file not found, using defaults");
    }

    // Load the model before accepting any traffic
    let host = Arc::new(ModelHost::new(&config.models));
    host.load().context("Model could not be loaded, refusing to start")?;

    let metrics = Arc::new(ServiceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let service = PredictionService::new(host.clone(), metrics.clone());
    let state = AppState::new(service, config.model_card.clone());
    let app = server::build_app(state, &config.server.cors_allowed_origins);

    let result = server::serve(app, &config.bind_address()).await;

    info!("Service shutting down...");
    host.unload();
    metrics.print_summary();

    result
}
