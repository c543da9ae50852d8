//! Configuration management for the prediction service

use crate::types::response::EvaluationMetrics;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable overriding the configuration file path
pub const CONFIG_PATH_ENV: &str = "PREDICTOR_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub model_card: ModelCardConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Allowed CORS origins (empty = any origin)
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Primary location of the ONNX pipeline
    pub primary_path: String,
    /// Checked only when the primary path does not exist
    pub fallback_path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Descriptive metadata served by `/model/info`
#[derive(Debug, Clone, Deserialize)]
pub struct ModelCardConfig {
    pub model_type: String,
    pub categorical_encoder: String,
    pub numerical_scaler: String,
    pub training_samples: u64,
    pub metrics: EvaluationMetrics,
}

impl Default for ModelCardConfig {
    fn default() -> Self {
        Self {
            model_type: "Random Forest Classifier".to_string(),
            categorical_encoder: "OneHotEncoder".to_string(),
            numerical_scaler: "StandardScaler".to_string(),
            training_samples: 1500,
            metrics: EvaluationMetrics {
                accuracy: 0.903,
                precision: 0.90,
                recall: 0.90,
                f1_score: 0.90,
            },
        }
    }
}

/// Periodic metrics reporting
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summaries (0 disables the reporter)
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `$PREDICTOR_CONFIG` or the default path.
    ///
    /// A missing file yields the built-in defaults.
    pub fn load() -> Result<Self> {
        let path = Self::source_path();
        if !Path::new(&path).exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Configuration file this process reads
    pub fn source_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_allowed_origins: Vec::new(),
            },
            models: ModelsConfig {
                primary_path: "models/model.onnx".to_string(),
                fallback_path: "notebooks/models/model.onnx".to_string(),
                onnx_threads: 1,
            },
            model_card: ModelCardConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
