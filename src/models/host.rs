//! Model host: owns the loaded pipeline for the lifetime of the process

use crate::config::ModelsConfig;
use crate::error::ModelError;
use crate::models::loader::{resolve_model_path, ModelLoader};
use crate::models::pipeline::{Pipeline, PipelineCapabilities};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{error, info};

/// Read-only handle to a loaded pipeline plus what it declared at load time.
#[derive(Clone)]
pub struct LoadedPipeline {
    pipeline: Arc<dyn Pipeline>,
    capabilities: PipelineCapabilities,
    source: Option<PathBuf>,
}

impl LoadedPipeline {
    pub fn new(pipeline: Arc<dyn Pipeline>, source: Option<PathBuf>) -> Self {
        let capabilities = pipeline.capabilities();
        Self {
            pipeline,
            capabilities,
            source,
        }
    }

    pub fn pipeline(&self) -> &dyn Pipeline {
        self.pipeline.as_ref()
    }

    pub fn capabilities(&self) -> PipelineCapabilities {
        self.capabilities
    }

    /// File the pipeline was read from, if it came from disk
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Holds the pipeline between `load` and `unload`.
///
/// Requests take a cloned [`LoadedPipeline`] handle, so an `unload` racing an
/// in-flight request never invalidates that request's pipeline.
pub struct ModelHost {
    primary_path: PathBuf,
    fallback_path: PathBuf,
    onnx_threads: usize,
    slot: RwLock<Option<LoadedPipeline>>,
}

impl ModelHost {
    /// Create an empty host for the configured artifact locations.
    pub fn new(config: &ModelsConfig) -> Self {
        Self {
            primary_path: PathBuf::from(&config.primary_path),
            fallback_path: PathBuf::from(&config.fallback_path),
            onnx_threads: config.onnx_threads,
            slot: RwLock::new(None),
        }
    }

    /// Create a host that already holds `pipeline`.
    pub fn with_pipeline(config: &ModelsConfig, pipeline: Arc<dyn Pipeline>) -> Self {
        let host = Self::new(config);
        host.install(LoadedPipeline::new(pipeline, None));
        host
    }

    /// Load the ONNX artifact from the primary path, or the fallback path.
    pub fn load(&self) -> Result<(), ModelError> {
        let threads = self.onnx_threads;
        self.load_with(|path| {
            let loader = ModelLoader::with_threads(threads)?;
            let pipeline = loader.load_pipeline(path)?;
            Ok(Arc::new(pipeline) as Arc<dyn Pipeline>)
        })
    }

    /// Resolve the artifact path and build the pipeline with `loader`.
    pub fn load_with<F>(&self, loader: F) -> Result<(), ModelError>
    where
        F: FnOnce(&Path) -> Result<Arc<dyn Pipeline>, ModelError>,
    {
        let result = resolve_model_path(&self.primary_path, &self.fallback_path)
            .and_then(|path| loader(&path).map(|pipeline| (pipeline, path)));

        match result {
            Ok((pipeline, path)) => {
                let loaded = LoadedPipeline::new(pipeline, Some(path.clone()));
                info!(
                    model = %loaded.pipeline().name(),
                    path = %path.display(),
                    probability = loaded.capabilities().probability,
                    "Model loaded successfully"
                );
                self.install(loaded);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to load model");
                Err(e)
            }
        }
    }

    /// Drop the held pipeline. Later requests see the host as not ready.
    pub fn unload(&self) {
        let previous = match self.slot.write() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(loaded) = previous {
            info!(model = %loaded.pipeline().name(), "Model unloaded");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline().is_some()
    }

    /// Shared handle to the current pipeline, if one is loaded.
    pub fn pipeline(&self) -> Option<LoadedPipeline> {
        match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary_path
    }

    pub fn fallback_path(&self) -> &Path {
        &self.fallback_path
    }

    fn install(&self, loaded: LoadedPipeline) {
        match self.slot.write() {
            Ok(mut slot) => *slot = Some(loaded),
            Err(poisoned) => *poisoned.into_inner() = Some(loaded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::feature_row::FeatureRow;
    use std::fs;

    struct FixedPipeline;

    impl Pipeline for FixedPipeline {
        fn name(&self) -> &str {
            "fixed"
        }

        fn capabilities(&self) -> PipelineCapabilities {
            PipelineCapabilities { probability: true }
        }

        fn predict(&self, _row: &FeatureRow) -> Result<i64, PipelineError> {
            Ok(1)
        }
    }

    fn config_in(dir: &Path) -> ModelsConfig {
        ModelsConfig {
            primary_path: dir.join("models/model.onnx").display().to_string(),
            fallback_path: dir.join("notebooks/models/model.onnx").display().to_string(),
            onnx_threads: 1,
        }
    }

    fn fixed(_path: &Path) -> Result<Arc<dyn Pipeline>, ModelError> {
        Ok(Arc::new(FixedPipeline))
    }

    #[test]
    fn test_new_host_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let host = ModelHost::new(&config_in(dir.path()));
        assert!(!host.is_ready());
        assert!(host.pipeline().is_none());
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let host = ModelHost::new(&config_in(dir.path()));

        let err = host.load_with(fixed).unwrap_err();
        assert!(matches!(err, ModelError::NotFound { .. }));
        assert!(!host.is_ready());
    }

    #[test]
    fn test_load_from_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(dir.path().join("notebooks/models")).unwrap();
        fs::write(&config.fallback_path, b"artifact").unwrap();

        let host = ModelHost::new(&config);
        host.load_with(fixed).unwrap();

        let loaded = host.pipeline().unwrap();
        assert_eq!(loaded.source(), Some(Path::new(&config.fallback_path)));
        assert!(loaded.capabilities().probability);
    }

    #[test]
    fn test_loader_failure_keeps_host_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(dir.path().join("models")).unwrap();
        fs::write(&config.primary_path, b"not a model").unwrap();

        let host = ModelHost::new(&config);
        let err = host
            .load_with(|path| {
                Err(ModelError::Load {
                    path: path.to_path_buf(),
                    reason: "corrupt".to_string(),
                })
            })
            .unwrap_err();

        assert!(matches!(err, ModelError::Load { .. }));
        assert!(!host.is_ready());
    }

    #[test]
    fn test_corrupt_onnx_artifact_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(dir.path().join("models")).unwrap();
        fs::write(&config.primary_path, b"definitely not protobuf").unwrap();

        let host = ModelHost::new(&config);
        let err = host.load().unwrap_err();

        assert!(matches!(err, ModelError::Load { .. }));
        assert!(!host.is_ready());
    }

    #[test]
    fn test_unload_clears_pipeline_but_keeps_handles() {
        let dir = tempfile::tempdir().unwrap();
        let host = ModelHost::with_pipeline(&config_in(dir.path()), Arc::new(FixedPipeline));
        assert!(host.is_ready());

        let handle = host.pipeline().unwrap();
        host.unload();

        assert!(!host.is_ready());
        let row = FeatureRow::from_request(&crate::types::PredictionRequest {
            companies: "Google".to_string(),
            job_title: "Software Developer".to_string(),
            educational_degree: "B.Tech".to_string(),
            experience_years: 5.0,
            number_of_skills: 4,
        });
        assert_eq!(handle.pipeline().predict(&row).unwrap(), 1);
    }
}
