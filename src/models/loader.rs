//! ONNX pipeline loader

use crate::error::ModelError;
use crate::models::onnx::{InputKind, InputSpec, OnnxPipeline};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::tensor::TensorElementType;
use ort::value::ValueType;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Pick the artifact to load: the primary path if it exists, otherwise the fallback.
pub fn resolve_model_path(primary: &Path, fallback: &Path) -> Result<PathBuf, ModelError> {
    if primary.exists() {
        return Ok(primary.to_path_buf());
    }

    if fallback.exists() {
        warn!(
            primary = %primary.display(),
            fallback = %fallback.display(),
            "Model not found at primary path, using fallback"
        );
        return Ok(fallback.to_path_buf());
    }

    Err(ModelError::NotFound {
        primary: primary.to_path_buf(),
        fallback: fallback.to_path_buf(),
    })
}

/// Loader for ONNX-exported pipelines
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self, ModelError> {
        ort::init().commit().map_err(|e| ModelError::Load {
            path: PathBuf::new(),
            reason: format!("failed to initialize ONNX Runtime: {e}"),
        })?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a pipeline from an ONNX file.
    pub fn load_pipeline<P: AsRef<Path>>(&self, path: P) -> Result<OnnxPipeline, ModelError> {
        let path = path.as_ref();
        let load_error = |reason: String| ModelError::Load {
            path: path.to_path_buf(),
            reason,
        };

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX pipeline");

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(self.onnx_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| load_error(e.to_string()))?;

        let inputs = session
            .inputs
            .iter()
            .map(|input| {
                input_kind(&input.input_type)
                    .map(|kind| InputSpec {
                        name: input.name.clone(),
                        kind,
                    })
                    .ok_or_else(|| {
                        load_error(format!(
                            "unsupported type {:?} for input `{}`",
                            input.input_type, input.name
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let (label_output, probability_output) = select_outputs(&output_names)
            .ok_or_else(|| load_error("pipeline has no outputs".to_string()))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline".to_string());

        info!(
            model = %name,
            inputs = ?inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            label_output = %label_output,
            probability_output = ?probability_output,
            "Pipeline loaded successfully"
        );

        Ok(OnnxPipeline::new(
            name,
            session,
            inputs,
            label_output,
            probability_output,
        ))
    }
}

fn input_kind(value_type: &ValueType) -> Option<InputKind> {
    match value_type {
        ValueType::Tensor { ty, .. } => match ty {
            TensorElementType::String => Some(InputKind::Text),
            TensorElementType::Float32 => Some(InputKind::Float32),
            TensorElementType::Float64 => Some(InputKind::Float64),
            TensorElementType::Int64 => Some(InputKind::Int64),
            TensorElementType::Int32 => Some(InputKind::Int32),
            _ => None,
        },
        _ => None,
    }
}

/// Choose the label output and, if present, the probability output.
///
/// Classifier exports name these `output_label` / `output_probability`; other
/// exporters use `label` / `probabilities`.
fn select_outputs(names: &[String]) -> Option<(String, Option<String>)> {
    let label = names
        .iter()
        .find(|n| n.contains("label"))
        .or_else(|| names.first())?
        .clone();

    let probability = names
        .iter()
        .find(|n| **n != label && n.contains("prob"))
        .cloned();

    Some((label, probability))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_classifier_outputs() {
        let (label, prob) =
            select_outputs(&names(&["output_label", "output_probability"])).unwrap();
        assert_eq!(label, "output_label");
        assert_eq!(prob.as_deref(), Some("output_probability"));
    }

    #[test]
    fn test_select_label_only() {
        let (label, prob) = select_outputs(&names(&["variable"])).unwrap();
        assert_eq!(label, "variable");
        assert!(prob.is_none());
    }

    #[test]
    fn test_select_no_outputs() {
        assert!(select_outputs(&[]).is_none());
    }

    #[test]
    fn test_resolve_prefers_primary() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("model.onnx");
        let fallback = dir.path().join("fallback.onnx");
        fs::write(&primary, b"x").unwrap();
        fs::write(&fallback, b"y").unwrap();

        assert_eq!(resolve_model_path(&primary, &fallback).unwrap(), primary);
    }

    #[test]
    fn test_resolve_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("model.onnx");
        let fallback = dir.path().join("fallback.onnx");
        fs::write(&fallback, b"y").unwrap();

        assert_eq!(resolve_model_path(&primary, &fallback).unwrap(), fallback);
    }

    #[test]
    fn test_resolve_neither_exists() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_model_path(&dir.path().join("a.onnx"), &dir.path().join("b.onnx"))
            .unwrap_err();
        assert!(matches!(err, ModelError::NotFound { .. }));
    }
}
