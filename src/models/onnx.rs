//! ONNX Runtime execution of an exported preprocessing + classifier pipeline

use crate::error::PipelineError;
use crate::feature_row::{FeatureRow, FeatureValue};
use crate::models::pipeline::{Pipeline, PipelineCapabilities, ScoredLabel};
use ort::memory::Allocator;
use ort::session::{Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::Mutex;
use tracing::debug;

/// Element type expected by a graph input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Float32,
    Float64,
    Int64,
    Int32,
}

impl InputKind {
    fn describe(self) -> &'static str {
        match self {
            InputKind::Text => "string",
            InputKind::Float32 => "float",
            InputKind::Float64 => "double",
            InputKind::Int64 => "int64",
            InputKind::Int32 => "int32",
        }
    }
}

/// A named graph input. Exported tabular pipelines take one `[1, 1]` input per column.
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub name: String,
    pub kind: InputKind,
}

/// Pipeline backed by an ONNX Runtime session
pub struct OnnxPipeline {
    name: String,
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    inputs: Vec<InputSpec>,
    label_output: String,
    probability_output: Option<String>,
}

impl OnnxPipeline {
    pub fn new(
        name: String,
        session: Session,
        inputs: Vec<InputSpec>,
        label_output: String,
        probability_output: Option<String>,
    ) -> Self {
        Self {
            name,
            session: Mutex::new(session),
            inputs,
            label_output,
            probability_output,
        }
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    /// Run the session on one row and hand the outputs to `extract`.
    fn run_with<T>(
        &self,
        row: &FeatureRow,
        extract: impl FnOnce(&SessionOutputs) -> Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        let inputs = self.build_inputs(row)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PipelineError::Runtime(format!("Lock error: {}", e)))?;
        let outputs = session.run(inputs)?;

        extract(&outputs)
    }

    fn build_inputs(&self, row: &FeatureRow) -> Result<Vec<(String, DynValue)>, PipelineError> {
        self.inputs
            .iter()
            .map(|spec| {
                let value = row
                    .get(&spec.name)
                    .ok_or_else(|| PipelineError::MissingColumn(spec.name.clone()))?;
                Ok((spec.name.clone(), input_tensor(spec, value)?))
            })
            .collect()
    }
}

/// Build the `[1, 1]` tensor feeding one graph input.
fn input_tensor(spec: &InputSpec, value: &FeatureValue) -> Result<DynValue, PipelineError> {
    let shape = vec![1_i64, 1];

    let tensor = match spec.kind {
        InputKind::Text => Tensor::from_string_array((shape, &[value.as_text()][..]))?.into_dyn(),
        InputKind::Float32 => {
            Tensor::from_array((shape, vec![numeric(spec, value)? as f32]))?.into_dyn()
        }
        InputKind::Float64 => Tensor::from_array((shape, vec![numeric(spec, value)?]))?.into_dyn(),
        InputKind::Int64 => Tensor::from_array((shape, vec![integer(spec, value)?]))?.into_dyn(),
        InputKind::Int32 => {
            let v = i32::try_from(integer(spec, value)?).map_err(|_| type_error(spec))?;
            Tensor::from_array((shape, vec![v]))?.into_dyn()
        }
    };

    Ok(tensor)
}

fn type_error(spec: &InputSpec) -> PipelineError {
    PipelineError::InputType {
        column: spec.name.clone(),
        expected: spec.kind.describe(),
    }
}

fn numeric(spec: &InputSpec, value: &FeatureValue) -> Result<f64, PipelineError> {
    value.as_f64().ok_or_else(|| type_error(spec))
}

fn integer(spec: &InputSpec, value: &FeatureValue) -> Result<i64, PipelineError> {
    match value {
        FeatureValue::Integer(v) => Ok(*v),
        FeatureValue::Real(v) if v.fract() == 0.0 => Ok(*v as i64),
        _ => Err(type_error(spec)),
    }
}

impl Pipeline for OnnxPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> PipelineCapabilities {
        PipelineCapabilities {
            probability: self.probability_output.is_some(),
        }
    }

    fn predict(&self, row: &FeatureRow) -> Result<i64, PipelineError> {
        self.run_with(row, |outputs| extract_label(outputs, &self.label_output))
    }

    fn predict_probability(&self, row: &FeatureRow) -> Result<Vec<f64>, PipelineError> {
        let output_name = self
            .probability_output
            .as_deref()
            .ok_or(PipelineError::ProbabilityUnsupported)?;

        self.run_with(row, |outputs| extract_probabilities(outputs, output_name))
    }

    fn predict_scored(&self, row: &FeatureRow) -> Result<ScoredLabel, PipelineError> {
        self.run_with(row, |outputs| {
            let label = extract_label(outputs, &self.label_output)?;
            let probabilities = match self.probability_output.as_deref() {
                Some(name) => extract_probabilities(outputs, name),
                None => Err(PipelineError::ProbabilityUnsupported),
            };
            Ok(ScoredLabel {
                label,
                probabilities,
            })
        })
    }
}

/// Extract the predicted label of the first (only) row.
fn extract_label(outputs: &SessionOutputs, output_name: &str) -> Result<i64, PipelineError> {
    let output = outputs
        .get(output_name)
        .ok_or_else(|| PipelineError::Output(format!("missing output `{}`", output_name)))?;

    let label = if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
        data.first().copied()
    } else if let Ok((_, data)) = output.try_extract_tensor::<i32>() {
        data.first().map(|&v| v as i64)
    } else if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
        data.first().map(|&v| v.round() as i64)
    } else {
        return Err(PipelineError::Output(format!(
            "output `{}` has unsupported type {:?}",
            output_name,
            output.dtype()
        )));
    };

    label.ok_or_else(|| PipelineError::Output(format!("output `{}` is empty", output_name)))
}

/// Extract the class distribution of the first row.
/// Handles both tensor outputs and seq(map(int64, float)) outputs.
fn extract_probabilities(
    outputs: &SessionOutputs,
    output_name: &str,
) -> Result<Vec<f64>, PipelineError> {
    let output = outputs
        .get(output_name)
        .ok_or_else(|| PipelineError::Output(format!("missing output `{}`", output_name)))?;

    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let probs = first_row(shape, data);
        debug!(output = %output_name, classes = probs.len(), "Extracted from tensor");
        return Ok(probs);
    }

    if DynSequenceValueType::can_downcast(&output.dtype()) {
        return extract_from_sequence_map(output);
    }

    Err(PipelineError::Output(format!(
        "output `{}` has unsupported type {:?}",
        output_name,
        output.dtype()
    )))
}

/// Extract probabilities from seq(map(int64, float)), ordered by class id.
/// This is what classifier exports produce when class maps are kept.
fn extract_from_sequence_map(output: &DynValue) -> Result<Vec<f64>, PipelineError> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| PipelineError::Output(format!("Failed to downcast to sequence: {}", e)))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

    // batch_size is always 1
    let map_value = maps
        .first()
        .ok_or_else(|| PipelineError::Output("Empty sequence".to_string()))?;

    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

    debug!(classes = kv_pairs.len(), "Extracted from seq(map)");
    Ok(by_class_id(kv_pairs))
}

/// First row of a `[batch, num_classes]` or `[num_classes]` tensor.
fn first_row(shape: &[i64], data: &[f32]) -> Vec<f64> {
    let num_classes = shape.last().copied().unwrap_or(0).max(0) as usize;
    data.iter().take(num_classes).map(|&p| p as f64).collect()
}

/// Probabilities ordered by class id.
fn by_class_id(mut pairs: Vec<(i64, f32)>) -> Vec<f64> {
    pairs.sort_by_key(|(class_id, _)| *class_id);
    pairs.into_iter().map(|(_, p)| p as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: InputKind) -> InputSpec {
        InputSpec {
            name: "Number of Skills".to_string(),
            kind,
        }
    }

    #[test]
    fn test_input_kind_describe() {
        assert_eq!(InputKind::Text.describe(), "string");
        assert_eq!(InputKind::Float32.describe(), "float");
        assert_eq!(InputKind::Float64.describe(), "double");
        assert_eq!(InputKind::Int64.describe(), "int64");
        assert_eq!(InputKind::Int32.describe(), "int32");
    }

    #[test]
    fn test_integer_accepts_whole_values() {
        let spec = spec(InputKind::Int64);
        assert_eq!(integer(&spec, &FeatureValue::Integer(4)).unwrap(), 4);
        assert_eq!(integer(&spec, &FeatureValue::Real(4.0)).unwrap(), 4);
    }

    #[test]
    fn test_integer_rejects_fractions_and_text() {
        let spec = spec(InputKind::Int64);

        let err = integer(&spec, &FeatureValue::Real(4.5)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InputType { ref column, expected: "int64" } if column == "Number of Skills"
        ));
        assert!(integer(&spec, &FeatureValue::Text("4".to_string())).is_err());
    }

    #[test]
    fn test_numeric_rejects_text() {
        let spec = spec(InputKind::Float64);
        assert_eq!(numeric(&spec, &FeatureValue::Integer(3)).unwrap(), 3.0);
        assert_eq!(numeric(&spec, &FeatureValue::Real(2.5)).unwrap(), 2.5);

        let err = numeric(&spec, &FeatureValue::Text("Google".to_string())).unwrap_err();
        assert!(matches!(err, PipelineError::InputType { expected: "double", .. }));
    }

    #[test]
    fn test_int32_overflow_is_type_error() {
        let err = input_tensor(&spec(InputKind::Int32), &FeatureValue::Integer(i64::MAX))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::InputType { expected: "int32", .. }));
    }

    #[test]
    fn test_first_row_of_probability_tensor() {
        assert_eq!(first_row(&[1, 2], &[0.25, 0.75]), vec![0.25, 0.75]);
        assert_eq!(
            first_row(&[2, 3], &[0.5, 0.25, 0.25, 0.0, 0.0, 1.0]),
            vec![0.5, 0.25, 0.25]
        );
        assert_eq!(first_row(&[2], &[0.125, 0.875]), vec![0.125, 0.875]);
        assert!(first_row(&[], &[0.5]).is_empty());
    }

    #[test]
    fn test_sequence_map_sorted_by_class_id() {
        let pairs = vec![(1, 0.75), (0, 0.25)];
        assert_eq!(by_class_id(pairs), vec![0.25, 0.75]);
        assert!(by_class_id(Vec::new()).is_empty());
    }
}
