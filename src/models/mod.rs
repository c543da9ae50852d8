//! Model hosting and pipeline execution

pub mod host;
pub mod loader;
pub mod onnx;
pub mod pipeline;

pub use host::{LoadedPipeline, ModelHost};
pub use loader::ModelLoader;
pub use onnx::OnnxPipeline;
pub use pipeline::{Pipeline, PipelineCapabilities, ScoredLabel};
