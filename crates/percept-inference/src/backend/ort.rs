//! ONNX Runtime (ort) backend for native platforms.
//!
//! Backend kind selects the execution provider: CUDA for GPU-accelerated
//! execution, TensorRT for next-generation GPU execution, or none for the
//! plain CPU fallback.

use std::path::Path;
use std::sync::Mutex;

use ndarray::ArrayD;
use ort::ep::{CUDA, TensorRT};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor as OrtTensor;
use tracing::debug;

use crate::backend::{BackendKind, ExecutionBackend};
use crate::error::InferenceError;
use crate::memory::MemoryTracker;
use crate::tensor::Tensor;
use crate::Result;

/// Backend using ONNX Runtime for native inference.
pub struct OrtBackend {
    session: Mutex<Session>,
    kind: BackendKind,
    tracker: MemoryTracker,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl OrtBackend {
    /// Load a model from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P, kind: BackendKind, tracker: &MemoryTracker) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading model from: {}", path.display());

        let bytes = std::fs::read(path).map_err(InferenceError::Io)?;

        Self::from_bytes(&bytes, kind, tracker)
    }

    /// Load a model from bytes.
    pub fn from_bytes(bytes: &[u8], kind: BackendKind, tracker: &MemoryTracker) -> Result<Self> {
        debug!("Loading model from {} bytes for backend '{}'", bytes.len(), kind);

        let builder = Session::builder()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        let builder = match kind {
            BackendKind::Cuda => builder
                .with_execution_providers([CUDA::default().build()])
                .map_err(|e| InferenceError::SessionCreate(e.to_string()))?,
            BackendKind::TensorRt => builder
                .with_execution_providers([TensorRT::default().build()])
                .map_err(|e| InferenceError::SessionCreate(e.to_string()))?,
            BackendKind::Cpu => builder,
            BackendKind::Wasm => return Err(InferenceError::UnsupportedBackend(kind)),
        };

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_intra_threads(4)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .commit_from_memory(bytes)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        debug!("Model inputs: {:?}", input_names);
        debug!("Model outputs: {:?}", output_names);

        Ok(Self {
            session: Mutex::new(session),
            kind,
            tracker: tracker.clone(),
            input_names,
            output_names,
        })
    }

    fn convert_input(&self, tensor: &Tensor) -> Result<ort::session::SessionInputValue<'static>> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&s| s as i64).collect();
        let data: Vec<f32> = tensor.view().iter().copied().collect();
        OrtTensor::from_array((shape, data))
            .map(Into::into)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }
}

impl ExecutionBackend for OrtBackend {
    fn run(&self, inputs: &[(&str, &Tensor)]) -> Result<Vec<(String, Tensor)>> {
        let ort_inputs: Vec<(&str, ort::session::SessionInputValue<'static>)> = inputs
            .iter()
            .map(|(name, tensor)| {
                let value = self.convert_input(tensor)?;
                Ok((*name, value))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut session = self.session.lock()
            .map_err(|e| InferenceError::InferenceFailed(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());

        for (name, value) in outputs.iter() {
            let (shape_ref, data) = value.try_extract_tensor::<f32>().map_err(|_| {
                InferenceError::OutputExtraction(format!("unsupported output type for '{}'", name))
            })?;
            let shape: Vec<usize> = shape_ref.iter().map(|&s| s as usize).collect();
            let arr = ArrayD::from_shape_vec(ndarray::IxDyn(&shape), data.to_vec())
                .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;

            results.push((name.to_string(), Tensor::tracked(arr, &self.tracker)));
        }

        Ok(results)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }
}
