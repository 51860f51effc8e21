//! Tract backend for WASM and other pure-Rust targets.

use std::path::Path;

use ndarray::ArrayD;
use tract_onnx::prelude::*;
use tracing::debug;

use crate::backend::{BackendKind, ExecutionBackend};
use crate::error::InferenceError;
use crate::memory::MemoryTracker;
use crate::tensor::Tensor;
use crate::Result;

/// Backend using Tract for portable inference.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    tracker: MemoryTracker,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl TractBackend {
    /// Load a model from a file path with the given concrete input shape.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        input_shape: &[usize],
        tracker: &MemoryTracker,
    ) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading model with Tract from: {}", path.display());

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        Self::compile(model, input_shape, tracker)
    }

    /// Load a model from bytes with the given concrete input shape.
    pub fn from_bytes(bytes: &[u8], input_shape: &[usize], tracker: &MemoryTracker) -> Result<Self> {
        debug!("Loading model with Tract from {} bytes", bytes.len());

        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        Self::compile(model, input_shape, tracker)
    }

    fn compile(
        mut model: InferenceModel,
        input_shape: &[usize],
        tracker: &MemoryTracker,
    ) -> Result<Self> {
        // Concrete input shape replaces any dynamic dimensions in the graph
        model
            .set_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), input_shape))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to set input shape: {}", e)))?;

        let model = model
            .into_typed()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to type model: {}", e)))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to optimize: {}", e)))?
            .into_runnable()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        // Tract doesn't expose input/output names as easily, use fixed names
        let input_names = vec!["input".to_string()];
        let output_names = vec!["output".to_string()];

        Ok(Self {
            model,
            tracker: tracker.clone(),
            input_names,
            output_names,
        })
    }

    fn convert_input(&self, tensor: &Tensor) -> Result<TValue> {
        let shape: TVec<usize> = tensor.shape().iter().cloned().collect();
        let data: Vec<f32> = tensor.view().iter().copied().collect();
        let tract_tensor =
            tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(shape.as_slice()), data)
                .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
        Ok(tract_tensor.into_tvalue())
    }
}

impl ExecutionBackend for TractBackend {
    fn run(&self, inputs: &[(&str, &Tensor)]) -> Result<Vec<(String, Tensor)>> {
        let tract_inputs: TVec<TValue> = inputs
            .iter()
            .map(|(_, tensor)| self.convert_input(tensor))
            .collect::<Result<TVec<_>>>()?;

        let outputs = self
            .model
            .run(tract_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());

        for (idx, output) in outputs.iter().enumerate() {
            let name = self
                .output_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("output_{}", idx));

            let arr = output.to_array_view::<f32>().map_err(|_| {
                InferenceError::OutputExtraction(format!("unsupported output type for '{}'", name))
            })?;
            let shape: Vec<usize> = arr.shape().to_vec();
            let data: Vec<f32> = arr.iter().cloned().collect();
            let arr = ArrayD::from_shape_vec(ndarray::IxDyn(&shape), data)
                .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;

            results.push((name, Tensor::tracked(arr, &self.tracker)));
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
        BackendKind::Wasm
    }
}
