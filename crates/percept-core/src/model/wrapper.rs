//! The loaded-model wrapper: preprocess, predict, dispose.

use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, info};

use crate::adapter::{ImageAdapter, ImageSource};
use crate::error::{ModelError, Result};
use crate::model::metadata::{ModelKind, ModelMetadata};
use crate::model::spec::ModelSpec;
use crate::prediction::{select_top_k, PredictOptions, Prediction, PredictionResult};
use percept_inference::{
    load_backend, BackendKind, ExecutionBackend, InferenceError, MemoryTracker, ModelSource, Tensor,
};

/// A compiled classification graph plus its immutable metadata.
///
/// Owns the backend handle; `dispose` releases it, after which `predict`
/// fails with a not-loaded error instead of touching a freed handle.
pub struct LoadedModel {
    backend: Mutex<Option<Box<dyn ExecutionBackend>>>,
    metadata: ModelMetadata,
    adapter: ImageAdapter,
}

impl LoadedModel {
    /// Wrap an already-constructed backend.
    ///
    /// Only classification graphs run through this wrapper; other kinds are
    /// rejected so detection-only result fields stay unrepresentable here.
    pub fn new(
        backend: Box<dyn ExecutionBackend>,
        metadata: ModelMetadata,
        tracker: &MemoryTracker,
    ) -> Result<Self> {
        if metadata.kind != ModelKind::Classification {
            return Err(ModelError::UnsupportedKind(metadata.kind).into());
        }

        Ok(Self {
            backend: Mutex::new(Some(backend)),
            metadata,
            adapter: ImageAdapter::with_tracker(tracker.clone()),
        })
    }

    /// Load a model from its spec's graph file.
    pub fn load(spec: &ModelSpec, kind: BackendKind, tracker: &MemoryTracker) -> Result<Self> {
        let metadata = Self::build_metadata(spec)?;
        let backend = load_backend(
            kind,
            ModelSource::File(&spec.path),
            &metadata.input_shape,
            tracker,
        )
        .map_err(|e| ModelError::Load(e.to_string()))?;

        info!("Loaded model '{}' on backend '{}'", metadata.name, kind);
        Ok(Self {
            backend: Mutex::new(Some(backend)),
            metadata,
            adapter: ImageAdapter::with_tracker(tracker.clone()),
        })
    }

    /// Load a model from in-memory graph bytes (the browser path).
    pub fn load_from_bytes(
        spec: &ModelSpec,
        bytes: &[u8],
        kind: BackendKind,
        tracker: &MemoryTracker,
    ) -> Result<Self> {
        let metadata = Self::build_metadata(spec)?;
        let backend = load_backend(
            kind,
            ModelSource::Bytes(bytes),
            &metadata.input_shape,
            tracker,
        )
        .map_err(|e| ModelError::Load(e.to_string()))?;

        info!(
            "Loaded model '{}' from {} bytes on backend '{}'",
            metadata.name,
            bytes.len(),
            kind
        );
        Ok(Self {
            backend: Mutex::new(Some(backend)),
            metadata,
            adapter: ImageAdapter::with_tracker(tracker.clone()),
        })
    }

    fn build_metadata(spec: &ModelSpec) -> Result<ModelMetadata> {
        if spec.kind != ModelKind::Classification {
            return Err(ModelError::UnsupportedKind(spec.kind).into());
        }

        let labels = spec.resolve_labels()?;
        let num_classes = spec.num_classes.unwrap_or(labels.len());
        let (height, width) = spec.input_size;

        Ok(ModelMetadata {
            name: spec.name.clone(),
            version: spec.version.clone(),
            input_shape: [1, height as usize, width as usize, 3],
            output_shape: vec![1, num_classes],
            labels,
            kind: spec.kind,
        })
    }

    /// Convert an image source into this model's expected input tensor:
    /// bilinear resize to the metadata's input size, normalize to [0, 1],
    /// leading batch dimension of 1.
    pub fn preprocess(&self, source: &ImageSource) -> Result<Tensor> {
        self.adapter
            .to_tensor(source, self.metadata.input_size(), true)
    }

    /// Run one forward pass and extract the top-K classes.
    ///
    /// Intermediate tensors (the raw output, its squeezed scores) are all
    /// released before this returns; the allocation count observed through
    /// the session's tracker ends where it started.
    pub fn predict(&self, tensor: &Tensor, options: &PredictOptions) -> Result<PredictionResult> {
        if options.top_k == 0 {
            return Err(ModelError::InvalidOptions("top_k must be at least 1".to_string()).into());
        }

        if tensor.shape() != self.metadata.input_shape.as_slice() {
            return Err(InferenceError::InvalidInput(format!(
                "input shape {:?} does not match expected {:?}",
                tensor.shape(),
                self.metadata.input_shape
            ))
            .into());
        }

        let start = Instant::now();

        let guard = self
            .backend
            .lock()
            .map_err(|e| InferenceError::InferenceFailed(format!("Failed to lock model: {}", e)))?;
        let backend = guard.as_ref().ok_or(ModelError::NotLoaded)?;

        let input_name = backend
            .input_names()
            .first()
            .map(String::as_str)
            .unwrap_or("input");

        let outputs = backend.run(&[(input_name, tensor)])?;

        let (_, output) = outputs.into_iter().next().ok_or_else(|| {
            InferenceError::OutputExtraction("model produced no outputs".to_string())
        })?;

        let scores: Vec<f32> = output.view().iter().copied().collect();
        // The raw output tensor is dropped here; only plain floats survive
        drop(output);

        let predictions: Vec<Prediction> = select_top_k(&scores, options.top_k, options.threshold)
            .into_iter()
            .map(|(class_id, probability)| Prediction {
                class_id,
                label: self.metadata.label(class_id),
                probability,
            })
            .collect();

        let processing_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Model '{}' predicted {} classes in {}ms",
            self.metadata.name,
            predictions.len(),
            processing_time_ms
        );

        Ok(PredictionResult {
            model: self.metadata.name.clone(),
            predictions,
            processing_time_ms,
        })
    }

    /// The model's immutable description.
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Whether the graph handle is still held.
    pub fn is_loaded(&self) -> bool {
        self.backend.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Release the graph. Idempotent; later `predict` calls fail with a
    /// not-loaded error.
    pub fn dispose(&self) {
        match self.backend.lock() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        debug!("Disposed model '{}'", self.metadata.name);
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("metadata", &self.metadata)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
