//! Execution backend implementations.

#[cfg(feature = "native")]
pub mod ort;

#[cfg(feature = "wasm")]
pub mod tract;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::InferenceError;
use crate::memory::MemoryTracker;
use crate::tensor::Tensor;
use crate::Result;

/// The compute target that executes tensor operations.
///
/// Exactly one kind is active per session; switching requires
/// re-initialization at the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// GPU-accelerated execution (CUDA execution provider).
    Cuda,
    /// Next-generation GPU execution (TensorRT execution provider).
    TensorRt,
    /// Portable execution via tract, usable from WASM.
    Wasm,
    /// Plain CPU fallback.
    Cpu,
}

impl BackendKind {
    /// Stable lowercase name, also accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Cuda => "cuda",
            BackendKind::TensorRt => "tensorrt",
            BackendKind::Wasm => "wasm",
            BackendKind::Cpu => "cpu",
        }
    }

    /// Whether this build can construct a backend of this kind.
    pub fn is_supported(&self) -> bool {
        match self {
            BackendKind::Wasm => cfg!(feature = "wasm"),
            _ => cfg!(feature = "native"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cuda" | "gpu" => Ok(BackendKind::Cuda),
            "tensorrt" | "trt" => Ok(BackendKind::TensorRt),
            "wasm" | "tract" => Ok(BackendKind::Wasm),
            "cpu" => Ok(BackendKind::Cpu),
            other => Err(InferenceError::InvalidInput(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

/// Where a model graph is read from.
#[derive(Debug, Clone, Copy)]
pub enum ModelSource<'a> {
    /// A graph file on disk.
    File(&'a Path),
    /// A graph already in memory (the browser path).
    Bytes(&'a [u8]),
}

/// Trait for model execution backends.
///
/// This abstracts over different inference runtimes, allowing the same
/// session code to run on native platforms (via ort) and in the browser
/// (via tract). Output tensors are registered with the backend's tracker
/// so the session layer can verify they are released.
pub trait ExecutionBackend: Send + Sync {
    /// Run one forward pass with the given named inputs.
    fn run(&self, inputs: &[(&str, &Tensor)]) -> Result<Vec<(String, Tensor)>>;

    /// Input names expected by the model.
    fn input_names(&self) -> &[String];

    /// Output names produced by the model.
    fn output_names(&self) -> &[String];

    /// The kind this backend was built for.
    fn kind(&self) -> BackendKind;
}

/// Build a backend of the given kind from a model source.
///
/// `input_shape` is the concrete input the graph will be fed; tract needs it
/// to replace dynamic dimensions, ort infers shapes from the graph itself.
/// Fails with [`InferenceError::UnsupportedBackend`] when the kind is not
/// compiled into this build.
pub fn load_backend(
    kind: BackendKind,
    source: ModelSource<'_>,
    input_shape: &[usize],
    tracker: &MemoryTracker,
) -> Result<Box<dyn ExecutionBackend>> {
    if !kind.is_supported() {
        return Err(InferenceError::UnsupportedBackend(kind));
    }

    match kind {
        BackendKind::Wasm => {
            #[cfg(feature = "wasm")]
            {
                let backend = match source {
                    ModelSource::File(path) => {
                        tract::TractBackend::from_file(path, input_shape, tracker)?
                    }
                    ModelSource::Bytes(bytes) => {
                        tract::TractBackend::from_bytes(bytes, input_shape, tracker)?
                    }
                };
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "wasm"))]
            {
                let _ = (source, input_shape, tracker);
                Err(InferenceError::UnsupportedBackend(kind))
            }
        }
        BackendKind::Cuda | BackendKind::TensorRt | BackendKind::Cpu => {
            #[cfg(feature = "native")]
            {
                let _ = input_shape;
                let backend = match source {
                    ModelSource::File(path) => ort::OrtBackend::from_file(path, kind, tracker)?,
                    ModelSource::Bytes(bytes) => ort::OrtBackend::from_bytes(bytes, kind, tracker)?,
                };
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "native"))]
            {
                let _ = (source, input_shape, tracker);
                Err(InferenceError::UnsupportedBackend(kind))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [
            BackendKind::Cuda,
            BackendKind::TensorRt,
            BackendKind::Wasm,
            BackendKind::Cpu,
        ] {
            assert_eq!(kind.as_str().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("gpu".parse::<BackendKind>().unwrap(), BackendKind::Cuda);
        assert_eq!("trt".parse::<BackendKind>().unwrap(), BackendKind::TensorRt);
        assert_eq!("tract".parse::<BackendKind>().unwrap(), BackendKind::Wasm);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!("webgl".parse::<BackendKind>().is_err());
    }
}
