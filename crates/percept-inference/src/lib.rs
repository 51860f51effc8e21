//! Execution backend abstraction for percept.
//!
//! This crate provides a unified interface for running classification models
//! across different compute backends:
//! - `ort` with CUDA or TensorRT execution providers (or plain CPU) for
//!   native platforms
//! - `tract` for WASM/browser environments
//!
//! It also owns the tensor type and the allocation tracker that the session
//! layer uses to verify that no intermediate tensors outlive a prediction.

mod backend;
mod error;
mod memory;
mod tensor;

pub use backend::{BackendKind, ExecutionBackend, ModelSource, load_backend};
pub use error::InferenceError;
pub use memory::{MemoryInfo, MemoryTracker};
pub use tensor::Tensor;

#[cfg(feature = "native")]
pub use backend::ort::OrtBackend;

#[cfg(feature = "wasm")]
pub use backend::tract::TractBackend;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
