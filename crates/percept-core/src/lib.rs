//! Core library for percept, a browser-style inference session manager for
//! image-classification models.
//!
//! This crate provides:
//! - An image adapter turning heterogeneous sources (decoded images, raw
//!   RGBA buffers, files, URLs) into normalized `[1, H, W, 3]` tensors
//! - A model wrapper running the preprocess -> execute -> top-K pipeline
//!   with deterministic release of intermediate tensors
//! - A session facade owning backend selection and a name-keyed model cache

pub mod adapter;
pub mod config;
pub mod error;
pub mod model;
pub mod prediction;
pub mod session;

pub use adapter::{load_from_bytes, load_from_file, ImageAdapter, ImageSource};
pub use config::SessionConfig;
pub use error::{ModelError, PerceptError, Result, SessionError, SourceError};
pub use model::{load_labels, LoadedModel, ModelKind, ModelMetadata, ModelSpec};
pub use prediction::{select_top_k, PredictOptions, Prediction, PredictionResult};
pub use session::Session;

#[cfg(feature = "native")]
pub use adapter::load_from_url;

/// Re-export inference types.
pub use percept_inference::{
    BackendKind, ExecutionBackend, InferenceError, MemoryInfo, MemoryTracker, Tensor,
};

#[cfg(feature = "native")]
pub use percept_inference::OrtBackend;

#[cfg(feature = "wasm")]
pub use percept_inference::TractBackend;
