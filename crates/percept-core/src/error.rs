//! Error types for the percept-core library.

use thiserror::Error;

use crate::model::ModelKind;
use percept_inference::BackendKind;

/// Main error type for the percept library.
#[derive(Error, Debug)]
pub enum PerceptError {
    /// Session lifecycle error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Model loading or lifecycle error.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Image source error.
    #[error("image source error: {0}")]
    Source(#[from] SourceError),

    /// Inference error from the backend layer.
    #[error("inference error: {0}")]
    Inference(#[from] percept_inference::InferenceError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to the session lifecycle.
#[derive(Error, Debug)]
pub enum SessionError {
    /// An operation was attempted before a backend was initialized.
    #[error("backend not initialized")]
    NotInitialized,

    /// The session was disposed; disposal is terminal.
    #[error("session is disposed")]
    Disposed,

    /// A backend switch was requested while models remain cached.
    #[error("cannot switch backend from '{active}' to '{requested}' while {loaded} model(s) remain loaded")]
    BackendSwitch {
        active: BackendKind,
        requested: BackendKind,
        loaded: usize,
    },
}

/// Errors related to model loading and use.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Failed to load the model graph or its label vocabulary.
    #[error("failed to load model: {0}")]
    Load(String),

    /// The model was never loaded, or was disposed.
    #[error("model is not loaded")]
    NotLoaded,

    /// A model name was reused with a different path.
    #[error("model '{name}' is already loaded from a different path")]
    PathConflict { name: String },

    /// The wrapper only runs classification graphs.
    #[error("unsupported model kind: {0}")]
    UnsupportedKind(ModelKind),

    /// Invalid prediction options.
    #[error("invalid predict options: {0}")]
    InvalidOptions(String),
}

/// Errors related to image sources.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source could not be read or decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The image could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// A crop region falls outside the source image. Regions are never
    /// clamped to fit.
    #[error("crop region {width}x{height}+{x}+{y} outside image bounds {image_width}x{image_height}")]
    InvalidRegion {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
}

/// Result type for the percept library.
pub type Result<T> = std::result::Result<T, PerceptError>;
