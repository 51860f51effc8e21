//! Immutable model descriptions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a model's outputs mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Classification,
    Detection,
    Recognition,
    Segmentation,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Classification => "classification",
            ModelKind::Detection => "detection",
            ModelKind::Recognition => "recognition",
            ModelKind::Segmentation => "segmentation",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record describing a loaded model.
///
/// Created when the model is loaded; never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Logical model name (the session cache key).
    pub name: String,

    /// Semantic version of the model artifact.
    pub version: String,

    /// Expected input shape: [batch, height, width, channels].
    pub input_shape: [usize; 4],

    /// Expected output shape, e.g. [1, num_classes].
    pub output_shape: Vec<usize>,

    /// Ordered label vocabulary (index -> class name). May be empty.
    pub labels: Vec<String>,

    /// What this model's outputs mean.
    pub kind: ModelKind,
}

impl ModelMetadata {
    /// Input size as a (height, width) pair.
    pub fn input_size(&self) -> (u32, u32) {
        (self.input_shape[1] as u32, self.input_shape[2] as u32)
    }

    /// Label for a class index, defaulting to `class_<index>` when the
    /// vocabulary has no entry.
    pub fn label(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", index))
    }

    /// Number of classes in the vocabulary (0 when degenerate).
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }
}
