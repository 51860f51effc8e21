//! Model load specifications.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::metadata::ModelKind;

/// Everything needed to load one model: where the graph lives, what its
/// inputs look like, and which vocabulary names its classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    /// Logical model name (the session cache key).
    pub name: String,

    /// Path to the model graph file.
    pub path: PathBuf,

    /// Semantic version of the model artifact.
    pub version: String,

    /// What the model's outputs mean.
    pub kind: ModelKind,

    /// Expected input size as (height, width).
    pub input_size: (u32, u32),

    /// Inline label vocabulary (index -> class name).
    pub labels: Vec<String>,

    /// Label vocabulary file, one label per line. Used when `labels` is
    /// empty.
    pub labels_path: Option<PathBuf>,

    /// Number of output classes, when the vocabulary does not pin it down.
    pub num_classes: Option<usize>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: PathBuf::new(),
            version: "0.0.0".to_string(),
            kind: ModelKind::Classification,
            input_size: (224, 224),
            labels: Vec::new(),
            labels_path: None,
            num_classes: None,
        }
    }
}

impl ModelSpec {
    /// Create a spec with the given name and graph path.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the artifact version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the expected input size (height, width).
    pub fn with_input_size(mut self, height: u32, width: u32) -> Self {
        self.input_size = (height, width);
        self
    }

    /// Set the inline label vocabulary.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Set a label vocabulary file.
    pub fn with_labels_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.labels_path = Some(path.into());
        self
    }

    /// Set the model kind.
    pub fn with_kind(mut self, kind: ModelKind) -> Self {
        self.kind = kind;
        self
    }

    /// Load a spec from a JSON manifest file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Resolve the label vocabulary: inline labels win, then the labels
    /// file, then an empty (degenerate) vocabulary.
    pub fn resolve_labels(&self) -> Result<Vec<String>, ModelError> {
        if !self.labels.is_empty() {
            return Ok(self.labels.clone());
        }
        match &self.labels_path {
            Some(path) => super::labels::load_labels(path),
            None => Ok(Vec::new()),
        }
    }
}
