//! Configuration for the inference session.

use serde::{Deserialize, Serialize};

/// Session-level defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Default target size (height, width) used by the facade's
    /// `preprocess_image` convenience.
    pub default_input_size: (u32, u32),

    /// Default number of top predictions to return.
    pub default_top_k: usize,

    /// Default probability threshold for predictions.
    pub default_threshold: f32,

    /// JPEG quality used when encoding data URLs (0-100).
    pub jpeg_quality: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_input_size: (224, 224),
            default_top_k: 5,
            default_threshold: 0.0,
            jpeg_quality: 95,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
