//! WASM bindings for the percept inference session.
//!
//! This crate exposes the session facade to browsers: initialize the tract
//! backend once, load classification models from bytes, and classify
//! `ImageData` pixels straight from a canvas.

use wasm_bindgen::prelude::*;

use percept_core::{BackendKind, ImageSource, ModelSpec, PredictOptions, Session};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Inference session for browser use.
#[wasm_bindgen]
pub struct WasmSession {
    inner: Session,
}

#[wasm_bindgen]
impl WasmSession {
    /// Create an uninitialized session.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            inner: Session::new(),
        }
    }

    /// Activate an execution backend ("wasm" in the browser).
    #[wasm_bindgen]
    pub fn initialize(&mut self, backend: &str) -> Result<(), JsValue> {
        let kind: BackendKind = backend.parse().map_err(to_js)?;
        self.inner.initialize(kind).map_err(to_js)
    }

    /// Load a classification model from graph bytes.
    ///
    /// `labels` is an optional JS array of class names; `height`/`width`
    /// give the model's expected input size.
    #[wasm_bindgen]
    pub fn load_model(
        &mut self,
        name: &str,
        bytes: &[u8],
        labels: JsValue,
        height: u32,
        width: u32,
    ) -> Result<(), JsValue> {
        let labels: Vec<String> = if labels.is_undefined() || labels.is_null() {
            Vec::new()
        } else {
            serde_wasm_bindgen::from_value(labels).map_err(|e| JsValue::from_str(&e.to_string()))?
        };

        let spec = ModelSpec::new(name, "")
            .with_input_size(height, width)
            .with_labels(labels);

        self.inner
            .load_model_from_bytes(&spec, bytes)
            .map(|_| ())
            .map_err(to_js)
    }

    /// Classify canvas pixels against a loaded model.
    #[wasm_bindgen]
    pub fn classify(
        &self,
        name: &str,
        image: &web_sys::ImageData,
        top_k: usize,
        threshold: f32,
    ) -> Result<JsValue, JsValue> {
        let source = ImageSource::from_rgba(image.width(), image.height(), image.data().0);
        let options = PredictOptions::new()
            .with_top_k(top_k)
            .with_threshold(threshold);

        let result = self.inner.classify(name, &source, &options).map_err(to_js)?;
        serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Classify a raw RGBA buffer against a loaded model.
    #[wasm_bindgen]
    pub fn classify_rgba(
        &self,
        name: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
        top_k: usize,
        threshold: f32,
    ) -> Result<JsValue, JsValue> {
        let source = ImageSource::from_rgba(width, height, rgba.to_vec());
        let options = PredictOptions::new()
            .with_top_k(top_k)
            .with_threshold(threshold);

        let result = self.inner.classify(name, &source, &options).map_err(to_js)?;
        serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Name of the active backend, if initialized.
    #[wasm_bindgen]
    pub fn backend(&self) -> Option<String> {
        self.inner.backend().map(|kind| kind.to_string())
    }

    /// Names of loaded models.
    #[wasm_bindgen]
    pub fn loaded_models(&self) -> Vec<String> {
        self.inner
            .loaded_models()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Allocation counters for diagnostics.
    #[wasm_bindgen]
    pub fn memory_info(&self) -> Result<JsValue, JsValue> {
        #[derive(serde::Serialize)]
        struct MemoryInfoJs {
            live_tensors: usize,
            peak_tensors: usize,
            total_allocations: usize,
        }

        let info = self.inner.memory_info();
        let output = MemoryInfoJs {
            live_tensors: info.live_tensors,
            peak_tensors: info.peak_tensors,
            total_allocations: info.total_allocations,
        };

        serde_wasm_bindgen::to_value(&output).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Dispose every loaded model and terminate the session.
    #[wasm_bindgen]
    pub fn dispose(&mut self) {
        self.inner.dispose();
    }
}

impl Default for WasmSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_initialize_wasm_backend() {
        let mut session = WasmSession::new();
        session.initialize("wasm").unwrap();
        assert_eq!(session.backend(), Some("wasm".to_string()));

        // Idempotent for the same kind
        session.initialize("wasm").unwrap();
    }

    #[wasm_bindgen_test]
    fn test_unknown_backend_is_rejected() {
        let mut session = WasmSession::new();
        assert!(session.initialize("webgl2").is_err());
    }

    #[wasm_bindgen_test]
    fn test_dispose_is_terminal() {
        let mut session = WasmSession::new();
        session.initialize("wasm").unwrap();
        session.dispose();

        assert!(session.backend().is_none());
        assert!(session.initialize("wasm").is_err());
    }
}
