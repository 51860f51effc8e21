//! The inference session facade.
//!
//! Single entry point for callers: owns backend selection, a name-keyed
//! model cache, and the allocation tracker shared by every component that
//! creates tensors. One session belongs to one logical caller; the cache is
//! never aliased from outside.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::adapter::{ImageAdapter, ImageSource};
use crate::config::SessionConfig;
use crate::error::{ModelError, Result, SessionError};
use crate::model::{LoadedModel, ModelSpec};
use crate::prediction::{PredictOptions, PredictionResult};
use percept_inference::{BackendKind, InferenceError, MemoryInfo, MemoryTracker, Tensor};

/// Lifecycle: uninitialized -> backend-active -> (model loaded)* -> disposed.
/// Disposal is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Uninitialized,
    Active(BackendKind),
    Disposed,
}

/// A browser-style inference session: one active backend, a cache of loaded
/// models keyed by logical name.
///
/// Backend-native failures such as out-of-memory surface as inference
/// errors and leave the backend in an unknown state; treat them as fatal to
/// the session - `dispose` and re-`initialize`.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    models: HashMap<String, Arc<LoadedModel>>,
    paths: HashMap<String, PathBuf>,
    tracker: MemoryTracker,
    adapter: ImageAdapter,
    config: SessionConfig,
}

impl Session {
    /// Create an uninitialized session with default configuration.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create an uninitialized session with the given configuration.
    pub fn with_config(config: SessionConfig) -> Self {
        let tracker = MemoryTracker::new();
        Self {
            state: SessionState::Uninitialized,
            models: HashMap::new(),
            paths: HashMap::new(),
            adapter: ImageAdapter::with_tracker(tracker.clone())
                .with_jpeg_quality(config.jpeg_quality),
            tracker,
            config,
        }
    }

    /// Activate an execution backend.
    ///
    /// Idempotent for the currently active kind. Switching kinds is refused
    /// while models remain cached - dispose them (or the whole session)
    /// first. With an empty cache the switch is allowed.
    pub fn initialize(&mut self, kind: BackendKind) -> Result<()> {
        match self.state {
            SessionState::Disposed => Err(SessionError::Disposed.into()),
            SessionState::Active(active) if active == kind => {
                debug!("Backend '{}' already active", kind);
                Ok(())
            }
            SessionState::Active(active) => {
                if !self.models.is_empty() {
                    return Err(SessionError::BackendSwitch {
                        active,
                        requested: kind,
                        loaded: self.models.len(),
                    }
                    .into());
                }
                if !kind.is_supported() {
                    return Err(InferenceError::UnsupportedBackend(kind).into());
                }
                info!("Switched backend from '{}' to '{}'", active, kind);
                self.state = SessionState::Active(kind);
                Ok(())
            }
            SessionState::Uninitialized => {
                if !kind.is_supported() {
                    return Err(InferenceError::UnsupportedBackend(kind).into());
                }
                info!("Initialized backend '{}'", kind);
                self.state = SessionState::Active(kind);
                Ok(())
            }
        }
    }

    /// Load a model, or return the cached instance when the name was
    /// already loaded.
    ///
    /// The cache key is the logical name, not the path: reusing a name with
    /// a different path is rejected rather than silently ignored.
    pub fn load_model(&mut self, spec: &ModelSpec) -> Result<Arc<LoadedModel>> {
        let kind = self.active_backend()?;

        if let Some(existing) = self.models.get(&spec.name) {
            if self.paths.get(&spec.name) != Some(&spec.path) {
                return Err(ModelError::PathConflict {
                    name: spec.name.clone(),
                }
                .into());
            }
            debug!("Model '{}' served from cache", spec.name);
            return Ok(Arc::clone(existing));
        }

        let model = Arc::new(LoadedModel::load(spec, kind, &self.tracker)?);
        self.models.insert(spec.name.clone(), Arc::clone(&model));
        self.paths.insert(spec.name.clone(), spec.path.clone());
        Ok(model)
    }

    /// Load a model from in-memory graph bytes (the browser path). Cache
    /// semantics match [`Session::load_model`].
    pub fn load_model_from_bytes(
        &mut self,
        spec: &ModelSpec,
        bytes: &[u8],
    ) -> Result<Arc<LoadedModel>> {
        let kind = self.active_backend()?;

        if let Some(existing) = self.models.get(&spec.name) {
            debug!("Model '{}' served from cache", spec.name);
            return Ok(Arc::clone(existing));
        }

        let model = Arc::new(LoadedModel::load_from_bytes(spec, bytes, kind, &self.tracker)?);
        self.models.insert(spec.name.clone(), Arc::clone(&model));
        self.paths.insert(spec.name.clone(), spec.path.clone());
        Ok(model)
    }

    /// Cache a model assembled by the caller (e.g. around a custom
    /// backend). The name comes from the model's metadata; reusing a cached
    /// name is rejected.
    pub fn register_model(&mut self, model: LoadedModel) -> Result<Arc<LoadedModel>> {
        self.active_backend()?;

        let name = model.metadata().name.clone();
        if self.models.contains_key(&name) {
            return Err(ModelError::PathConflict { name }.into());
        }

        let model = Arc::new(model);
        self.models.insert(name.clone(), Arc::clone(&model));
        self.paths.insert(name, PathBuf::new());
        Ok(model)
    }

    /// Convert an image source to a tensor using the facade-default target
    /// size.
    pub fn preprocess_image(&self, source: &ImageSource) -> Result<Tensor> {
        if self.state == SessionState::Disposed {
            return Err(SessionError::Disposed.into());
        }
        self.adapter
            .to_tensor(source, self.config.default_input_size, true)
    }

    /// Preprocess and predict in one call against a cached model.
    pub fn classify(
        &self,
        name: &str,
        source: &ImageSource,
        options: &PredictOptions,
    ) -> Result<PredictionResult> {
        self.active_backend()?;

        let model = self.models.get(name).ok_or(ModelError::NotLoaded)?;
        let tensor = model.preprocess(source)?;
        model.predict(&tensor, options)
    }

    /// A cached model by name.
    pub fn model(&self, name: &str) -> Option<Arc<LoadedModel>> {
        self.models.get(name).cloned()
    }

    /// Names of all cached models.
    pub fn loaded_models(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// The active backend kind, if any.
    pub fn backend(&self) -> Option<BackendKind> {
        match self.state {
            SessionState::Active(kind) => Some(kind),
            _ => None,
        }
    }

    /// Allocation counters for diagnostics.
    pub fn memory_info(&self) -> MemoryInfo {
        self.tracker.snapshot()
    }

    /// The session's image adapter, for crop/resize/data-URL helpers.
    pub fn adapter(&self) -> &ImageAdapter {
        &self.adapter
    }

    /// Dispose every cached model and terminate the session. Safe to call
    /// more than once; every later operation fails.
    pub fn dispose(&mut self) {
        for model in self.models.values() {
            model.dispose();
        }
        self.models.clear();
        self.paths.clear();

        if self.state != SessionState::Disposed {
            info!("Session disposed");
        }
        self.state = SessionState::Disposed;
    }

    fn active_backend(&self) -> Result<BackendKind> {
        match self.state {
            SessionState::Active(kind) => Ok(kind),
            SessionState::Uninitialized => Err(SessionError::NotInitialized.into()),
            SessionState::Disposed => Err(SessionError::Disposed.into()),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PerceptError;
    use crate::model::stub_model_named;
    use image::{DynamicImage, Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn test_source() -> ImageSource {
        ImageSource::from_image(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            16,
            16,
            Rgb([50, 60, 70]),
        )))
    }

    fn active_session() -> Session {
        let mut session = Session::new();
        session.initialize(BackendKind::Cpu).unwrap();
        session
    }

    fn register_stub(session: &mut Session, name: &str, scores: Vec<f32>) -> Arc<LoadedModel> {
        let model = stub_model_named(name, scores, vec![], &session.tracker);
        session.register_model(model).unwrap()
    }

    #[test]
    fn test_predict_before_initialize_fails_fast() {
        let session = Session::new();
        let result = session.classify("any", &test_source(), &PredictOptions::new());

        assert!(matches!(
            result,
            Err(PerceptError::Session(SessionError::NotInitialized))
        ));
    }

    #[test]
    fn test_load_before_initialize_fails_fast() {
        let mut session = Session::new();
        let result = session.load_model(&ModelSpec::new("m", "m.onnx"));

        assert!(matches!(
            result,
            Err(PerceptError::Session(SessionError::NotInitialized))
        ));
    }

    #[test]
    fn test_initialize_same_backend_is_a_no_op() {
        let mut session = active_session();
        session.initialize(BackendKind::Cpu).unwrap();
        assert_eq!(session.backend(), Some(BackendKind::Cpu));
    }

    #[test]
    fn test_switch_with_loaded_models_is_rejected() {
        let mut session = active_session();
        register_stub(&mut session, "m", vec![0.5, 0.5]);

        let result = session.initialize(BackendKind::Cuda);
        assert!(matches!(
            result,
            Err(PerceptError::Session(SessionError::BackendSwitch {
                loaded: 1,
                ..
            }))
        ));
        // The original backend stays active
        assert_eq!(session.backend(), Some(BackendKind::Cpu));
    }

    #[test]
    fn test_switch_with_empty_cache_is_allowed() {
        let mut session = active_session();
        session.initialize(BackendKind::Cuda).unwrap();
        assert_eq!(session.backend(), Some(BackendKind::Cuda));
    }

    #[test]
    fn test_cached_model_is_the_same_instance() {
        let mut session = active_session();
        let first = register_stub(&mut session, "mobilenet", vec![0.2, 0.8]);

        // Same name, same (empty) path: served from cache without touching
        // any file
        let spec = ModelSpec::new("mobilenet", "");
        let second = session.load_model(&spec).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_same_name_different_path_is_rejected() {
        let mut session = active_session();
        register_stub(&mut session, "mobilenet", vec![0.2, 0.8]);

        let spec = ModelSpec::new("mobilenet", "somewhere/else.onnx");
        let result = session.load_model(&spec);

        assert!(matches!(
            result,
            Err(PerceptError::Model(ModelError::PathConflict { .. }))
        ));
    }

    #[test]
    fn test_classify_runs_the_pipeline() {
        let mut session = active_session();
        register_stub(&mut session, "m", vec![0.1, 0.7, 0.2]);

        let result = session
            .classify("m", &test_source(), &PredictOptions::new())
            .unwrap();

        assert_eq!(result.model, "m");
        assert_eq!(result.predictions[0].class_id, 1);
    }

    #[test]
    fn test_classify_unknown_model_fails_not_loaded() {
        let session = active_session();
        let result = session.classify("ghost", &test_source(), &PredictOptions::new());

        assert!(matches!(
            result,
            Err(PerceptError::Model(ModelError::NotLoaded))
        ));
    }

    #[test]
    fn test_classify_restores_allocation_baseline() {
        let mut session = active_session();
        register_stub(&mut session, "m", vec![0.4, 0.6]);

        let baseline = session.memory_info().live_tensors;
        let _result = session
            .classify("m", &test_source(), &PredictOptions::new())
            .unwrap();

        assert_eq!(session.memory_info().live_tensors, baseline);
    }

    #[test]
    fn test_preprocess_image_uses_default_size() {
        let session = active_session();
        let tensor = session.preprocess_image(&test_source()).unwrap();
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
    }

    #[test]
    fn test_dispose_is_terminal_and_idempotent() {
        let mut session = active_session();
        let model = register_stub(&mut session, "m", vec![0.5]);

        session.dispose();
        session.dispose();

        assert!(!model.is_loaded());
        assert_eq!(session.backend(), None);
        assert!(session.loaded_models().is_empty());

        assert!(matches!(
            session.initialize(BackendKind::Cpu),
            Err(PerceptError::Session(SessionError::Disposed))
        ));
        assert!(matches!(
            session.preprocess_image(&test_source()),
            Err(PerceptError::Session(SessionError::Disposed))
        ));
        assert!(matches!(
            session.classify("m", &test_source(), &PredictOptions::new()),
            Err(PerceptError::Session(SessionError::Disposed))
        ));
    }

    #[test]
    fn test_disposed_model_handle_fails_not_loaded() {
        let mut session = active_session();
        let model = register_stub(&mut session, "m", vec![0.5]);
        let tensor = model.preprocess(&test_source()).unwrap();

        session.dispose();

        let result = model.predict(&tensor, &PredictOptions::new());
        assert!(matches!(
            result,
            Err(PerceptError::Model(ModelError::NotLoaded))
        ));
    }
}
