//! Model metadata, label vocabularies, and the loaded-model wrapper.

mod labels;
mod metadata;
mod spec;
mod wrapper;

pub use labels::load_labels;
pub use metadata::{ModelKind, ModelMetadata};
pub use spec::ModelSpec;
pub use wrapper::LoadedModel;

#[cfg(test)]
pub(crate) use wrapper::tests::stub_model_named;
