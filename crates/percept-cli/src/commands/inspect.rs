//! Print a model's metadata.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use percept_core::{BackendKind, ModelSpec, Session};

#[derive(Args)]
pub struct InspectArgs {
    /// Path to the ONNX model file
    #[arg(short, long)]
    model: PathBuf,

    /// Logical model name
    #[arg(long, default_value = "default")]
    name: String,

    /// Label vocabulary file, one label per line
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Model input size as HEIGHTxWIDTH
    #[arg(long, default_value = "224x224")]
    input_size: String,
}

pub async fn run(args: InspectArgs) -> anyhow::Result<()> {
    let (height, width) = super::classify::parse_input_size(&args.input_size)?;

    let mut session = Session::new();
    session.initialize(BackendKind::Cpu)?;

    let mut spec = ModelSpec::new(&args.name, &args.model).with_input_size(height, width);
    if let Some(labels) = &args.labels {
        spec = spec.with_labels_path(labels);
    }

    let model = session
        .load_model(&spec)
        .with_context(|| format!("failed to load {}", args.model.display()))?;

    println!("{}", serde_json::to_string_pretty(model.metadata())?);

    let info = session.memory_info();
    tracing::info!(
        "live tensors: {}, peak: {}, total allocations: {}",
        info.live_tensors,
        info.peak_tensors,
        info.total_allocations
    );

    session.dispose();
    Ok(())
}
