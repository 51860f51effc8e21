//! Classify images with a loaded model.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use percept_core::{
    adapter, BackendKind, ImageSource, ModelSpec, PredictOptions, PredictionResult, Session,
};

#[derive(Args)]
pub struct ClassifyArgs {
    /// Path to the ONNX model file
    #[arg(short, long)]
    model: PathBuf,

    /// Logical model name used for caching
    #[arg(long, default_value = "default")]
    name: String,

    /// Label vocabulary file, one label per line
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Execution backend: cuda, tensorrt, wasm, cpu
    #[arg(short, long, default_value = "cpu")]
    backend: String,

    /// Model input size as HEIGHTxWIDTH
    #[arg(long, default_value = "224x224")]
    input_size: String,

    /// Number of top predictions to show
    #[arg(short = 'k', long, default_value_t = 5)]
    top_k: usize,

    /// Drop predictions with probability below this
    #[arg(short, long, default_value_t = 0.0)]
    threshold: f32,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Image files or URLs to classify
    #[arg(required = true)]
    inputs: Vec<String>,
}

#[derive(Serialize)]
struct ClassifiedInput {
    input: String,
    #[serde(flatten)]
    result: PredictionResult,
}

pub async fn run(args: ClassifyArgs) -> anyhow::Result<()> {
    let kind: BackendKind = args
        .backend
        .parse()
        .with_context(|| format!("invalid backend '{}'", args.backend))?;
    let (height, width) = parse_input_size(&args.input_size)?;

    let mut session = Session::new();
    session.initialize(kind)?;

    let mut spec = ModelSpec::new(&args.name, &args.model).with_input_size(height, width);
    if let Some(labels) = &args.labels {
        spec = spec.with_labels_path(labels);
    }
    session
        .load_model(&spec)
        .with_context(|| format!("failed to load {}", args.model.display()))?;

    let options = PredictOptions::new()
        .with_top_k(args.top_k)
        .with_threshold(args.threshold);

    let progress = if args.inputs.len() > 1 && !args.json {
        let bar = ProgressBar::new(args.inputs.len() as u64);
        bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);
        Some(bar)
    } else {
        None
    };

    let mut classified = Vec::with_capacity(args.inputs.len());

    for input in &args.inputs {
        if let Some(bar) = &progress {
            bar.set_message(input.clone());
        }

        let image = load_input(input)
            .await
            .with_context(|| format!("failed to load '{}'", input))?;
        let result = session.classify(&args.name, &image, &options)?;

        classified.push(ClassifiedInput {
            input: input.clone(),
            result,
        });

        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&classified)?);
    } else {
        for item in &classified {
            print_result(item);
        }
    }

    session.dispose();
    Ok(())
}

async fn load_input(input: &str) -> percept_core::Result<ImageSource> {
    let image = if input.starts_with("http://") || input.starts_with("https://") {
        adapter::load_from_url(input).await?
    } else {
        adapter::load_from_file(Path::new(input))?
    };
    Ok(ImageSource::from_image(image))
}

fn print_result(item: &ClassifiedInput) {
    println!("{}", style(&item.input).bold());
    if item.result.predictions.is_empty() {
        println!("  {}", style("no predictions above threshold").dim());
    }
    for prediction in &item.result.predictions {
        println!(
            "  {:<30} {}",
            prediction.label,
            style(format!("{:.1}%", prediction.probability * 100.0)).dim()
        );
    }
    println!(
        "  {}",
        style(format!("{}ms", item.result.processing_time_ms)).dim()
    );
}

pub(crate) fn parse_input_size(value: &str) -> anyhow::Result<(u32, u32)> {
    let (height, width) = value
        .split_once('x')
        .ok_or_else(|| anyhow::anyhow!("input size must look like 224x224, got '{}'", value))?;
    Ok((
        height.trim().parse().context("invalid height")?,
        width.trim().parse().context("invalid width")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_size() {
        assert_eq!(parse_input_size("224x224").unwrap(), (224, 224));
        assert_eq!(parse_input_size("192 x 256").unwrap(), (192, 256));
    }

    #[test]
    fn test_parse_input_size_rejects_garbage() {
        assert!(parse_input_size("224").is_err());
        assert!(parse_input_size("axb").is_err());
    }
}
