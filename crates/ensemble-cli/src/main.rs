//! Command-line front end for ensemble prediction rounds
//!
//! Reads a prediction round document, aggregates and resolves it, evaluates
//! and reweights models when ground truth is present, and prints the report.
//!
//! # Usage
//!
//! ```bash
//! ensemble-cli --input round.json --output json
//!
//! # Persist learned weights across runs
//! ensemble-cli --input batch.json --output text --weights ./state/weights.json
//!
//! # Configuration file plus environment overrides
//! ENSEMBLE_STRATEGY=majority ensemble-cli --input round.json --config ensemble.toml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use ensemble_coordination::{
    format_to_json, load_snapshot, save_snapshot, DynamicWeightAdjuster, EnsembleConfig,
    EnsembleCoordinator, EnsembleError, Modality, OutputFormat, PredictionRound,
    SharedWeightAdjuster,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Prediction round document (.json)
    #[arg(long)]
    input: PathBuf,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    output: String,

    /// TOML configuration file (ENSEMBLE_* variables still override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Weight snapshot to seed from and write back to
    #[arg(long)]
    weights: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ensemble_coordination=info,ensemble_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<String> {
    let format: OutputFormat = args.output.parse()?;
    let config = load_config(args.config.as_deref())?;
    let round = read_round(&args.input)?;

    let weights = load_weights(&config, args.weights.as_deref())?;
    let coordinator = EnsembleCoordinator::new(config)?.with_weights(weights.clone());
    let report = coordinator.process_round(&round)?;

    if let Some(path) = &args.weights {
        let snapshot = weights
            .snapshot()
            .with_disagreement_threshold(coordinator.config().disagreement_threshold);
        save_snapshot(&snapshot, path)
            .with_context(|| format!("Failed to save weights to {}", path.display()))?;
        info!(path = %path.display(), models = snapshot.weights.len(), "Saved weight snapshot");
    }

    let rendered = match format {
        OutputFormat::Json => format_to_json(&report)?,
        OutputFormat::Text => report.to_plain_text(),
    };
    Ok(rendered)
}

fn load_config(path: Option<&Path>) -> Result<EnsembleConfig> {
    let base = match path {
        Some(path) => EnsembleConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EnsembleConfig::default(),
    };
    Ok(base.with_env_overrides(|key| std::env::var(key).ok())?)
}

fn read_round(path: &Path) -> Result<PredictionRound> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if extension.as_deref() != Some("json") {
        let modality = Modality::from_path(path)?;
        bail!(
            "{} input '{}' needs a preprocessing service and model pool; \
             pass a prediction round (.json) instead",
            modality,
            path.display()
        );
    }
    if !path.exists() {
        return Err(EnsembleError::resource_not_found(path).into());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse prediction round {}", path.display()))
}

/// Seed from an existing snapshot; update parameters always come from config
fn load_weights(config: &EnsembleConfig, path: Option<&Path>) -> Result<SharedWeightAdjuster> {
    let adjuster = DynamicWeightAdjuster::new(config.learning_rate, config.decay_factor);
    match path {
        Some(path) if path.exists() => {
            let snapshot = load_snapshot(path)?;
            info!(
                path = %path.display(),
                models = snapshot.weights.len(),
                "Loaded weight snapshot"
            );
            Ok(adjuster.with_initial_weights(snapshot.weights).into())
        }
        _ => Ok(adjuster.into()),
    }
}
