//! train-rug-model
//!
//! Trains the rug pull classifier on synthetic data and exports the
//! standardizer and network as one graph with a metadata sidecar.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use tracing::{info, warn};

use zkml_graph::logging::init_logging;
use zkml_rugdetector::{RugDetectorConfig, TrainingPipeline, VERSION};

fn main() -> Result<()> {
    let matches = Command::new("train-rug-model")
        .version(VERSION)
        .about("Train the rug pull detector and export it as a portable graph")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory for the graph and its metadata"),
        )
        .arg(
            Arg::new("samples")
                .short('n')
                .long("samples")
                .value_name("COUNT")
                .help("Number of synthetic samples")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("OUTPUT")
                .help("Generate example config and exit"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(&["zkml_rugdetector", "train_rug_model"], log_level);

    if let Some(output_path) = matches.get_one::<String>("generate-config") {
        RugDetectorConfig::default()
            .save_to_file(output_path)
            .with_context(|| format!("failed to write config to {}", output_path))?;
        info!("Generated example config at: {}", output_path);
        return Ok(());
    }

    let mut config =
        RugDetectorConfig::load(matches.get_one::<String>("config").map(|s| s.as_str()))
            .context("failed to load configuration")?;
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output.dir = PathBuf::from(dir);
    }
    if let Some(samples) = matches.get_one::<usize>("samples") {
        config.training.samples = *samples;
    }
    config.validate()?;

    info!(version = VERSION, "Rug pull detector training pipeline");
    let outcome = TrainingPipeline::new(config)
        .run()
        .context("training run failed")?;

    println!("Model Performance:");
    println!("  Training Accuracy: {:.2}%", outcome.train_metrics.accuracy * 100.0);
    println!("  Test Accuracy:     {:.2}%", outcome.test_metrics.accuracy * 100.0);
    println!("  Precision:         {:.2}%", outcome.test_metrics.precision * 100.0);
    println!("  Recall:            {:.2}%", outcome.test_metrics.recall * 100.0);
    println!("  F1 Score:          {:.2}%", outcome.test_metrics.f1 * 100.0);

    let validation = &outcome.validation;
    println!("Graph inference:");
    println!("  Accuracy:          {:.2}%", validation.graph_accuracy * 100.0);
    println!(
        "  Agreement:         {:.2}% (required {:.2}%)",
        validation.agreement * 100.0,
        validation.min_agreement * 100.0
    );

    let compat = &validation.compatibility;
    println!("Tensor size limit {}:", compat.max_tensor_size);
    for check in compat.inputs.iter().chain(compat.outputs.iter()) {
        let elements = check
            .elements
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string());
        let mark = if check.within_limit { "ok" } else { "EXCEEDS" };
        println!("  {} {}: {} elements, {}", check.name, check.shape, elements, mark);
    }
    println!("  Compatible: {}", if compat.compatible { "YES" } else { "NO" });

    let (example, actual) = &outcome.example;
    println!("Example inference:");
    println!("  Prediction: {} ({})", example.prediction, example.verdict());
    println!("  Risk Score: {}/100", example.risk_score);
    println!("  Risk Level: {}", example.risk_level);
    println!("  Actual Label: {}", if *actual == 1 { "RUG PULL" } else { "SAFE" });

    if !validation.passed() {
        warn!("Exported graph failed a post-export check; see report above");
    }

    println!("Generated files:");
    println!("  Model:    {}", outcome.model_path.display());
    println!("  Metadata: {}", outcome.metadata_path.display());
    Ok(())
}
