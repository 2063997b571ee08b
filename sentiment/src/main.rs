//! build-sentiment-model
//!
//! Builds the crypto-news sentiment graph, writes it with its vocabulary and
//! weight tables, and self-checks the reloaded artifact.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use tracing::{info, warn};
use zkml_graph::logging::init_logging;
use zkml_graph::{Session, Tensor};

use zkml_sentiment::{
    export_artifacts, run_self_check, SentimentClassifier, SentimentConfig, SentimentLabel,
    Vocabulary, SEQUENCE_LENGTH, VERSION,
};

fn main() -> Result<()> {
    let matches = Command::new("build-sentiment-model")
        .version(VERSION)
        .about("Build the embedding-sum crypto news sentiment model")
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
                .help("Directory for network.onnx, vocab.json and weights.json"),
        )
        .arg(
            Arg::new("classify")
                .long("classify")
                .value_name("HEADLINE")
                .help("Classify a headline with previously written artifacts and exit"),
        )
        .arg(
            Arg::new("skip-self-check")
                .long("skip-self-check")
                .help("Do not run the headline self-check after export")
                .action(ArgAction::SetTrue),
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
    init_logging(&["zkml_sentiment", "build_sentiment_model"], log_level);

    if let Some(output_path) = matches.get_one::<String>("generate-config") {
        SentimentConfig::default()
            .save_to_file(output_path)
            .with_context(|| format!("failed to write config to {}", output_path))?;
        info!("Generated example config at: {}", output_path);
        return Ok(());
    }

    let mut config = SentimentConfig::load(matches.get_one::<String>("config").map(|s| s.as_str()))
        .context("failed to load configuration")?;
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output_dir = PathBuf::from(dir);
    }
    if matches.get_flag("skip-self-check") {
        config.self_check = false;
    }

    if let Some(headline) = matches.get_one::<String>("classify") {
        return classify(&config, headline);
    }

    info!(version = VERSION, output_dir = %config.output_dir.display(), "Building sentiment model");

    let vocab = Vocabulary::builtin().context("lexicon failed validation")?;
    info!(
        unique_ids = vocab.unique_ids(),
        max_id = vocab.max_id(),
        word_mappings = vocab.word_count(),
        "Vocabulary ready"
    );

    let summary = export_artifacts(&vocab, &config).context("failed to export artifacts")?;
    info!("Model saved to {} ({} bytes)", summary.model_path.display(), summary.model_bytes);
    info!("Vocabulary saved to {}", summary.vocab_path.display());
    info!("Weights saved to {}", summary.weights_path.display());

    if config.self_check {
        let session = Session::load(&summary.model_path)
            .with_context(|| format!("failed to reload {}", summary.model_path.display()))?;
        let classifier = SentimentClassifier::new(vocab);
        let report = run_self_check(&classifier, Some(&session), config.min_self_check_accuracy)?;

        info!(
            "Accuracy: {}/{} = {:.1}%",
            report.correct,
            report.total,
            report.accuracy * 100.0
        );
        if report.passed() {
            info!("✅ Model passes accuracy test");
        } else {
            warn!("⚠️  Model needs improvement");
        }
    }

    Ok(())
}

/// Classify one headline using only the written artifacts
fn classify(config: &SentimentConfig, headline: &str) -> Result<()> {
    let vocab = Vocabulary::load(config.vocab_path(), config.weights_path())
        .context("failed to load vocabulary artifacts")?;
    let session = Session::load(config.model_path())
        .with_context(|| format!("failed to load {}", config.model_path().display()))?;

    let classifier = SentimentClassifier::new(vocab);
    let classification = classifier.classify(headline);

    let tokens = Tensor::int64(&[1, SEQUENCE_LENGTH], classification.tokens.clone().into_vec())?;
    let output = session.run_single(tokens)?;
    let positive = output
        .as_bool()?
        .iter()
        .next()
        .copied()
        .context("model returned an empty label tensor")?;
    let label = SentimentLabel::from_bool(positive);

    if label != classification.label {
        warn!(graph = %label, procedural = %classification.label, "Graph and scorer disagree");
    }

    println!("{}", headline);
    println!(
        "  Label: {}, Score: {:.1}, Matched: {:?}",
        label, classification.score, classification.matched_words
    );
    Ok(())
}
