//! extract-features
//!
//! Reads a token contract through a node and writes its 60-feature vector
//! to `extracted_features.json`. Optionally scores it with an exported graph.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Arg, Command};
use tracing::{info, warn};
use zkml_graph::logging::init_logging;
use zkml_graph::Session;

use zkml_rugdetector::extractor::parse_token_address;
use zkml_rugdetector::{
    assess, ExtractedFeatures, FeatureExtractor, RpcChainReader, RugDetectorConfig, VERSION,
};

fn cli() -> Command {
    Command::new("extract-features")
        .version(VERSION)
        .about("Extract 60 on-chain rug pull features for an ERC20 token")
        .arg(
            Arg::new("token-address")
                .value_name("TOKEN_ADDRESS")
                .help("Token contract address")
                .required(true),
        )
        .arg(
            Arg::new("rpc-url")
                .value_name("RPC_URL")
                .help("Node endpoint; falls back to the RPC_URL variable, then the config"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Where to write the extracted features"),
        )
        .arg(
            Arg::new("assess")
                .long("assess")
                .value_name("MODEL")
                .help("Score the extracted features with an exported rug detector graph"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let mut command = cli();
    let matches = command.clone().get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(&["zkml_rugdetector", "extract_features"], log_level);

    let config =
        RugDetectorConfig::load(matches.get_one::<String>("config").map(|s| s.as_str()))
            .context("failed to load configuration")?;

    let cli_url = matches.get_one::<String>("rpc-url").map(String::as_str);
    let rpc_url = match config.resolve_rpc_url(cli_url) {
        Some(url) => url,
        None => command
            .error(
                ErrorKind::MissingRequiredArgument,
                "No RPC URL provided. Set RPC_URL env var or pass as argument.",
            )
            .exit(),
    };

    let token_arg = matches
        .get_one::<String>("token-address")
        .context("token address is required")?;
    let token = parse_token_address(token_arg)?;

    let timeout = Duration::from_secs(config.rpc.timeout_seconds);
    let reader = RpcChainReader::connect(&rpc_url, timeout)
        .await
        .context("cannot extract features without a reachable node")?;

    let extraction = FeatureExtractor::new(reader).extract(token).await;
    if !extraction.is_complete() {
        warn!(fallbacks = ?extraction.fallbacks, "Some features fell back to defaults");
    }

    let values = extraction.features.to_vec();
    println!("Extracted {} features:", values.len());
    println!("  {:?}... (showing first 10)", &values[..10]);

    let output_path = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.features_path());
    ExtractedFeatures::new(token, &extraction.features)
        .save(&output_path)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    info!("Saved to {}", output_path.display());

    if let Some(model) = matches.get_one::<String>("assess") {
        let session =
            Session::load(model).with_context(|| format!("failed to load model {}", model))?;
        let assessment = assess(&session, &extraction.features)?;

        println!("Prediction: {} ({})", assessment.prediction, assessment.verdict());
        println!("Risk Score: {}/100", assessment.risk_score);
        println!("Risk Level: {}", assessment.risk_level);
    }

    Ok(())
}
