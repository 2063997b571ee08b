//! Configuration for extraction and training
//!
//! Layered like the sentiment builder: defaults, an optional
//! `config/rugdetector` file, then `RUGDETECTOR__*` environment variables.
//! The extractor additionally honours a plain `RPC_URL` variable.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, RugDetectorError};
use crate::mlp::MlpConfig;

/// Environment variable consulted for the node endpoint
pub const RPC_URL_ENV: &str = "RPC_URL";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RugDetectorConfig {
    pub rpc: RpcConfig,
    pub output: OutputConfig,
    pub training: TrainingConfig,
    pub validation: ValidationConfig,
}

/// Node RPC settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// HTTP endpoint; `RPC_URL` or the CLI argument take precedence
    pub url: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_seconds: 30,
        }
    }
}

/// Artifact locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub model_file: String,
    pub features_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            model_file: "rugdetector_v1.onnx".to_string(),
            features_file: "extracted_features.json".to_string(),
        }
    }
}

/// Synthetic data and classifier settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Total synthetic samples, split evenly between the classes
    pub samples: usize,

    /// Held-out share of every class
    pub test_fraction: f64,

    /// Seed for generation and splitting
    pub seed: u64,

    pub classifier: MlpConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            test_fraction: 0.2,
            seed: 42,
            classifier: MlpConfig::default(),
        }
    }
}

/// Post-export checks
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Share of held-out samples on which the exported graph must agree
    /// with the in-memory classifier
    pub min_agreement: f64,

    /// Per-sample element cap of the proving runtime
    pub max_tensor_size: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_agreement: 0.95,
            max_tensor_size: zkml_graph::DEFAULT_MAX_TENSOR_SIZE,
        }
    }
}

impl RugDetectorConfig {
    /// Load from defaults, an optional file and the environment
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Config::builder().add_source(File::with_name("config/rugdetector").required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix("RUGDETECTOR").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file only
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| RugDetectorError::Config(config::ConfigError::Foreign(Box::new(e))))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as YAML (used by `--generate-config`)
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| RugDetectorError::Config(config::ConfigError::Foreign(Box::new(e))))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.rpc.url {
            Url::parse(url).map_err(|e| {
                RugDetectorError::config_message(format!("invalid rpc.url {}: {}", url, e))
            })?;
        }

        if self.rpc.timeout_seconds == 0 {
            return Err(RugDetectorError::config_message(
                "rpc.timeout_seconds must be greater than 0",
            ));
        }

        if !self.output.model_file.ends_with(".onnx") {
            return Err(RugDetectorError::config_message(format!(
                "output.model_file must end with .onnx, got {}",
                self.output.model_file
            )));
        }

        if self.training.samples < 10 {
            return Err(RugDetectorError::config_message(format!(
                "training.samples must be at least 10, got {}",
                self.training.samples
            )));
        }

        if !(self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0) {
            return Err(RugDetectorError::config_message(format!(
                "training.test_fraction must be within (0, 1), got {}",
                self.training.test_fraction
            )));
        }

        if !(0.0..=1.0).contains(&self.validation.min_agreement) {
            return Err(RugDetectorError::config_message(format!(
                "validation.min_agreement must be within [0, 1], got {}",
                self.validation.min_agreement
            )));
        }

        self.training.classifier.validate()?;
        Ok(())
    }

    /// Endpoint precedence: explicit argument, then `RPC_URL`, then config
    pub fn resolve_rpc_url(&self, cli_url: Option<&str>) -> Option<String> {
        select_rpc_url(
            cli_url,
            std::env::var(RPC_URL_ENV).ok(),
            self.rpc.url.as_deref(),
        )
    }

    pub fn model_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.model_file)
    }

    /// Sidecar next to the model: `<stem>_metadata.json`
    pub fn metadata_path(&self) -> PathBuf {
        let file = self.output.model_file.replace(".onnx", "_metadata.json");
        self.output.dir.join(file)
    }

    pub fn features_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.features_file)
    }
}

/// First non-blank endpoint among argument, environment and config
pub fn select_rpc_url(
    cli_url: Option<&str>,
    env_url: Option<String>,
    configured: Option<&str>,
) -> Option<String> {
    let usable = |url: &str| !url.trim().is_empty();

    cli_url
        .filter(|url| usable(url))
        .map(str::to_string)
        .or_else(|| env_url.filter(|url| usable(url)))
        .or_else(|| configured.filter(|url| usable(url)).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RugDetectorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.training.samples, 1000);
        assert_eq!(config.validation.max_tensor_size, 64);
        assert_eq!(config.model_path(), PathBuf::from("./rugdetector_v1.onnx"));
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("./rugdetector_v1_metadata.json")
        );
    }

    #[test]
    fn test_explicit_rpc_url_wins() {
        let config = RugDetectorConfig {
            rpc: RpcConfig {
                url: Some("http://config.example:8545".to_string()),
                ..RpcConfig::default()
            },
            ..RugDetectorConfig::default()
        };

        assert_eq!(
            config.resolve_rpc_url(Some("http://cli.example:8545")).as_deref(),
            Some("http://cli.example:8545")
        );
    }

    #[test]
    fn test_no_rpc_url_anywhere() {
        assert_eq!(select_rpc_url(None, None, None), None);
        assert_eq!(select_rpc_url(Some("  "), Some(String::new()), None), None);
    }

    #[test]
    fn test_rpc_url_precedence() {
        let cli = "http://cli.example:8545";
        let env = || Some("http://env.example:8545".to_string());
        let configured = Some("http://config.example:8545");

        assert_eq!(select_rpc_url(Some(cli), env(), configured).as_deref(), Some(cli));
        assert_eq!(
            select_rpc_url(None, env(), configured).as_deref(),
            Some("http://env.example:8545")
        );
        assert_eq!(select_rpc_url(None, None, configured), configured.map(str::to_string));
    }

    #[test]
    fn test_blank_rpc_argument_falls_through() {
        let configured = Some("http://config.example:8545");

        assert_eq!(
            select_rpc_url(Some(""), Some("http://env.example:8545".to_string()), configured)
                .as_deref(),
            Some("http://env.example:8545")
        );
        assert_eq!(
            select_rpc_url(Some(" "), None, configured).as_deref(),
            Some("http://config.example:8545")
        );
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rugdetector.yaml");

        let mut config = RugDetectorConfig::default();
        config.training.samples = 200;
        config.training.classifier.max_epochs = 50;
        config.save_to_file(&path).unwrap();

        let loaded = RugDetectorConfig::from_file(&path).unwrap();
        assert_eq!(loaded.training.samples, 200);
        assert_eq!(loaded.training.classifier.max_epochs, 50);
        assert_eq!(loaded.training.classifier.hidden_layers, vec![30, 15]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = RugDetectorConfig::default();
        config.training.test_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = RugDetectorConfig::default();
        config.rpc.url = Some("not a url".to_string());
        assert!(config.validate().is_err());

        let mut config = RugDetectorConfig::default();
        config.output.model_file = "model.bin".to_string();
        assert!(config.validate().is_err());
    }
}
