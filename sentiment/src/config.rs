//! Configuration for the sentiment model builder
//!
//! Values are layered: built-in defaults, then an optional `config/sentiment`
//! file, then `SENTIMENT__*` environment variables. The binary applies CLI
//! overrides on top.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SentimentError};

/// Sentiment builder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Directory receiving every artifact
    pub output_dir: PathBuf,

    /// Graph file name
    pub model_file: String,

    /// Word → id table file name
    pub vocab_file: String,

    /// Id → weight table file name
    pub weights_file: String,

    /// Run the headline self-check after export
    pub self_check: bool,

    /// Self-check accuracy required to report a pass
    pub min_self_check_accuracy: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            model_file: "network.onnx".to_string(),
            vocab_file: "vocab.json".to_string(),
            weights_file: "weights.json".to_string(),
            self_check: true,
            min_self_check_accuracy: 0.9,
        }
    }
}

impl SentimentConfig {
    /// Load from defaults, an optional file and the environment
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Config::builder().add_source(File::with_name("config/sentiment").required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix("SENTIMENT").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file only
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| SentimentError::Config(config::ConfigError::Foreign(Box::new(e))))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as YAML (used by `--generate-config`)
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| SentimentError::Config(config::ConfigError::Foreign(Box::new(e))))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("model_file", &self.model_file),
            ("vocab_file", &self.vocab_file),
            ("weights_file", &self.weights_file),
        ] {
            if value.trim().is_empty() {
                return Err(SentimentError::Config(config::ConfigError::Message(format!(
                    "{} must not be empty",
                    field
                ))));
            }
        }

        if !(0.0..=1.0).contains(&self.min_self_check_accuracy) {
            return Err(SentimentError::Config(config::ConfigError::Message(format!(
                "min_self_check_accuracy must be within [0, 1], got {}",
                self.min_self_check_accuracy
            ))));
        }

        Ok(())
    }

    pub fn model_path(&self) -> PathBuf {
        self.output_dir.join(&self.model_file)
    }

    pub fn vocab_path(&self) -> PathBuf {
        self.output_dir.join(&self.vocab_file)
    }

    pub fn weights_path(&self) -> PathBuf {
        self.output_dir.join(&self.weights_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SentimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.model_path(), PathBuf::from("./network.onnx"));
        assert_eq!(config.min_self_check_accuracy, 0.9);
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentiment.yaml");

        let config = SentimentConfig {
            output_dir: PathBuf::from("/tmp/models"),
            self_check: false,
            ..SentimentConfig::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = SentimentConfig::from_file(&path).unwrap();
        assert_eq!(loaded.output_dir, PathBuf::from("/tmp/models"));
        assert!(!loaded.self_check);
        assert_eq!(loaded.model_file, "network.onnx");
    }

    #[test]
    fn test_layered_load_with_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "model_file: custom.onnx\n").unwrap();

        let config = SentimentConfig::load(path.to_str()).unwrap();
        assert_eq!(config.model_file, "custom.onnx");
        // Untouched fields keep their defaults
        assert_eq!(config.vocab_file, "vocab.json");
    }

    #[test]
    fn test_invalid_accuracy_rejected() {
        let config = SentimentConfig {
            min_self_check_accuracy: 1.5,
            ..SentimentConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
