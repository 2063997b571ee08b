//! The `<model>_metadata.json` sidecar

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::features::FEATURE_COUNT;

pub const MODEL_NAME: &str = "Rug Pull Detector v1";
pub const MODEL_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataMetrics {
    pub test_accuracy: f64,
    pub train_accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Graph vs in-memory agreement on the test split
    pub export_agreement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    pub model_file: String,
    pub version: String,
    pub input_features: usize,
    pub output_type: String,
    pub output_range: [u8; 2],
    pub metrics: MetadataMetrics,
    pub jolt_compatible: bool,
    pub created_at: DateTime<Utc>,
    pub run_id: Uuid,
}

impl ModelMetadata {
    pub fn new<S: Into<String>>(
        model_file: S,
        metrics: MetadataMetrics,
        jolt_compatible: bool,
    ) -> Self {
        Self {
            model_name: MODEL_NAME.to_string(),
            model_file: model_file.into(),
            version: MODEL_VERSION.to_string(),
            input_features: FEATURE_COUNT,
            output_type: "risk_score".to_string(),
            output_range: [0, 1],
            metrics,
            jolt_compatible,
            created_at: Utc::now(),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        Ok(zkml_graph::write_json(path, self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> MetadataMetrics {
        MetadataMetrics {
            test_accuracy: 1.0,
            train_accuracy: 1.0,
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
            train_samples: 800,
            test_samples: 200,
            export_agreement: 1.0,
        }
    }

    #[test]
    fn test_sidecar_fields() {
        let metadata = ModelMetadata::new("rugdetector_v1.onnx", metrics(), true);
        let value = serde_json::to_value(&metadata).unwrap();

        assert_eq!(value["model_name"], "Rug Pull Detector v1");
        assert_eq!(value["version"], "1.0.0");
        assert_eq!(value["input_features"], 60);
        assert_eq!(value["output_type"], "risk_score");
        assert_eq!(value["output_range"], serde_json::json!([0, 1]));
        assert_eq!(value["jolt_compatible"], true);
        assert_eq!(value["metrics"]["train_samples"], 800);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rugdetector_v1_metadata.json");

        let metadata = ModelMetadata::new("rugdetector_v1.onnx", metrics(), false);
        metadata.save(&path).unwrap();
        assert_eq!(ModelMetadata::load(&path).unwrap(), metadata);
    }
}
