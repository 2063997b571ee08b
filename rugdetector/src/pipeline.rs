//! The training run: generate, split, fit, evaluate, export, verify

use std::path::PathBuf;

use tracing::{info, warn};
use zkml_graph::{save_model, Session};

use crate::assessment::{assess, RiskAssessment};
use crate::config::RugDetectorConfig;
use crate::error::Result;
use crate::export::build_model;
use crate::metadata::{MetadataMetrics, ModelMetadata};
use crate::metrics::ClassificationMetrics;
use crate::mlp::{Mlp, TrainingHistory};
use crate::scaler::StandardScaler;
use crate::synthetic;
use crate::validation::{validate_export, ValidationReport};

/// Everything a training run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model_path: PathBuf,
    pub model_bytes: u64,
    pub metadata_path: PathBuf,
    pub train_metrics: ClassificationMetrics,
    pub test_metrics: ClassificationMetrics,
    pub history: TrainingHistory,
    pub validation: ValidationReport,
    /// Graph assessment of the first held-out sample and its true label
    pub example: (RiskAssessment, u8),
    /// Graph assessments of the safe-end and rug-end tokens
    pub boundary: (RiskAssessment, RiskAssessment),
    pub metadata: ModelMetadata,
    pub scaler: StandardScaler,
    pub mlp: Mlp,
}

pub struct TrainingPipeline {
    config: RugDetectorConfig,
}

impl TrainingPipeline {
    pub fn new(config: RugDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RugDetectorConfig {
        &self.config
    }

    pub fn run(&self) -> Result<TrainingOutcome> {
        let training = &self.config.training;
        info!(
            samples = training.samples,
            seed = training.seed,
            output = %self.config.output.dir.display(),
            "Starting rug detector training run"
        );

        let data = synthetic::generate(training.samples, training.seed)?;
        let (train, test) = data.stratified_split(training.test_fraction, training.seed)?;
        info!(train = train.len(), test = test.len(), "Data split");

        let scaler = StandardScaler::fit(train.features())?;
        let train_scaled = scaler.transform(train.features())?;
        let test_scaled = scaler.transform(test.features())?;

        let (mlp, history) = Mlp::train(&train_scaled, train.labels(), &training.classifier)?;

        let train_metrics = ClassificationMetrics::compute(
            &train.labels().to_vec(),
            &mlp.predict(&train_scaled).to_vec(),
        )?;
        let test_metrics = ClassificationMetrics::compute(
            &test.labels().to_vec(),
            &mlp.predict(&test_scaled).to_vec(),
        )?;
        info!(
            train_accuracy = train_metrics.accuracy,
            test_accuracy = test_metrics.accuracy,
            precision = test_metrics.precision,
            recall = test_metrics.recall,
            f1 = test_metrics.f1,
            epochs = history.epochs(),
            "Model performance"
        );

        let model = build_model(&scaler, &mlp)?;
        let model_path = self.config.model_path();
        let model_bytes = save_model(&model_path, &model)?;
        info!(
            path = %model_path.display(),
            size_kb = %format!("{:.1}", model_bytes as f64 / 1024.0),
            "Graph saved"
        );

        let session = Session::load(&model_path)?;
        let validation = validate_export(&session, &scaler, &mlp, &test, &self.config.validation)?;

        let example = (assess(&session, &test.row(0)?)?, test.labels()[0]);
        info!(
            prediction = example.0.prediction,
            verdict = example.0.verdict(),
            risk_score = example.0.risk_score,
            risk_level = %example.0.risk_level,
            actual = example.1,
            "Example inference"
        );

        let boundary = (
            assess(&session, &synthetic::safe_extreme())?,
            assess(&session, &synthetic::rug_extreme())?,
        );
        if boundary.0.is_rug_pull() || !boundary.1.is_rug_pull() {
            warn!(
                safe_end = boundary.0.prediction,
                rug_end = boundary.1.prediction,
                "Graph misclassifies a class extreme"
            );
        }

        let metadata = ModelMetadata::new(
            self.config.output.model_file.as_str(),
            MetadataMetrics {
                test_accuracy: test_metrics.accuracy,
                train_accuracy: train_metrics.accuracy,
                precision: test_metrics.precision,
                recall: test_metrics.recall,
                f1: test_metrics.f1,
                train_samples: train.len(),
                test_samples: test.len(),
                export_agreement: validation.agreement,
            },
            validation.compatible(),
        );
        let metadata_path = self.config.metadata_path();
        metadata.save(&metadata_path)?;
        info!(path = %metadata_path.display(), run_id = %metadata.run_id, "Metadata saved");

        Ok(TrainingOutcome {
            model_path,
            model_bytes,
            metadata_path,
            train_metrics,
            test_metrics,
            history,
            validation,
            example,
            boundary,
            metadata,
            scaler,
            mlp,
        })
    }
}
