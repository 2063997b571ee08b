//! Post-export checks on the reloaded graph
//!
//! Both checks are reported, never raised: a run with a disagreeing or
//! oversized graph still finishes and records the outcome.

use ndarray::Array2;
use serde::Serialize;
use tracing::{info, warn};
use zkml_graph::{CompatibilityReport, Session, Tensor};

use crate::config::ValidationConfig;
use crate::dataset::Dataset;
use crate::error::{Result, RugDetectorError};
use crate::features::{FeatureVector, FEATURE_COUNT};
use crate::metrics::agreement;
use crate::mlp::Mlp;
use crate::scaler::StandardScaler;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub samples: usize,
    /// Share of rows where graph and in-memory classifier agree
    pub agreement: f64,
    pub min_agreement: f64,
    /// Graph accuracy against the true labels
    pub graph_accuracy: f64,
    pub compatibility: CompatibilityReport,
}

impl ValidationReport {
    pub fn agreement_passed(&self) -> bool {
        self.agreement >= self.min_agreement
    }

    pub fn compatible(&self) -> bool {
        self.compatibility.compatible
    }

    pub fn passed(&self) -> bool {
        self.agreement_passed() && self.compatible()
    }
}

/// Run raw feature rows through the graph and return its labels
pub fn graph_predictions(session: &Session, features: &Array2<f64>) -> Result<Vec<u8>> {
    if features.ncols() != FEATURE_COUNT {
        return Err(RugDetectorError::FeatureCount {
            expected: FEATURE_COUNT,
            actual: features.ncols(),
        });
    }

    let feed = Tensor::float(
        &[features.nrows(), FEATURE_COUNT],
        features.iter().map(|&v| v as f32).collect(),
    )?;
    let output = session.run_single(feed)?;
    let labels = output.as_int64()?;

    labels
        .iter()
        .map(|&label| {
            u8::try_from(label)
                .ok()
                .filter(|l| *l <= 1)
                .ok_or_else(|| {
                    RugDetectorError::training(format!("graph emitted label {}", label))
                })
        })
        .collect()
}

/// Label for a single feature vector
pub fn predict_one(session: &Session, features: &FeatureVector) -> Result<u8> {
    let row = Array2::from_shape_vec((1, FEATURE_COUNT), features.to_vec())
        .map_err(|e| RugDetectorError::dataset(e.to_string()))?;
    graph_predictions(session, &row)?
        .first()
        .copied()
        .ok_or_else(|| RugDetectorError::training("graph returned no label"))
}

/// Compare the reloaded graph with the in-memory pipeline on `test`
pub fn validate_export(
    session: &Session,
    scaler: &StandardScaler,
    mlp: &Mlp,
    test: &Dataset,
    config: &ValidationConfig,
) -> Result<ValidationReport> {
    let expected = mlp.predict(&scaler.transform(test.features())?).to_vec();
    let from_graph = graph_predictions(session, test.features())?;
    let truth = test.labels().to_vec();

    let report = ValidationReport {
        samples: test.len(),
        agreement: agreement(&expected, &from_graph)?,
        min_agreement: config.min_agreement,
        graph_accuracy: agreement(&truth, &from_graph)?,
        compatibility: CompatibilityReport::for_session(session, config.max_tensor_size),
    };

    if report.agreement_passed() {
        info!(
            agreement = report.agreement,
            graph_accuracy = report.graph_accuracy,
            samples = report.samples,
            "Exported graph matches in-memory classifier"
        );
    } else {
        warn!(
            agreement = report.agreement,
            min_agreement = report.min_agreement,
            "Exported graph disagrees with in-memory classifier"
        );
    }

    for check in report
        .compatibility
        .inputs
        .iter()
        .chain(report.compatibility.outputs.iter())
    {
        info!(
            name = %check.name,
            shape = %check.shape,
            elements = ?check.elements,
            within_limit = check.within_limit,
            "Tensor size check"
        );
    }
    if report.compatible() {
        info!(max_tensor_size = config.max_tensor_size, "Graph is within the tensor size limit");
    } else {
        let violations: Vec<&str> = report
            .compatibility
            .violations()
            .map(|check| check.name.as_str())
            .collect();
        warn!(
            max_tensor_size = config.max_tensor_size,
            ?violations,
            "Graph exceeds the tensor size limit"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::build_model;
    use crate::mlp::MlpConfig;
    use crate::synthetic;

    #[test]
    fn test_small_run_validates() {
        let data = synthetic::generate(200, 42).unwrap();
        let (train, test) = data.stratified_split(0.2, 42).unwrap();
        let scaler = StandardScaler::fit(train.features()).unwrap();
        let config = MlpConfig {
            max_epochs: 40,
            ..MlpConfig::default()
        };
        let scaled = scaler.transform(train.features()).unwrap();
        let (mlp, _) = Mlp::train(&scaled, train.labels(), &config).unwrap();

        let session = Session::from_model(build_model(&scaler, &mlp).unwrap()).unwrap();
        let limits = ValidationConfig::default();
        let report = validate_export(&session, &scaler, &mlp, &test, &limits).unwrap();

        assert_eq!(report.samples, 40);
        assert!(report.agreement_passed(), "agreement {}", report.agreement);
        assert!(report.compatible());
        assert_eq!(report.compatibility.inputs[0].elements, Some(60));
        assert_eq!(report.compatibility.outputs[0].elements, Some(1));
    }

    #[test]
    fn test_tight_limit_is_reported_not_raised() {
        let data = synthetic::generate(40, 1).unwrap();
        let scaler = StandardScaler::fit(data.features()).unwrap();
        let config = MlpConfig {
            hidden_layers: vec![4],
            max_epochs: 2,
            ..MlpConfig::default()
        };
        let scaled = scaler.transform(data.features()).unwrap();
        let (mlp, _) = Mlp::train(&scaled, data.labels(), &config).unwrap();
        let session = Session::from_model(build_model(&scaler, &mlp).unwrap()).unwrap();

        let limits = ValidationConfig {
            min_agreement: 0.95,
            max_tensor_size: 32,
        };
        let report = validate_export(&session, &scaler, &mlp, &data, &limits).unwrap();
        assert!(!report.compatible());
        assert!(!report.passed());
        assert_eq!(report.compatibility.violations().count(), 1);
    }
}
