//! Labelled feature matrices and the stratified train/test split

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::error::{Result, RugDetectorError};
use crate::features::{FeatureVector, FEATURE_COUNT};

/// Rows of 60 features with a 0 (safe) / 1 (rug pull) label each
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f64>,
    labels: Array1<u8>,
}

impl Dataset {
    pub fn new(features: Array2<f64>, labels: Array1<u8>) -> Result<Self> {
        if features.ncols() != FEATURE_COUNT {
            return Err(RugDetectorError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: features.ncols(),
            });
        }
        if features.nrows() != labels.len() {
            return Err(RugDetectorError::dataset(format!(
                "{} rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        if labels.iter().any(|&label| label > 1) {
            return Err(RugDetectorError::dataset("labels must be 0 or 1"));
        }
        Ok(Self { features, labels })
    }

    pub fn from_records(records: &[(FeatureVector, u8)]) -> Result<Self> {
        let mut flat = Vec::with_capacity(records.len() * FEATURE_COUNT);
        for (features, _) in records {
            flat.extend(features.to_vec());
        }
        let features = Array2::from_shape_vec((records.len(), FEATURE_COUNT), flat)
            .map_err(|e| RugDetectorError::dataset(e.to_string()))?;
        let labels = records.iter().map(|(_, label)| *label).collect();
        Self::new(features, labels)
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<u8> {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(safe, rug)` row counts
    pub fn class_counts(&self) -> (usize, usize) {
        let rug = self.labels.iter().filter(|&&label| label == 1).count();
        (self.len() - rug, rug)
    }

    pub fn row(&self, index: usize) -> Result<FeatureVector> {
        if index >= self.len() {
            return Err(RugDetectorError::dataset(format!(
                "row {} out of range for {} rows",
                index,
                self.len()
            )));
        }
        let row: Vec<f64> = self.features.row(index).to_vec();
        FeatureVector::from_slice(&row)
    }

    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// Split into `(train, test)` keeping the class ratio in both parts
    ///
    /// Each class contributes `round(count * test_fraction)` rows to the test
    /// split, clamped so both parts keep at least one row of every class.
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(RugDetectorError::dataset(format!(
                "test fraction must be within (0, 1), got {}",
                test_fraction
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut train = Vec::with_capacity(self.len());
        let mut test = Vec::new();

        for class in [0u8, 1] {
            let mut members: Vec<usize> = self
                .labels
                .iter()
                .enumerate()
                .filter(|(_, &label)| label == class)
                .map(|(index, _)| index)
                .collect();

            if members.len() < 2 {
                return Err(RugDetectorError::dataset(format!(
                    "class {} has {} rows; at least 2 are needed to stratify",
                    class,
                    members.len()
                )));
            }

            members.shuffle(&mut rng);
            let held_out = ((members.len() as f64 * test_fraction).round() as usize)
                .clamp(1, members.len() - 1);

            test.extend_from_slice(&members[..held_out]);
            train.extend_from_slice(&members[held_out..]);
        }

        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        info!(train = train.len(), test = test.len(), "Stratified split");
        Ok((self.select(&train), self.select(&test)))
    }
}
