//! Binary classification metrics with the rug-pull class as positive

use serde::{Deserialize, Serialize};

use crate::error::{Result, RugDetectorError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub samples: usize,
}

impl ClassificationMetrics {
    /// Compare predictions against truth; undefined ratios are reported as 0
    pub fn compute(truth: &[u8], predicted: &[u8]) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(RugDetectorError::dataset(format!(
                "{} labels but {} predictions",
                truth.len(),
                predicted.len()
            )));
        }

        let (mut tp, mut fp, mut fn_, mut correct) = (0usize, 0usize, 0usize, 0usize);
        for (&t, &p) in truth.iter().zip(predicted) {
            if t == p {
                correct += 1;
            }
            match (t, p) {
                (1, 1) => tp += 1,
                (0, 1) => fp += 1,
                (1, 0) => fn_ += 1,
                _ => {}
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Ok(Self {
            accuracy: ratio(correct, truth.len()),
            precision,
            recall,
            f1,
            samples: truth.len(),
        })
    }
}

/// Share of positions where two label sequences agree
pub fn agreement(a: &[u8], b: &[u8]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(RugDetectorError::dataset(format!(
            "cannot compare {} labels with {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Ok(0.0);
    }
    let same = a.iter().zip(b).filter(|(x, y)| x == y).count();
    Ok(same as f64 / a.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let truth = [1, 1, 1, 0, 0, 0, 1, 0];
        let predicted = [1, 1, 0, 0, 1, 0, 1, 0];
        let m = ClassificationMetrics::compute(&truth, &predicted).unwrap();

        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.precision, 0.75);
        assert_eq!(m.recall, 0.75);
        assert!((m.f1 - 0.75).abs() < 1e-12);
        assert_eq!(m.samples, 8);
    }

    #[test]
    fn test_no_positive_predictions() {
        let m = ClassificationMetrics::compute(&[1, 0], &[0, 0]).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
        assert_eq!(m.accuracy, 0.5);
    }

    #[test]
    fn test_agreement() {
        assert_eq!(agreement(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap(), 0.75);
        assert!(agreement(&[0], &[0, 1]).is_err());
        assert!(ClassificationMetrics::compute(&[0], &[]).is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn metrics_stay_in_unit_range(
                pairs in proptest::collection::vec((0u8..2, 0u8..2), 1..200)
            ) {
                let (truth, predicted): (Vec<u8>, Vec<u8>) = pairs.into_iter().unzip();
                let m = ClassificationMetrics::compute(&truth, &predicted).unwrap();
                for value in [m.accuracy, m.precision, m.recall, m.f1] {
                    prop_assert!((0.0..=1.0).contains(&value));
                }
                prop_assert_eq!(agreement(&truth, &predicted).unwrap(), m.accuracy);
            }
        }
    }
}
