//! Risk assessment from a predicted label

use std::fmt;

use serde::{Deserialize, Serialize};
use zkml_graph::Session;

use crate::error::Result;
use crate::features::FeatureVector;
use crate::validation::predict_one;

/// Risk score reported for a predicted rug pull
pub const RUG_RISK_SCORE: u8 = 90;

/// Risk score reported for a predicted safe token
pub const SAFE_RISK_SCORE: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// HIGH from 70, MEDIUM from 30, LOW below
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            RiskLevel::High
        } else if score >= 30 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub prediction: u8,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
}

impl RiskAssessment {
    pub fn from_prediction(prediction: u8) -> Self {
        let risk_score = if prediction == 1 {
            RUG_RISK_SCORE
        } else {
            SAFE_RISK_SCORE
        };
        Self {
            prediction,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
        }
    }

    pub fn is_rug_pull(&self) -> bool {
        self.prediction == 1
    }

    pub fn verdict(&self) -> &'static str {
        if self.is_rug_pull() {
            "RUG PULL"
        } else {
            "SAFE"
        }
    }
}

/// Score one feature vector with an exported graph
pub fn assess(session: &Session, features: &FeatureVector) -> Result<RiskAssessment> {
    let prediction = predict_one(session, features)?;
    Ok(RiskAssessment::from_prediction(prediction))
}
