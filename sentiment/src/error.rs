//! Error types for the sentiment model builder

use thiserror::Error;

/// Result type alias for sentiment operations
pub type Result<T> = std::result::Result<T, SentimentError>;

/// Errors raised while building, exporting or checking the sentiment model
#[derive(Error, Debug)]
pub enum SentimentError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Graph error: {0}")]
    Graph(#[from] zkml_graph::GraphError),

    #[error("Token id {id} for '{word}' exceeds the maximum of {max}")]
    IdCeiling { word: String, id: u32, max: u32 },

    #[error("Token id 0 is reserved for unknown words but is assigned to '{word}'")]
    ReservedId { word: String },

    #[error("Weight {weight} for token {id} is outside the {band} range")]
    WeightOutOfBand { id: u32, weight: f32, band: String },

    #[error("Token id {id} is defined more than once with different weights or bands")]
    ConflictingId { id: u32 },

    #[error("Word '{word}' is listed more than once")]
    DuplicateWord { word: String },

    #[error("Invalid artifact {path}: {message}")]
    InvalidArtifact { path: String, message: String },
}

impl SentimentError {
    /// Create an invalid artifact error
    pub fn invalid_artifact<S: Into<String>>(path: S, message: S) -> Self {
        Self::InvalidArtifact {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Error category, following the pipeline error taxonomy
    pub fn category(&self) -> &'static str {
        match self {
            SentimentError::Config(_) => "configuration",
            SentimentError::Io(_) => "io",
            SentimentError::Serialization(_) => "serialization",
            SentimentError::Graph(e) if e.is_construction_bug() => "invariant",
            SentimentError::Graph(_) => "graph",
            SentimentError::IdCeiling { .. }
            | SentimentError::ReservedId { .. }
            | SentimentError::WeightOutOfBand { .. }
            | SentimentError::ConflictingId { .. }
            | SentimentError::DuplicateWord { .. } => "invariant",
            SentimentError::InvalidArtifact { .. } => "artifact",
        }
    }

    /// Every sentiment error aborts the build; there is nothing to fall back to
    pub fn is_fatal(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = SentimentError::IdCeiling {
            word: "x".to_string(),
            id: 61,
            max: 60,
        };
        assert_eq!(err.category(), "invariant");
        assert!(err.to_string().contains("61"));

        let err = SentimentError::invalid_artifact("vocab.json", "empty");
        assert_eq!(err.category(), "artifact");
    }
}
