//! Error types for the rug detector

use thiserror::Error;

/// Result type alias for rug detector operations
pub type Result<T> = std::result::Result<T, RugDetectorError>;

/// Errors raised by extraction, training and export
#[derive(Error, Debug)]
pub enum RugDetectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ethereum client error: {0}")]
    Ethereum(#[from] ethers::providers::ProviderError),

    #[error("Graph error: {0}")]
    Graph(#[from] zkml_graph::GraphError),

    #[error("Cannot reach RPC endpoint {endpoint}: {message}")]
    Connectivity { endpoint: String, message: String },

    #[error("Invalid token address: {0}")]
    InvalidAddress(String),

    #[error("Contract call {function} failed: {message}")]
    ContractCall { function: String, message: String },

    #[error("Feature vector must hold {expected} values, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Dataset error: {message}")]
    Dataset { message: String },

    #[error("Training error: {message}")]
    Training { message: String },
}

impl RugDetectorError {
    /// Create a connectivity error
    pub fn connectivity<S: Into<String>>(endpoint: S, message: S) -> Self {
        Self::Connectivity {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a contract call error
    pub fn contract_call<S: Into<String>>(function: S, message: S) -> Self {
        Self::ContractCall {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        Self::Dataset {
            message: message.into(),
        }
    }

    /// Create a training error
    pub fn training<S: Into<String>>(message: S) -> Self {
        Self::Training {
            message: message.into(),
        }
    }

    /// Create a configuration error from a message
    pub fn config_message<S: Into<String>>(message: S) -> Self {
        Self::Config(config::ConfigError::Message(message.into()))
    }

    /// Error category, following the pipeline error taxonomy
    pub fn category(&self) -> &'static str {
        match self {
            RugDetectorError::Config(_) => "configuration",
            RugDetectorError::InvalidAddress(_) => "configuration",
            RugDetectorError::Connectivity { .. } => "connectivity",
            RugDetectorError::Ethereum(_) => "feature_query",
            RugDetectorError::ContractCall { .. } => "feature_query",
            RugDetectorError::FeatureCount { .. } => "invariant",
            RugDetectorError::Dataset { .. } => "invariant",
            RugDetectorError::Training { .. } => "invariant",
            RugDetectorError::Graph(e) if e.is_construction_bug() => "invariant",
            RugDetectorError::Graph(_) => "graph",
            RugDetectorError::Io(_) => "io",
            RugDetectorError::Serialization(_) => "serialization",
        }
    }

    /// Per-feature query failures are recovered with a default value;
    /// everything else aborts the run
    pub fn is_fatal(&self) -> bool {
        self.category() != "feature_query"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_taxonomy() {
        let err = RugDetectorError::contract_call("totalSupply", "execution reverted");
        assert_eq!(err.category(), "feature_query");
        assert!(!err.is_fatal());

        let err = RugDetectorError::connectivity("http://localhost:1", "connection refused");
        assert_eq!(err.category(), "connectivity");
        assert!(err.is_fatal());

        let err = RugDetectorError::FeatureCount {
            expected: 60,
            actual: 59,
        };
        assert_eq!(err.category(), "invariant");
        assert!(err.to_string().contains("59"));
    }
}
