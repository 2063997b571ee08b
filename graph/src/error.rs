//! Error types for graph construction and evaluation

use thiserror::Error;

/// Result type alias for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised while building, checking, loading or running a graph
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model failed structural check: {}", problems.join("; "))]
    Structure { problems: Vec<String> },

    #[error("Unsupported operator: {op_type}")]
    UnsupportedOperator { op_type: String },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(i32),

    #[error("Missing graph input: {name}")]
    MissingInput { name: String },

    #[error("Value not computed: {name}")]
    MissingValue { name: String },

    #[error("Type mismatch for {name}: expected {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Shape mismatch for {name}: {message}")]
    ShapeMismatch { name: String, message: String },

    #[error("Invalid tensor {name}: {message}")]
    InvalidTensor { name: String, message: String },

    #[error("Evaluation failed at node {node} ({op_type}): {message}")]
    Evaluation {
        node: String,
        op_type: String,
        message: String,
    },
}

impl GraphError {
    /// Create a structural check error from a list of problems
    pub fn structure(problems: Vec<String>) -> Self {
        Self::Structure { problems }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch<S: Into<String>>(name: S, message: S) -> Self {
        Self::ShapeMismatch {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid tensor error
    pub fn invalid_tensor<S: Into<String>>(name: S, message: S) -> Self {
        Self::InvalidTensor {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an evaluation error for a node
    pub fn evaluation<S: Into<String>>(node: S, op_type: S, message: S) -> Self {
        Self::Evaluation {
            node: node.into(),
            op_type: op_type.into(),
            message: message.into(),
        }
    }

    /// Whether the error means the graph itself is malformed, as opposed to
    /// an environmental failure (I/O) or bad caller input
    pub fn is_construction_bug(&self) -> bool {
        matches!(
            self,
            GraphError::Structure { .. }
                | GraphError::UnsupportedOperator { .. }
                | GraphError::UnsupportedDataType(_)
                | GraphError::InvalidTensor { .. }
        )
    }
}
