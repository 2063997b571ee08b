//! # zkML Rug Detector
//!
//! Two batch pipelines around a 60-feature description of an ERC20 token:
//!
//! 1. **Extraction**: query a node for a token contract and build the
//!    feature vector. Only a handful of features are read from chain; the
//!    rest are documented placeholders.
//! 2. **Training**: synthesize labelled samples, fit a standardizer and a
//!    small ReLU network, and export their composition as one graph taking
//!    raw features and returning a class label. The export is reloaded and
//!    checked for agreement and tensor-size compatibility.
//!
//! ## Feature layout
//! Four contiguous bands of 15: contract, liquidity, holder, trading. See
//! [`features`] for the index → meaning mapping.

pub mod assessment;
pub mod chain;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod extractor;
pub mod features;
pub mod metadata;
pub mod metrics;
pub mod mlp;
pub mod pipeline;
pub mod scaler;
pub mod synthetic;
pub mod validation;

pub use assessment::{assess, RiskAssessment, RiskLevel};
pub use chain::{ChainReader, RpcChainReader};
pub use config::RugDetectorConfig;
pub use dataset::Dataset;
pub use error::{Result, RugDetectorError};
pub use extractor::{ExtractedFeatures, Extraction, FeatureExtractor};
pub use features::{FeatureVector, BAND_SIZE, FEATURE_COUNT};
pub use metadata::ModelMetadata;
pub use metrics::ClassificationMetrics;
pub use mlp::{Mlp, MlpConfig};
pub use pipeline::{TrainingOutcome, TrainingPipeline};
pub use scaler::StandardScaler;
pub use validation::ValidationReport;

/// Version of the rug detector
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
