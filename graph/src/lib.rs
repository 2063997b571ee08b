//! # zkML Graph
//!
//! Portable tensor-graph support shared by the model builders. Models are
//! written in the ONNX protobuf format so they can be consumed by restricted
//! proving runtimes, and are checked and re-evaluated locally before they
//! are published.
//!
//! ## Pieces:
//! 1. **proto**: the subset of the ONNX message set the builders emit
//! 2. **builder**: ergonomic graph/model construction
//! 3. **checker**: structural validation of a loaded model
//! 4. **runtime**: a small reference evaluator for the supported operators
//! 5. **compat**: per-sample tensor size limits of external consumers
//! 6. **logging**: subscriber setup for the builder binaries

pub mod artifact;
pub mod builder;
pub mod checker;
pub mod compat;
pub mod error;
pub mod logging;
pub mod ops;
pub mod proto;
pub mod runtime;
pub mod tensor;
pub mod types;

pub use artifact::{load_model, save_model, write_json};
pub use builder::{attr_float, attr_int, attr_ints, GraphBuilder, ModelBuilder};
pub use checker::check_model;
pub use compat::{CompatibilityReport, TensorSizeCheck, DEFAULT_MAX_TENSOR_SIZE};
pub use error::{GraphError, Result};
pub use proto::ModelProto;
pub use runtime::Session;
pub use tensor::Tensor;
pub use types::{DataType, Dim, ValueSpec};

/// Version of the graph library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ONNX IR version written into every model (IR 7 covers opsets up to 12)
pub const IR_VERSION: i64 = 7;

/// Name written into `producer_name`
pub const PRODUCER_NAME: &str = "zkml-graph";
