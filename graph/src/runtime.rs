//! Reference evaluator
//!
//! A `Session` owns a checked model and evaluates its nodes in order. It is
//! intended for verifying exported graphs against the procedural models
//! they were built from, not for production inference.

use std::collections::HashMap;
use std::path::Path;

use prost::Message;
use tracing::{debug, trace};

use crate::checker::check_model;
use crate::error::{GraphError, Result};
use crate::ops;
use crate::proto::ModelProto;
use crate::tensor::Tensor;
use crate::types::{Dim, ValueSpec};

/// A loaded, structurally valid model ready for evaluation
#[derive(Debug, Clone)]
pub struct Session {
    model: ModelProto,
    inputs: Vec<ValueSpec>,
    outputs: Vec<ValueSpec>,
    initializers: HashMap<String, Tensor>,
}

impl Session {
    /// Check a model and prepare it for evaluation
    pub fn from_model(model: ModelProto) -> Result<Self> {
        check_model(&model)?;

        let graph = model
            .graph
            .as_ref()
            .ok_or_else(|| GraphError::structure(vec!["model has no graph".to_string()]))?;

        let inputs = graph
            .input
            .iter()
            .map(ValueSpec::from_proto)
            .collect::<Result<Vec<_>>>()?;
        let outputs = graph
            .output
            .iter()
            .map(ValueSpec::from_proto)
            .collect::<Result<Vec<_>>>()?;

        let mut initializers = HashMap::new();
        for init in &graph.initializer {
            initializers.insert(init.name.clone(), Tensor::from_proto(init)?);
        }

        debug!(
            graph = graph.name,
            inputs = inputs.len(),
            outputs = outputs.len(),
            nodes = graph.node.len(),
            "Session created"
        );

        Ok(Self {
            model,
            inputs,
            outputs,
            initializers,
        })
    }

    /// Decode a serialized model and prepare it
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_model(ModelProto::decode(bytes)?)
    }

    /// Read a model file and prepare it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    pub fn model(&self) -> &ModelProto {
        &self.model
    }

    pub fn inputs(&self) -> &[ValueSpec] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueSpec] {
        &self.outputs
    }

    /// Look up a `metadata_props` value
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.model
            .metadata_props
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    /// Default-domain opset the model was exported against
    pub fn opset_version(&self) -> Option<i64> {
        self.model
            .opset_import
            .iter()
            .find(|op| op.domain.is_empty() || op.domain == "ai.onnx")
            .map(|op| op.version)
    }

    /// Evaluate the graph and return every declared output by name
    pub fn run(&self, feeds: HashMap<String, Tensor>) -> Result<HashMap<String, Tensor>> {
        for spec in &self.inputs {
            let tensor = feeds.get(&spec.name).ok_or_else(|| GraphError::MissingInput {
                name: spec.name.clone(),
            })?;
            validate_feed(spec, tensor)?;
        }

        let mut values: HashMap<String, Tensor> = self.initializers.clone();
        values.extend(feeds);

        let graph = self
            .model
            .graph
            .as_ref()
            .ok_or_else(|| GraphError::structure(vec!["model has no graph".to_string()]))?;

        for node in &graph.node {
            let outputs = {
                let args: Vec<Option<&Tensor>> = node
                    .input
                    .iter()
                    .map(|name| {
                        if name.is_empty() {
                            Ok(None)
                        } else {
                            values
                                .get(name)
                                .map(Some)
                                .ok_or_else(|| GraphError::MissingValue { name: name.clone() })
                        }
                    })
                    .collect::<Result<_>>()?;
                ops::evaluate(node, &args)?
            };

            trace!(node = node.name, op = node.op_type, "Evaluated node");

            for (name, tensor) in node.output.iter().zip(outputs) {
                values.insert(name.clone(), tensor);
            }
        }

        let mut results = HashMap::new();
        for spec in &self.outputs {
            let tensor = values
                .remove(&spec.name)
                .ok_or_else(|| GraphError::MissingValue {
                    name: spec.name.clone(),
                })?;
            if tensor.data_type() != spec.data_type {
                return Err(GraphError::TypeMismatch {
                    name: spec.name.clone(),
                    expected: spec.data_type.to_string(),
                    actual: tensor.data_type().to_string(),
                });
            }
            results.insert(spec.name.clone(), tensor);
        }

        Ok(results)
    }

    /// Run a single-input, single-output model
    pub fn run_single(&self, input: Tensor) -> Result<Tensor> {
        let input_name = self
            .inputs
            .first()
            .map(|spec| spec.name.clone())
            .ok_or_else(|| GraphError::MissingInput {
                name: "<first input>".to_string(),
            })?;
        let output_name = self
            .outputs
            .first()
            .map(|spec| spec.name.clone())
            .ok_or_else(|| GraphError::MissingValue {
                name: "<first output>".to_string(),
            })?;

        let mut feeds = HashMap::new();
        feeds.insert(input_name, input);
        let mut results = self.run(feeds)?;

        results
            .remove(&output_name)
            .ok_or(GraphError::MissingValue { name: output_name })
    }
}

fn validate_feed(spec: &ValueSpec, tensor: &Tensor) -> Result<()> {
    if tensor.data_type() != spec.data_type {
        return Err(GraphError::TypeMismatch {
            name: spec.name.clone(),
            expected: spec.data_type.to_string(),
            actual: tensor.data_type().to_string(),
        });
    }

    let shape = tensor.shape();
    if shape.len() != spec.dims.len() {
        return Err(GraphError::shape_mismatch(
            spec.name.clone(),
            format!("expected rank {}, got {:?}", spec.dims.len(), shape),
        ));
    }

    for (axis, (dim, &actual)) in spec.dims.iter().zip(shape).enumerate() {
        if let Dim::Fixed(expected) = dim {
            if *expected != actual {
                return Err(GraphError::shape_mismatch(
                    spec.name.clone(),
                    format!("axis {} expected {}, got {}", axis, expected, actual),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{attr_ints, GraphBuilder, ModelBuilder};
    use crate::types::DataType;

    fn sum_model() -> ModelProto {
        let mut graph = GraphBuilder::new("row_sum");
        graph.input("x", DataType::Float, vec![Dim::batch(), Dim::Fixed(3)]);
        graph.node(
            "ReduceSum",
            &["x"],
            &["s"],
            vec![attr_ints("axes", &[1]), crate::builder::attr_int("keepdims", 1)],
        );
        graph.output("s", DataType::Float, vec![Dim::batch(), Dim::Fixed(1)]);
        ModelBuilder::new(11)
            .metadata("kind", "row_sum")
            .build(graph.finish())
    }

    #[test]
    fn test_run_single_sums_rows() {
        let session = Session::from_model(sum_model()).unwrap();
        let input = Tensor::float(&[2, 3], vec![1.0, 2.0, 3.0, -1.0, -1.0, 0.5]).unwrap();

        let output = session.run_single(input).unwrap();
        let values: Vec<f32> = output.as_float().unwrap().iter().copied().collect();

        assert_eq!(output.shape(), &[2, 1]);
        assert_eq!(values, vec![6.0, -1.5]);
        assert_eq!(session.metadata("kind"), Some("row_sum"));
        assert_eq!(session.opset_version(), Some(11));
    }

    #[test]
    fn test_feed_validation() {
        let session = Session::from_model(sum_model()).unwrap();

        // Wrong element type
        let err = session
            .run_single(Tensor::int64(&[1, 3], vec![1, 2, 3]).unwrap())
            .unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));

        // Wrong fixed dimension
        let err = session
            .run_single(Tensor::float(&[1, 4], vec![0.0; 4]).unwrap())
            .unwrap_err();
        assert!(matches!(err, GraphError::ShapeMismatch { .. }));

        // Missing feed
        let err = session.run(HashMap::new()).unwrap_err();
        assert!(matches!(err, GraphError::MissingInput { .. }));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(Session::from_bytes(&[0xff, 0xff, 0xff]).is_err());
    }
}
