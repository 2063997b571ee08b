//! Graph and model construction
//!
//! Builders keep nodes in insertion order, which is also the evaluation
//! order, so callers must add a node only after the values it consumes.

use std::collections::BTreeMap;

use crate::proto::{
    attribute_type, AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto,
    StringStringEntryProto,
};
use crate::tensor::Tensor;
use crate::types::{DataType, Dim, ValueSpec};
use crate::{IR_VERSION, PRODUCER_NAME};

/// Incrementally assembles a `GraphProto`
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    name: String,
    doc_string: String,
    inputs: Vec<ValueSpec>,
    outputs: Vec<ValueSpec>,
    initializers: Vec<(String, Tensor)>,
    nodes: Vec<NodeProto>,
}

impl GraphBuilder {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            doc_string: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            initializers: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn doc_string<S: Into<String>>(mut self, doc: S) -> Self {
        self.doc_string = doc.into();
        self
    }

    /// Declare a graph input and return its value name
    pub fn input(&mut self, name: &str, data_type: DataType, dims: Vec<Dim>) -> String {
        self.inputs.push(ValueSpec::new(name, data_type, dims));
        name.to_string()
    }

    /// Declare a graph output; the value must be produced by some node
    pub fn output(&mut self, name: &str, data_type: DataType, dims: Vec<Dim>) {
        self.outputs.push(ValueSpec::new(name, data_type, dims));
    }

    /// Add a constant tensor and return its value name
    pub fn initializer(&mut self, name: &str, tensor: Tensor) -> String {
        self.initializers.push((name.to_string(), tensor));
        name.to_string()
    }

    /// Append a node; the node name is derived from its op type and position
    pub fn node(
        &mut self,
        op_type: &str,
        inputs: &[&str],
        outputs: &[&str],
        attributes: Vec<AttributeProto>,
    ) {
        let name = format!("{}_{}", op_type, self.nodes.len());
        self.nodes.push(NodeProto {
            input: inputs.iter().map(|s| s.to_string()).collect(),
            output: outputs.iter().map(|s| s.to_string()).collect(),
            name,
            op_type: op_type.to_string(),
            attribute: attributes,
            doc_string: String::new(),
            domain: String::new(),
        });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn finish(self) -> GraphProto {
        GraphProto {
            node: self.nodes,
            name: self.name,
            initializer: self
                .initializers
                .iter()
                .map(|(name, tensor)| tensor.to_proto(name))
                .collect(),
            doc_string: self.doc_string,
            input: self.inputs.iter().map(ValueSpec::to_proto).collect(),
            output: self.outputs.iter().map(ValueSpec::to_proto).collect(),
            value_info: Vec::new(),
        }
    }
}

/// Wraps a finished graph into a versioned `ModelProto`
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    opset_version: i64,
    producer_version: String,
    model_version: i64,
    doc_string: String,
    metadata: BTreeMap<String, String>,
}

impl ModelBuilder {
    pub fn new(opset_version: i64) -> Self {
        Self {
            opset_version,
            producer_version: crate::VERSION.to_string(),
            model_version: 1,
            doc_string: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn model_version(mut self, version: i64) -> Self {
        self.model_version = version;
        self
    }

    pub fn doc_string<S: Into<String>>(mut self, doc: S) -> Self {
        self.doc_string = doc.into();
        self
    }

    /// Attach a `metadata_props` entry
    pub fn metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self, graph: GraphProto) -> ModelProto {
        ModelProto {
            ir_version: IR_VERSION,
            producer_name: PRODUCER_NAME.to_string(),
            producer_version: self.producer_version,
            domain: String::new(),
            model_version: self.model_version,
            doc_string: self.doc_string,
            graph: Some(graph),
            opset_import: vec![OperatorSetIdProto {
                domain: String::new(),
                version: self.opset_version,
            }],
            metadata_props: self
                .metadata
                .into_iter()
                .map(|(key, value)| StringStringEntryProto { key, value })
                .collect(),
        }
    }
}

/// Integer attribute
pub fn attr_int(name: &str, value: i64) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        i: Some(value),
        r#type: attribute_type::INT,
        ..Default::default()
    }
}

/// Integer list attribute
pub fn attr_ints(name: &str, values: &[i64]) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        ints: values.to_vec(),
        r#type: attribute_type::INTS,
        ..Default::default()
    }
}

/// Float attribute
pub fn attr_float(name: &str, value: f32) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        f: Some(value),
        r#type: attribute_type::FLOAT,
        ..Default::default()
    }
}
