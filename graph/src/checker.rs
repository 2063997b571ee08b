//! Structural model validation
//!
//! Every problem found is collected so a broken export is reported in one
//! pass rather than one error at a time.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{GraphError, Result};
use crate::ops;
use crate::proto::ModelProto;
use crate::tensor::Tensor;
use crate::types::ValueSpec;

/// Check that a model is well formed and evaluable by the reference runtime
pub fn check_model(model: &ModelProto) -> Result<()> {
    let mut problems = Vec::new();

    if model.ir_version <= 0 {
        problems.push("ir_version is not set".to_string());
    }

    let has_default_opset = model
        .opset_import
        .iter()
        .any(|op| (op.domain.is_empty() || op.domain == "ai.onnx") && op.version > 0);
    if !has_default_opset {
        problems.push("no opset imported for the default domain".to_string());
    }

    let graph = match &model.graph {
        Some(graph) => graph,
        None => {
            problems.push("model has no graph".to_string());
            return Err(GraphError::structure(problems));
        }
    };

    if graph.input.is_empty() {
        problems.push("graph declares no inputs".to_string());
    }
    if graph.output.is_empty() {
        problems.push("graph declares no outputs".to_string());
    }

    let mut defined: HashSet<&str> = HashSet::new();

    for info in &graph.input {
        if let Err(e) = ValueSpec::from_proto(info) {
            problems.push(format!("input {}: {}", info.name, e));
        }
        if !defined.insert(info.name.as_str()) {
            problems.push(format!("duplicate value name {}", info.name));
        }
    }

    for init in &graph.initializer {
        if let Err(e) = Tensor::from_proto(init) {
            problems.push(format!("initializer {}: {}", init.name, e));
        }
        if !defined.insert(init.name.as_str()) {
            problems.push(format!("duplicate value name {}", init.name));
        }
    }

    for node in &graph.node {
        if !node.domain.is_empty() && node.domain != "ai.onnx" {
            problems.push(format!("node {} uses custom domain {}", node.name, node.domain));
        }
        if !ops::is_supported(&node.op_type) {
            problems.push(format!("node {} uses unsupported operator {}", node.name, node.op_type));
        }

        for input in node.input.iter().filter(|name| !name.is_empty()) {
            if !defined.contains(input.as_str()) {
                problems.push(format!(
                    "node {} consumes {} before it is defined",
                    node.name, input
                ));
            }
        }

        if node.output.is_empty() {
            problems.push(format!("node {} produces no outputs", node.name));
        }
        for output in &node.output {
            if !defined.insert(output.as_str()) {
                problems.push(format!("value {} is assigned more than once", output));
            }
        }
    }

    for info in &graph.output {
        if let Err(e) = ValueSpec::from_proto(info) {
            problems.push(format!("output {}: {}", info.name, e));
        }
        if !defined.contains(info.name.as_str()) {
            problems.push(format!("output {} is never produced", info.name));
        }
    }

    if problems.is_empty() {
        debug!(
            graph = graph.name,
            nodes = graph.node.len(),
            initializers = graph.initializer.len(),
            "Model passed structural check"
        );
        Ok(())
    } else {
        Err(GraphError::structure(problems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GraphBuilder, ModelBuilder};
    use crate::types::{DataType, Dim};

    fn relu_model() -> ModelProto {
        let mut graph = GraphBuilder::new("relu");
        graph.input("x", DataType::Float, vec![Dim::batch(), Dim::Fixed(3)]);
        graph.node("Relu", &["x"], &["y"], vec![]);
        graph.output("y", DataType::Float, vec![Dim::batch(), Dim::Fixed(3)]);
        ModelBuilder::new(12).build(graph.finish())
    }

    #[test]
    fn test_valid_model_passes() {
        check_model(&relu_model()).unwrap();
    }

    #[test]
    fn test_collects_every_problem() {
        let mut model = relu_model();
        model.opset_import.clear();
        if let Some(graph) = model.graph.as_mut() {
            graph.node[0].input = vec!["missing".to_string()];
            graph.node[0].op_type = "Softmax".to_string();
        }

        match check_model(&model) {
            Err(GraphError::Structure { problems }) => {
                assert!(problems.iter().any(|p| p.contains("opset")));
                assert!(problems.iter().any(|p| p.contains("unsupported operator Softmax")));
                assert!(problems.iter().any(|p| p.contains("missing before it is defined")));
            }
            other => panic!("expected structure error, got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_output_is_reported() {
        let mut model = relu_model();
        if let Some(graph) = model.graph.as_mut() {
            graph.node.clear();
        }
        let err = check_model(&model).unwrap_err();
        assert!(err.to_string().contains("never produced"));
    }
}
