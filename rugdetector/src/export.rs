//! Export of the standardizer and classifier as one graph
//!
//! `input [batch, 60] float` → Sub(mean) → Div(scale) → (Gemm → Relu)* →
//! Gemm → Greater(0) → Cast(int64) → `label [batch, 1] int64`.
//! The graph accepts raw feature vectors; standardization happens inside.

use tracing::info;
use zkml_graph::{
    attr_int, check_model, DataType, Dim, GraphBuilder, ModelBuilder, ModelProto, Tensor,
};

use crate::error::{Result, RugDetectorError};
use crate::features::FEATURE_COUNT;
use crate::mlp::Mlp;
use crate::scaler::StandardScaler;

/// Opset the risk graph targets
pub const OPSET_VERSION: i64 = 12;

pub const INPUT_NAME: &str = "input";
pub const OUTPUT_NAME: &str = "label";

fn to_f32(values: impl IntoIterator<Item = f64>) -> Vec<f32> {
    values.into_iter().map(|v| v as f32).collect()
}

/// Build and structurally check the composed graph
pub fn build_model(scaler: &StandardScaler, mlp: &Mlp) -> Result<ModelProto> {
    for actual in [scaler.mean().len(), mlp.input_size()] {
        if actual != FEATURE_COUNT {
            return Err(RugDetectorError::FeatureCount {
                expected: FEATURE_COUNT,
                actual,
            });
        }
    }

    let mut graph = GraphBuilder::new("rugdetector")
        .doc_string("StandardScaler -> MLP (ReLU) -> threshold rug pull classifier");

    let input = graph.input(
        INPUT_NAME,
        DataType::Float,
        vec![Dim::batch(), Dim::Fixed(FEATURE_COUNT)],
    );

    let mean = graph.initializer(
        "scaler_mean",
        Tensor::float(&[FEATURE_COUNT], to_f32(scaler.mean().iter().copied()))?,
    );
    let scale = graph.initializer(
        "scaler_scale",
        Tensor::float(&[FEATURE_COUNT], to_f32(scaler.scale().iter().copied()))?,
    );
    graph.node("Sub", &[input.as_str(), mean.as_str()], &["centered"], vec![]);
    graph.node("Div", &["centered", scale.as_str()], &["standardized"], vec![]);

    let mut current = "standardized".to_string();
    let last = mlp.layers().len() - 1;
    for (i, layer) in mlp.layers().iter().enumerate() {
        let weights = graph.initializer(
            &format!("coefficient_{}", i),
            Tensor::float(
                &[layer.fan_in(), layer.fan_out()],
                to_f32(layer.weights.iter().copied()),
            )?,
        );
        let bias = graph.initializer(
            &format!("intercept_{}", i),
            Tensor::float(&[layer.fan_out()], to_f32(layer.bias.iter().copied()))?,
        );

        let affine = format!("affine_{}", i);
        graph.node(
            "Gemm",
            &[current.as_str(), weights.as_str(), bias.as_str()],
            &[affine.as_str()],
            vec![],
        );

        current = if i < last {
            let activated = format!("hidden_{}", i);
            graph.node("Relu", &[affine.as_str()], &[activated.as_str()], vec![]);
            activated
        } else {
            affine
        };
    }

    let zero = graph.initializer("threshold", Tensor::scalar_f32(0.0));
    graph.node("Greater", &[current.as_str(), zero.as_str()], &["is_rug"], vec![]);
    graph.node(
        "Cast",
        &["is_rug"],
        &[OUTPUT_NAME],
        vec![attr_int("to", DataType::Int64.code() as i64)],
    );
    graph.output(OUTPUT_NAME, DataType::Int64, vec![Dim::batch(), Dim::Fixed(1)]);

    let layer_sizes = mlp
        .layer_sizes()
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join("-");

    let model = ModelBuilder::new(OPSET_VERSION)
        .model_version(1)
        .doc_string("Rug pull detector: label 1 when the token looks like a rug pull")
        .metadata("input_features", FEATURE_COUNT.to_string())
        .metadata("layer_sizes", layer_sizes.as_str())
        .build(graph.finish());

    check_model(&model)?;
    info!(layers = %layer_sizes, opset = OPSET_VERSION, "Built rug detector graph");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::DenseLayer;
    use ndarray::{Array1, Array2};
    use zkml_graph::Session;

    fn fixed_model() -> (StandardScaler, Mlp) {
        let mut x = Array2::zeros((2, FEATURE_COUNT));
        x[[0, 0]] = 0.0;
        x[[1, 0]] = 10.0;
        let scaler = StandardScaler::fit(&x).unwrap();

        // Hidden unit copies standardized feature 0; output is that minus 0.5
        let mut w0 = Array2::zeros((FEATURE_COUNT, 2));
        w0[[0, 0]] = 1.0;
        let hidden = DenseLayer {
            weights: w0,
            bias: Array1::zeros(2),
        };
        let mut w1 = Array2::zeros((2, 1));
        w1[[0, 0]] = 1.0;
        let output = DenseLayer {
            weights: w1,
            bias: Array1::from(vec![-0.5]),
        };

        (scaler, Mlp::from_layers(vec![hidden, output]).unwrap())
    }

    #[test]
    fn test_graph_matches_composed_functions() {
        let (scaler, mlp) = fixed_model();
        let model = build_model(&scaler, &mlp).unwrap();
        let session = Session::from_model(model).unwrap();

        let raw = [0.0, 5.0, 8.0, 20.0];
        let mut x = Array2::zeros((raw.len(), FEATURE_COUNT));
        for (i, v) in raw.iter().enumerate() {
            x[[i, 0]] = *v;
        }

        let expected = mlp.predict(&scaler.transform(&x).unwrap());
        let feed = Tensor::float(
            &[raw.len(), FEATURE_COUNT],
            x.iter().map(|&v| v as f32).collect(),
        )
        .unwrap();
        let output = session.run_single(feed).unwrap();
        let labels = output.as_int64().unwrap();

        assert_eq!(labels.shape(), &[4, 1]);
        let labels: Vec<u8> = labels.iter().map(|&v| v as u8).collect();
        assert_eq!(labels, expected.to_vec());
        // mean 5, std 5: only raw 8 and 20 clear the 0.5 threshold
        assert_eq!(labels, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_width_mismatch_names_the_wrong_part() {
        let (_, mlp) = fixed_model();
        let narrow = StandardScaler::fit(&Array2::zeros((2, FEATURE_COUNT - 1))).unwrap();
        match build_model(&narrow, &mlp) {
            Err(RugDetectorError::FeatureCount { expected, actual }) => {
                assert_eq!(expected, FEATURE_COUNT);
                assert_eq!(actual, FEATURE_COUNT - 1);
            }
            other => panic!("expected a feature count error, got {:?}", other.map(|_| ())),
        }

        let (scaler, _) = fixed_model();
        let small = Mlp::from_layers(vec![DenseLayer {
            weights: Array2::zeros((3, 1)),
            bias: Array1::zeros(1),
        }])
        .unwrap();
        match build_model(&scaler, &small) {
            Err(RugDetectorError::FeatureCount { actual, .. }) => assert_eq!(actual, 3),
            other => panic!("expected a feature count error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_graph_interface() {
        let (scaler, mlp) = fixed_model();
        let session = Session::from_model(build_model(&scaler, &mlp).unwrap()).unwrap();

        assert_eq!(session.opset_version(), Some(12));
        assert_eq!(session.inputs()[0].name, "input");
        assert_eq!(session.inputs()[0].data_type, DataType::Float);
        assert_eq!(session.outputs()[0].name, "label");
        assert_eq!(session.outputs()[0].data_type, DataType::Int64);
        assert_eq!(session.metadata("layer_sizes"), Some("60-2-1"));
    }
}
