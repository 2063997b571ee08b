//! Export of the sentiment model as an embedding-sum graph
//!
//! `tokens [batch, 60] int64` → Gather over a `[61, 1]` weight table →
//! ReduceSum over the sequence axis → Greater than zero →
//! `label_bool [batch, 1] bool`.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;
use zkml_graph::{
    attr_int, attr_ints, check_model, save_model, DataType, Dim, GraphBuilder, ModelBuilder,
    ModelProto, Tensor,
};

use crate::config::SentimentConfig;
use crate::error::Result;
use crate::tokenizer::SEQUENCE_LENGTH;
use crate::vocabulary::{Vocabulary, MAX_TOKEN_ID};

/// Opset the sentiment graph targets
pub const OPSET_VERSION: i64 = 11;

pub const INPUT_NAME: &str = "tokens";
pub const OUTPUT_NAME: &str = "label_bool";

/// Build and structurally check the embedding-sum graph for `vocab`
pub fn build_model(vocab: &Vocabulary) -> Result<ModelProto> {
    let rows = (MAX_TOKEN_ID + 1) as usize;

    let mut graph = GraphBuilder::new("crypto_sentiment")
        .doc_string("Embedding -> Sum -> Threshold sentiment classifier");

    let tokens = graph.input(
        INPUT_NAME,
        DataType::Int64,
        vec![Dim::batch(), Dim::Fixed(SEQUENCE_LENGTH)],
    );
    let table = graph.initializer(
        "embeddings",
        Tensor::float(&[rows, 1], vocab.embedding_table())?,
    );
    let zero = graph.initializer("threshold", Tensor::scalar_f32(0.0));

    graph.node(
        "Gather",
        &[table.as_str(), tokens.as_str()],
        &["embedded"],
        vec![attr_int("axis", 0)],
    );
    graph.node(
        "ReduceSum",
        &["embedded"],
        &["score"],
        vec![attr_ints("axes", &[1]), attr_int("keepdims", 0)],
    );
    graph.node("Greater", &["score", zero.as_str()], &[OUTPUT_NAME], vec![]);
    graph.output(OUTPUT_NAME, DataType::Bool, vec![Dim::batch(), Dim::Fixed(1)]);

    let model = ModelBuilder::new(OPSET_VERSION)
        .doc_string("Crypto news sentiment: GOOD when the summed token weights exceed zero")
        .metadata("vocabulary_ids", vocab.unique_ids().to_string())
        .metadata("sequence_length", SEQUENCE_LENGTH.to_string())
        .build(graph.finish());

    check_model(&model)?;
    Ok(model)
}

/// Paths and sizes of the written artifacts
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub model_path: PathBuf,
    pub model_bytes: u64,
    pub vocab_path: PathBuf,
    pub weights_path: PathBuf,
    pub unique_ids: usize,
    pub max_id: u32,
    pub word_mappings: usize,
}

/// Write the graph, `vocab.json` and `weights.json` into the configured
/// output directory
pub fn export_artifacts(vocab: &Vocabulary, config: &SentimentConfig) -> Result<ExportSummary> {
    let model = build_model(vocab)?;

    let model_path = config.model_path();
    let vocab_path = config.vocab_path();
    let weights_path = config.weights_path();

    let model_bytes = save_model(&model_path, &model)?;
    vocab.save_vocab(&vocab_path)?;
    vocab.save_weights(&weights_path)?;

    let summary = ExportSummary {
        model_path,
        model_bytes,
        vocab_path,
        weights_path,
        unique_ids: vocab.unique_ids(),
        max_id: vocab.max_id(),
        word_mappings: vocab.word_count(),
    };

    info!(
        model = %summary.model_path.display(),
        bytes = summary.model_bytes,
        unique_ids = summary.unique_ids,
        max_id = summary.max_id,
        word_mappings = summary.word_mappings,
        "Sentiment model exported"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::SentimentClassifier;
    use zkml_graph::Session;

    #[test]
    fn test_graph_interface() {
        let vocab = Vocabulary::builtin().unwrap();
        let session = Session::from_model(build_model(&vocab).unwrap()).unwrap();

        assert_eq!(session.inputs()[0].name, "tokens");
        assert_eq!(session.inputs()[0].shape_string(), "[batch_size, 60]");
        assert_eq!(session.outputs()[0].name, "label_bool");
        assert_eq!(session.outputs()[0].data_type, DataType::Bool);
        assert_eq!(session.opset_version(), Some(11));
    }

    #[test]
    fn test_graph_matches_procedural_scores() {
        let vocab = Vocabulary::builtin().unwrap();
        let classifier = SentimentClassifier::new(vocab.clone());
        let session = Session::from_model(build_model(&vocab).unwrap()).unwrap();

        let headlines = [
            "Bitcoin surges to new high",
            "Exchange hacked, funds stolen",
            "",
            "up down",
            "Institutional adoption growing despite lawsuit",
        ];

        let mut ids = Vec::new();
        for headline in &headlines {
            ids.extend_from_slice(classifier.tokenizer().encode(headline).as_slice());
        }
        let batch = Tensor::int64(&[headlines.len(), SEQUENCE_LENGTH], ids).unwrap();
        let output = session.run_single(batch).unwrap();
        let labels = output.as_bool().unwrap();

        assert_eq!(labels.shape(), &[headlines.len(), 1]);
        for (headline, &graph_label) in headlines.iter().zip(labels.iter()) {
            let procedural = classifier.classify(headline).label.is_positive();
            assert_eq!(procedural, graph_label, "disagreement on {:?}", headline);
        }
    }

    #[test]
    fn test_export_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = SentimentConfig {
            output_dir: dir.path().to_path_buf(),
            ..SentimentConfig::default()
        };

        let summary = export_artifacts(&Vocabulary::builtin().unwrap(), &config).unwrap();
        assert!(summary.model_path.exists());
        assert!(summary.model_bytes > 0);
        assert_eq!(summary.unique_ids, 60);
        assert_eq!(summary.word_mappings, 75);
    }
}
