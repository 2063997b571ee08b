//! End-to-end: build the vocabulary, export, reload and classify

use zkml_graph::{Session, Tensor};
use zkml_sentiment::{
    export_artifacts, run_self_check, SentimentClassifier, SentimentConfig, SentimentLabel,
    Vocabulary, SEQUENCE_LENGTH,
};

fn exported(dir: &std::path::Path) -> (SentimentConfig, Session) {
    let config = SentimentConfig {
        output_dir: dir.to_path_buf(),
        ..SentimentConfig::default()
    };
    let summary = export_artifacts(&Vocabulary::builtin().unwrap(), &config).unwrap();
    let session = Session::load(&summary.model_path).unwrap();
    (config, session)
}

fn graph_label(session: &Session, classifier: &SentimentClassifier, text: &str) -> bool {
    let tokens = classifier.tokenizer().encode(text).into_vec();
    let output = session
        .run_single(Tensor::int64(&[1, SEQUENCE_LENGTH], tokens).unwrap())
        .unwrap();
    output.as_bool().unwrap().iter().copied().next().unwrap()
}

#[test]
fn test_positive_headline_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (_, session) = exported(dir.path());
    let classifier = SentimentClassifier::new(Vocabulary::builtin().unwrap());

    let text = "Bitcoin surges to new high";
    let tokens = classifier.tokenizer().encode(text);
    assert_eq!(&tokens.as_slice()[..5], &[0, 2, 0, 0, 19]);
    assert!(tokens.as_slice()[5..].iter().all(|&id| id == 0));

    let result = classifier.classify(text);
    assert!((result.score - 4.6).abs() < 1e-4);
    assert_eq!(result.label, SentimentLabel::Good);
    assert!(graph_label(&session, &classifier, text));
}

#[test]
fn test_negative_headline_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (_, session) = exported(dir.path());
    let classifier = SentimentClassifier::new(Vocabulary::builtin().unwrap());

    let text = "HBAR Drops 5.4% as Key Support Crumbles";
    let tokens = classifier.tokenizer().encode(text);
    assert_eq!(&tokens.as_slice()[..7], &[0, 49, 0, 0, 0, 0, 58]);

    let result = classifier.classify(text);
    assert!((result.score + 3.8).abs() < 1e-4);
    assert_eq!(result.label, SentimentLabel::Bad);
    assert!(!graph_label(&session, &classifier, text));
}

#[test]
fn test_reloaded_artifacts_agree_with_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let (config, session) = exported(dir.path());

    let reloaded = Vocabulary::load(config.vocab_path(), config.weights_path()).unwrap();
    assert_eq!(reloaded, Vocabulary::builtin().unwrap());

    let vocab_json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config.vocab_path()).unwrap()).unwrap();
    assert_eq!(vocab_json["surges"], 2);
    assert_eq!(vocab_json["fear"], 60);

    let classifier = SentimentClassifier::new(reloaded);
    let report = run_self_check(&classifier, Some(&session), 0.9).unwrap();
    assert!(report.passed());
}

#[test]
fn test_empty_and_unknown_text_is_negative_in_graph() {
    let dir = tempfile::tempdir().unwrap();
    let (_, session) = exported(dir.path());
    let classifier = SentimentClassifier::new(Vocabulary::builtin().unwrap());

    for text in ["", "zzz qqq xyz"] {
        assert_eq!(classifier.tokenizer().encode(text).known_count(), 0);
        assert!(!graph_label(&session, &classifier, text));
    }
}
