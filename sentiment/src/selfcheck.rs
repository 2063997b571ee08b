//! Headline self-check
//!
//! Classifies a fixed set of labelled headlines with the procedural scorer
//! and, when a session is supplied, with the exported graph, then reports
//! accuracy and any disagreement between the two.

use serde::Serialize;
use tracing::{info, warn};
use zkml_graph::{Session, Tensor};

use crate::error::Result;
use crate::scoring::{SentimentClassifier, SentimentLabel};
use crate::tokenizer::SEQUENCE_LENGTH;

/// Labelled headlines every exported model must get right
pub const SELF_CHECK_HEADLINES: [(&str, SentimentLabel); 6] = [
    ("Bitcoin surges to new high", SentimentLabel::Good),
    ("HBAR Drops 5.4% as Key Support Crumbles", SentimentLabel::Bad),
    (
        "Bitcoin Fear and Greed Index May Signal Prolonged Market Anxiety",
        SentimentLabel::Bad,
    ),
    ("Bitcoin Stalls Near $108K", SentimentLabel::Bad),
    ("Bitcoin ETF approval sends markets soaring", SentimentLabel::Good),
    ("Major hack steals $100M from exchange", SentimentLabel::Bad),
];

/// Outcome for a single headline
#[derive(Debug, Clone, Serialize)]
pub struct HeadlineResult {
    pub headline: String,
    pub expected: SentimentLabel,
    pub predicted: SentimentLabel,
    /// Label produced by the exported graph, if one was evaluated
    pub graph_predicted: Option<SentimentLabel>,
    pub score: f32,
    pub matched_words: Vec<String>,
}

impl HeadlineResult {
    pub fn is_correct(&self) -> bool {
        self.predicted == self.expected
    }

    pub fn graph_agrees(&self) -> bool {
        self.graph_predicted.map_or(true, |label| label == self.predicted)
    }
}

/// Aggregate self-check outcome
#[derive(Debug, Clone, Serialize)]
pub struct SelfCheckReport {
    pub results: Vec<HeadlineResult>,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
    pub min_accuracy: f64,
    pub disagreements: usize,
}

impl SelfCheckReport {
    pub fn passed(&self) -> bool {
        self.accuracy >= self.min_accuracy && self.disagreements == 0
    }
}

/// Run the self-check over [`SELF_CHECK_HEADLINES`]
pub fn run_self_check(
    classifier: &SentimentClassifier,
    session: Option<&Session>,
    min_accuracy: f64,
) -> Result<SelfCheckReport> {
    run_cases(classifier, session, &SELF_CHECK_HEADLINES, min_accuracy)
}

/// Run the self-check over arbitrary labelled headlines
pub fn run_cases(
    classifier: &SentimentClassifier,
    session: Option<&Session>,
    cases: &[(&str, SentimentLabel)],
    min_accuracy: f64,
) -> Result<SelfCheckReport> {
    let graph_labels = match session {
        Some(session) => Some(graph_predictions(classifier, session, cases)?),
        None => None,
    };

    let mut results = Vec::with_capacity(cases.len());
    for (index, (headline, expected)) in cases.iter().enumerate() {
        let classification = classifier.classify(headline);
        let result = HeadlineResult {
            headline: headline.to_string(),
            expected: *expected,
            predicted: classification.label,
            graph_predicted: graph_labels
                .as_ref()
                .and_then(|labels| labels.get(index).copied()),
            score: classification.score,
            matched_words: classification.matched_words,
        };

        info!(
            headline = %result.headline,
            expected = %result.expected,
            predicted = %result.predicted,
            score = %format!("{:.1}", result.score),
            matched = ?result.matched_words,
            correct = result.is_correct(),
            "Self-check headline"
        );
        if !result.graph_agrees() {
            warn!(headline = %result.headline, "Exported graph disagrees with procedural scorer");
        }

        results.push(result);
    }

    let total = results.len();
    let correct = results.iter().filter(|r| r.is_correct()).count();
    let disagreements = results.iter().filter(|r| !r.graph_agrees()).count();
    let accuracy = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    };

    let report = SelfCheckReport {
        results,
        correct,
        total,
        accuracy,
        min_accuracy,
        disagreements,
    };

    if report.passed() {
        info!(correct, total, accuracy = report.accuracy, "Self-check passed");
    } else {
        warn!(
            correct,
            total,
            accuracy = report.accuracy,
            disagreements,
            "Self-check below threshold, model needs improvement"
        );
    }

    Ok(report)
}

fn graph_predictions(
    classifier: &SentimentClassifier,
    session: &Session,
    cases: &[(&str, SentimentLabel)],
) -> Result<Vec<SentimentLabel>> {
    let tokenizer = classifier.tokenizer();
    let mut ids = Vec::with_capacity(cases.len() * SEQUENCE_LENGTH);
    for (headline, _) in cases {
        ids.extend(tokenizer.encode(headline).into_vec());
    }

    let batch = Tensor::int64(&[cases.len(), SEQUENCE_LENGTH], ids)?;
    let output = session.run_single(batch)?;
    let labels = output.as_bool()?;

    Ok(labels.iter().map(|&b| SentimentLabel::from_bool(b)).collect())
}
