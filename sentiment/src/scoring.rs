//! Procedural sentiment scoring

use serde::{Deserialize, Serialize};

use crate::tokenizer::{TokenSequence, Tokenizer};
use crate::vocabulary::Vocabulary;

/// Binary headline label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Good,
    Bad,
}

impl SentimentLabel {
    /// Positive iff the score is strictly greater than zero
    pub fn from_score(score: f32) -> Self {
        if score > 0.0 {
            SentimentLabel::Good
        } else {
            SentimentLabel::Bad
        }
    }

    pub fn from_bool(positive: bool) -> Self {
        if positive {
            SentimentLabel::Good
        } else {
            SentimentLabel::Bad
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, SentimentLabel::Good)
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentLabel::Good => write!(f, "GOOD"),
            SentimentLabel::Bad => write!(f, "BAD"),
        }
    }
}

/// Result of classifying one piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub tokens: TokenSequence,
    pub score: f32,
    pub label: SentimentLabel,
    pub matched_words: Vec<String>,
}

/// Sum of the weights of every position in the sequence
pub fn score_tokens(vocab: &Vocabulary, tokens: &TokenSequence) -> f32 {
    tokens
        .as_slice()
        .iter()
        .map(|&id| u32::try_from(id).map_or(0.0, |id| vocab.weight(id)))
        .sum()
}

/// Procedural classifier over an immutable vocabulary
#[derive(Debug, Clone)]
pub struct SentimentClassifier {
    vocab: Vocabulary,
}

impl SentimentClassifier {
    pub fn new(vocab: Vocabulary) -> Self {
        Self { vocab }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn tokenizer(&self) -> Tokenizer<'_> {
        Tokenizer::new(&self.vocab)
    }

    pub fn classify(&self, text: &str) -> Classification {
        let tokenizer = self.tokenizer();
        let tokens = tokenizer.encode(text);
        let score = score_tokens(&self.vocab, &tokens);

        Classification {
            score,
            label: SentimentLabel::from_score(score),
            matched_words: tokenizer.matched_words(text),
            tokens,
        }
    }
}
