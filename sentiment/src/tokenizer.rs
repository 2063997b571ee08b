//! Headline → fixed-length token id sequence

use serde::{Deserialize, Serialize};

use crate::vocabulary::{Vocabulary, PAD_TOKEN_ID};

/// Length of every token sequence fed to the model
pub const SEQUENCE_LENGTH: usize = 60;

/// Exactly [`SEQUENCE_LENGTH`] token ids, right-padded with the pad id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSequence(Vec<i64>);

impl TokenSequence {
    fn from_ids(mut ids: Vec<i64>) -> Self {
        ids.truncate(SEQUENCE_LENGTH);
        ids.resize(SEQUENCE_LENGTH, PAD_TOKEN_ID as i64);
        Self(ids)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<i64> {
        self.0
    }

    /// Number of positions holding a known word
    pub fn known_count(&self) -> usize {
        self.0.iter().filter(|&&id| id != PAD_TOKEN_ID as i64).count()
    }
}

/// Lowercase a raw whitespace-delimited word and strip every character
/// that is neither alphanumeric nor an apostrophe
pub fn clean_word(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '\'')
        .collect()
}

/// Strip one inflection suffix; the first matching rule wins
pub fn stem(word: &str) -> &str {
    let len = word.chars().count();
    let rules: [(&str, usize); 4] = [("ing", 5), ("ed", 4), ("es", 4), ("s", 3)];

    for (suffix, min_len) in rules {
        if len > min_len {
            if let Some(stripped) = word.strip_suffix(suffix) {
                return stripped;
            }
        }
    }
    word
}

/// Maps text onto the vocabulary
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer<'a> {
    vocab: &'a Vocabulary,
}

impl<'a> Tokenizer<'a> {
    pub fn new(vocab: &'a Vocabulary) -> Self {
        Self { vocab }
    }

    /// Cleaned words of `text` in order, empty words skipped
    pub fn words(text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(clean_word)
            .filter(|w| !w.is_empty())
            .collect()
    }

    /// Token id of a cleaned word. The surface form takes precedence so that
    /// listed inflections ("surges") keep their own entry; otherwise the
    /// stemmed form is tried.
    pub fn resolve(&self, word: &str) -> Option<u32> {
        self.vocab
            .lookup(word)
            .or_else(|| self.vocab.lookup(stem(word)))
    }

    /// Encode `text` into exactly [`SEQUENCE_LENGTH`] ids
    pub fn encode(&self, text: &str) -> TokenSequence {
        let ids = Self::words(text)
            .iter()
            .take(SEQUENCE_LENGTH)
            .map(|w| self.resolve(w).unwrap_or(PAD_TOKEN_ID) as i64)
            .collect();
        TokenSequence::from_ids(ids)
    }

    /// Cleaned words that resolved to a known token, in order
    pub fn matched_words(&self, text: &str) -> Vec<String> {
        Self::words(text)
            .into_iter()
            .filter(|w| self.resolve(w).is_some())
            .collect()
    }
}
