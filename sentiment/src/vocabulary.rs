//! Sentiment lexicon and the word/weight tables derived from it
//!
//! A lexicon entry assigns one token id and one weight to a group of
//! surface words (synonyms and inflections). Token ids are bounded by the
//! row count of the exported embedding table: id 0 is the pad/unknown row
//! and ids run up to [`MAX_TOKEN_ID`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SentimentError};

/// Largest token id the exported model accepts
pub const MAX_TOKEN_ID: u32 = 60;

/// Token id of padding and of words outside the lexicon
pub const PAD_TOKEN_ID: u32 = 0;

/// Sentiment band; each band bounds the weights of its entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBand {
    StronglyPositive,
    ModeratelyPositive,
    ModeratelyNegative,
    StronglyNegative,
}

impl SentimentBand {
    /// Inclusive weight range of the band
    pub fn range(&self) -> (f32, f32) {
        match self {
            SentimentBand::StronglyPositive => (2.0, 3.0),
            SentimentBand::ModeratelyPositive => (1.0, 2.0),
            SentimentBand::ModeratelyNegative => (-2.0, -1.0),
            SentimentBand::StronglyNegative => (-3.0, -2.0),
        }
    }

    pub fn contains(&self, weight: f32) -> bool {
        let (low, high) = self.range();
        weight >= low && weight <= high
    }

    /// Band implied by a bare weight, used when reloading exported tables.
    /// Boundary weights (±2.0) resolve to the moderate band.
    pub fn for_weight(weight: f32) -> Option<Self> {
        [
            SentimentBand::ModeratelyPositive,
            SentimentBand::StronglyPositive,
            SentimentBand::ModeratelyNegative,
            SentimentBand::StronglyNegative,
        ]
        .into_iter()
        .find(|band| band.contains(weight))
    }
}

impl std::fmt::Display for SentimentBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (low, high) = self.range();
        let name = match self {
            SentimentBand::StronglyPositive => "strongly positive",
            SentimentBand::ModeratelyPositive => "moderately positive",
            SentimentBand::ModeratelyNegative => "moderately negative",
            SentimentBand::StronglyNegative => "strongly negative",
        };
        write!(f, "{} [{:+.1}, {:+.1}]", name, low, high)
    }
}

/// One lexicon row: a token id shared by a group of words
#[derive(Debug, Clone, PartialEq)]
pub struct LexiconEntry {
    pub id: u32,
    pub weight: f32,
    pub band: SentimentBand,
    pub words: Vec<String>,
}

impl LexiconEntry {
    pub fn new(id: u32, weight: f32, band: SentimentBand, words: &[&str]) -> Self {
        Self {
            id,
            weight,
            band,
            words: words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

use SentimentBand::{ModeratelyNegative, ModeratelyPositive, StronglyNegative, StronglyPositive};

/// The crypto-news lexicon shipped with the model
const BUILTIN_LEXICON: &[(u32, f32, SentimentBand, &[&str])] = &[
    (1, 3.0, StronglyPositive, &["bullish"]),
    (2, 2.8, StronglyPositive, &["surge", "surges"]),
    (3, 2.8, StronglyPositive, &["soar"]),
    (4, 2.5, StronglyPositive, &["rally"]),
    (5, 2.8, StronglyPositive, &["approval", "approved"]),
    (6, 2.5, StronglyPositive, &["breakthrough"]),
    (7, 2.2, StronglyPositive, &["growth"]),
    (8, 2.5, StronglyPositive, &["gains", "gain"]),
    (9, 2.0, StronglyPositive, &["partnership"]),
    (10, 2.0, StronglyPositive, &["integration"]),
    (11, 2.2, StronglyPositive, &["launch"]),
    (12, 2.3, StronglyPositive, &["milestone"]),
    (13, 2.5, StronglyPositive, &["record"]),
    (14, 2.2, StronglyPositive, &["institutional"]),
    (15, 2.0, StronglyPositive, &["investment"]),
    (16, 1.8, ModeratelyPositive, &["positive"]),
    (17, 1.5, ModeratelyPositive, &["increase"]),
    (18, 1.5, ModeratelyPositive, &["up"]),
    (19, 1.8, ModeratelyPositive, &["high"]),
    (20, 1.5, ModeratelyPositive, &["strong"]),
    (21, 1.5, ModeratelyPositive, &["expanding"]),
    (22, 1.5, ModeratelyPositive, &["rising", "rise"]),
    (23, 1.5, ModeratelyPositive, &["growing", "grow"]),
    (24, 1.2, ModeratelyPositive, &["development"]),
    (25, 1.3, ModeratelyPositive, &["ahead"]),
    (26, 2.0, ModeratelyPositive, &["adoption"]),
    (27, 1.8, ModeratelyPositive, &["success"]),
    (28, -3.0, StronglyNegative, &["bearish"]),
    (29, -3.0, StronglyNegative, &["crash", "crashes"]),
    (30, -2.8, StronglyNegative, &["hack", "hacked"]),
    (31, -2.8, StronglyNegative, &["fraud"]),
    (32, -2.8, StronglyNegative, &["scam"]),
    (33, -2.5, StronglyNegative, &["stolen"]),
    (34, -2.5, StronglyNegative, &["exploit"]),
    (35, -2.3, StronglyNegative, &["vulnerability"]),
    (36, -2.8, StronglyNegative, &["collapse"]),
    (37, -2.8, StronglyNegative, &["bankruptcy"]),
    (38, -2.0, StronglyNegative, &["investigation"]),
    (39, -2.2, StronglyNegative, &["lawsuit"]),
    (40, -2.5, StronglyNegative, &["banned", "ban"]),
    (41, -2.3, StronglyNegative, &["crackdown"]),
    (42, -2.8, StronglyNegative, &["plunge"]),
    (43, -2.5, StronglyNegative, &["dump"]),
    (44, -2.3, StronglyNegative, &["losses", "loss"]),
    (45, -2.0, StronglyNegative, &["decline"]),
    (46, -2.2, StronglyNegative, &["failed", "fail"]),
    (47, -1.8, ModeratelyNegative, &["negative"]),
    (48, -1.5, ModeratelyNegative, &["down"]),
    (49, -1.8, ModeratelyNegative, &["drop", "drops"]),
    (50, -1.8, ModeratelyNegative, &["fall", "falls"]),
    (51, -1.5, ModeratelyNegative, &["low"]),
    (52, -1.5, ModeratelyNegative, &["concern", "concerns"]),
    (53, -1.5, ModeratelyNegative, &["risk"]),
    (54, -1.8, ModeratelyNegative, &["warning"]),
    (55, -1.3, ModeratelyNegative, &["delay"]),
    (56, -1.5, ModeratelyNegative, &["uncertainty"]),
    (57, -1.8, ModeratelyNegative, &["anxiety"]),
    (58, -2.0, ModeratelyNegative, &["crumbles", "crumble"]),
    (59, -1.5, ModeratelyNegative, &["stalls", "stall"]),
    (60, -1.8, ModeratelyNegative, &["fear"]),
];

/// The built-in lexicon as owned entries
pub fn builtin_lexicon() -> Vec<LexiconEntry> {
    BUILTIN_LEXICON
        .iter()
        .map(|(id, weight, band, words)| LexiconEntry::new(*id, *weight, *band, words))
        .collect()
}

/// Immutable word→id and id→weight tables
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    words: BTreeMap<String, u32>,
    weights: BTreeMap<u32, f32>,
}

impl Vocabulary {
    /// Build the tables from lexicon entries, failing on the first
    /// inconsistency. Words are stored lowercase.
    pub fn build(entries: &[LexiconEntry]) -> Result<Self> {
        let mut words = BTreeMap::new();
        let mut weights = BTreeMap::new();
        let mut bands: HashMap<u32, SentimentBand> = HashMap::new();

        for entry in entries {
            let first_word = entry.words.first().cloned().unwrap_or_default();

            if entry.id == PAD_TOKEN_ID {
                return Err(SentimentError::ReservedId { word: first_word });
            }
            if entry.id > MAX_TOKEN_ID {
                return Err(SentimentError::IdCeiling {
                    word: first_word,
                    id: entry.id,
                    max: MAX_TOKEN_ID,
                });
            }
            if !entry.band.contains(entry.weight) {
                return Err(SentimentError::WeightOutOfBand {
                    id: entry.id,
                    weight: entry.weight,
                    band: entry.band.to_string(),
                });
            }

            match (weights.get(&entry.id), bands.get(&entry.id)) {
                (Some(&weight), Some(&band)) if weight != entry.weight || band != entry.band => {
                    return Err(SentimentError::ConflictingId { id: entry.id });
                }
                _ => {
                    weights.insert(entry.id, entry.weight);
                    bands.insert(entry.id, entry.band);
                }
            }

            for word in &entry.words {
                let word = word.to_lowercase();
                if words.insert(word.clone(), entry.id).is_some() {
                    return Err(SentimentError::DuplicateWord { word });
                }
            }
        }

        debug!(
            words = words.len(),
            ids = weights.len(),
            "Vocabulary built"
        );

        Ok(Self { words, weights })
    }

    /// Vocabulary of the built-in crypto-news lexicon
    pub fn builtin() -> Result<Self> {
        Self::build(&builtin_lexicon())
    }

    /// Reload tables previously written by [`Vocabulary::save_vocab`] and
    /// [`Vocabulary::save_weights`]. The result is validated like a fresh build.
    pub fn load<P: AsRef<Path>>(vocab_path: P, weights_path: P) -> Result<Self> {
        let vocab_path = vocab_path.as_ref();
        let weights_path = weights_path.as_ref();

        let words: BTreeMap<String, u32> =
            serde_json::from_str(&std::fs::read_to_string(vocab_path)?)?;
        let raw_weights: BTreeMap<String, f32> =
            serde_json::from_str(&std::fs::read_to_string(weights_path)?)?;

        let mut weights = BTreeMap::new();
        for (key, weight) in raw_weights {
            let id = key
                .strip_prefix("token_")
                .and_then(|id| id.parse::<u32>().ok())
                .ok_or_else(|| {
                    SentimentError::invalid_artifact(
                        weights_path.display().to_string(),
                        format!("unexpected key {}", key),
                    )
                })?;
            weights.insert(id, weight);
        }

        let mut grouped: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
        for (word, id) in &words {
            grouped.entry(*id).or_default().push(word.as_str());
        }

        let mut entries = Vec::with_capacity(grouped.len());
        for (id, group) in grouped {
            let weight = weights.get(&id).copied().ok_or_else(|| {
                SentimentError::invalid_artifact(
                    weights_path.display().to_string(),
                    format!("no weight for token {}", id),
                )
            })?;
            let band = SentimentBand::for_weight(weight).ok_or(SentimentError::WeightOutOfBand {
                id,
                weight,
                band: "any".to_string(),
            })?;
            entries.push(LexiconEntry::new(id, weight, band, &group));
        }

        Self::build(&entries)
    }

    /// Token id of an exact (already cleaned) word
    pub fn lookup(&self, word: &str) -> Option<u32> {
        self.words.get(word).copied()
    }

    /// Weight of a token id; unknown ids and the pad id weigh 0
    pub fn weight(&self, id: u32) -> f32 {
        self.weights.get(&id).copied().unwrap_or(0.0)
    }

    pub fn words(&self) -> &BTreeMap<String, u32> {
        &self.words
    }

    pub fn weights(&self) -> &BTreeMap<u32, f32> {
        &self.weights
    }

    /// Number of surface words, aliases included
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Number of distinct token ids
    pub fn unique_ids(&self) -> usize {
        self.words.values().collect::<HashSet<_>>().len()
    }

    pub fn max_id(&self) -> u32 {
        self.weights.keys().next_back().copied().unwrap_or(PAD_TOKEN_ID)
    }

    /// Dense embedding column with `MAX_TOKEN_ID + 1` rows, row 0 zero
    pub fn embedding_table(&self) -> Vec<f32> {
        (0..=MAX_TOKEN_ID).map(|id| self.weight(id)).collect()
    }

    /// Write `vocab.json` (word → id, keys sorted)
    pub fn save_vocab<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        Ok(zkml_graph::write_json(path, &self.words)?)
    }

    /// Write `weights.json` (`token_<id>` → weight, ordered by id)
    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        Ok(zkml_graph::write_json(path, &WeightTable(&self.weights))?)
    }
}

/// Serializes weights keyed `token_<id>` in numeric id order
struct WeightTable<'a>(&'a BTreeMap<u32, f32>);

impl Serialize for WeightTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, weight) in self.0 {
            map.serialize_entry(&format!("token_{}", id), weight)?;
        }
        map.end()
    }
}
