//! # zkML Sentiment
//!
//! A deliberately tiny news-headline sentiment classifier. Every word in a
//! fixed crypto-news lexicon carries a signed weight; a headline is positive
//! when the weights of its tokens sum to more than zero.
//!
//! The same computation exists twice: procedurally in [`scoring`], and as an
//! exported embedding-sum graph built by [`export`]. The self-check in
//! [`selfcheck`] evaluates both on a fixed set of headlines.

pub mod config;
pub mod error;
pub mod export;
pub mod scoring;
pub mod selfcheck;
pub mod tokenizer;
pub mod vocabulary;

pub use config::SentimentConfig;
pub use error::{Result, SentimentError};
pub use export::{build_model, export_artifacts, ExportSummary};
pub use scoring::{Classification, SentimentClassifier, SentimentLabel};
pub use selfcheck::{run_self_check, HeadlineResult, SelfCheckReport};
pub use tokenizer::{TokenSequence, Tokenizer, SEQUENCE_LENGTH};
pub use vocabulary::{LexiconEntry, SentimentBand, Vocabulary, MAX_TOKEN_ID};

/// Version of the sentiment model builder
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
