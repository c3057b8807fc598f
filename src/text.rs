//! Text front-end for document classification.
//!
//! Turns raw text into term-count features and feeds them to a
//! [`NaiveBayes`](crate::classifier::NaiveBayes) classifier keyed by terms.
//! The default pipeline splits on Unicode word boundaries, lowercases and
//! removes English stop words.

pub mod classifier;
pub mod stop;
pub mod tokenizer;

pub use classifier::TextClassifier;
pub use stop::StopWords;
pub use tokenizer::{Tokenizer, UnicodeWordTokenizer, WhitespaceTokenizer};
