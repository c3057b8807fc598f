//! # fast-bayes
//!
//! A fast, in-process Naive Bayes classifier core for Rust.
//!
//! ## Features
//!
//! - Multinomial and Bernoulli feature models
//! - Incremental, thread-safe training with per-class sharded counters
//! - Immutable model snapshots swapped atomically for lock-free prediction
//! - Log-space scoring with additive (Lidstone/Laplace) smoothing
//! - Text pipeline with Unicode tokenizing and stop words
//! - JSON persistence of models and training state
//!
//! ## Example
//!
//! ```
//! use fast_bayes::prelude::*;
//!
//! let nb: NaiveBayes = NaiveBayes::new(ClassifierConfig::default()).unwrap();
//! nb.train("spam", [("offer", 2.0), ("free", 1.0)], 1).unwrap();
//! nb.train("ham", [("meeting", 1.0), ("notes", 1.0)], 1).unwrap();
//! nb.refresh().unwrap();
//!
//! let ranking = nb.classify([("free", 1.0)]).unwrap();
//! assert_eq!(ranking.best().unwrap().label, "spam");
//! ```

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod math;
pub mod model;
pub mod observation;
pub mod persist;
pub mod predictor;
pub mod smoothing;
pub mod statistics;
pub mod store;
pub mod text;
pub mod trainer;

pub mod prelude {
    pub use crate::classifier::NaiveBayes;
    pub use crate::config::{ClassifierConfig, EmptyObservationPolicy, FeatureModel};
    pub use crate::error::{BayesError, Result};
    pub use crate::index::{ClassSlot, FeatureSlot};
    pub use crate::model::Model;
    pub use crate::observation::Observation;
    pub use crate::persist::TrainingState;
    pub use crate::predictor::{Predictor, Ranking, ScoredClass};
    pub use crate::smoothing::{Lidstone, SmoothingPolicy};
    pub use crate::text::TextClassifier;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
