//! Error types for the fast-bayes library.
//!
//! All fallible operations return [`BayesError`] through the crate-wide
//! [`Result`] alias. Every error is scoped to the call that produced it: the
//! feature index, class registry and accumulated statistics remain valid for
//! subsequent calls after any rejected operation.
//!
//! # Examples
//!
//! ```
//! use fast_bayes::error::{BayesError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(BayesError::invalid_observation("negative count for slot 3"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for fast-bayes operations.
#[derive(Error, Debug)]
pub enum BayesError {
    /// A training or prediction observation carried a negative or non-finite
    /// value, or a training call used a zero multiplicity.
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    /// A model build was attempted before any sample was trained.
    #[error("Empty training set: cannot build a model from zero samples")]
    EmptyTrainingSet,

    /// A model build was attempted with no usable feature space.
    #[error("Degenerate model: {0}")]
    DegenerateModel(String),

    /// Prediction input contained no features and the configured policy rejects it.
    #[error("Empty observation: prediction input contains no features")]
    EmptyObservation,

    /// Invalid configuration value (smoothing parameter, etc.).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Prediction was requested before any model snapshot was published.
    #[error("Model not built: {0}")]
    ModelNotBuilt(String),

    /// Slot space of an index has been exhausted.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// I/O errors (state files used by the command line tool)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with BayesError.
pub type Result<T> = std::result::Result<T, BayesError>;

impl BayesError {
    /// Create a new invalid observation error.
    pub fn invalid_observation<S: Into<String>>(msg: S) -> Self {
        BayesError::InvalidObservation(msg.into())
    }

    /// Create a new degenerate model error.
    pub fn degenerate_model<S: Into<String>>(msg: S) -> Self {
        BayesError::DegenerateModel(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        BayesError::InvalidConfig(msg.into())
    }

    /// Create a new model-not-built error.
    pub fn model_not_built<S: Into<String>>(msg: S) -> Self {
        BayesError::ModelNotBuilt(msg.into())
    }

    /// Create a new capacity error.
    pub fn capacity_exceeded<S: Into<String>>(msg: S) -> Self {
        BayesError::CapacityExceeded(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        BayesError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = BayesError::invalid_observation("negative count");
        assert_eq!(error.to_string(), "Invalid observation: negative count");

        let error = BayesError::degenerate_model("vocabulary is empty");
        assert_eq!(error.to_string(), "Degenerate model: vocabulary is empty");

        let error = BayesError::EmptyTrainingSet;
        assert!(error.to_string().starts_with("Empty training set"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let bayes_error = BayesError::from(io_error);

        match bayes_error {
            BayesError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<u32>("not json").unwrap_err();
        let bayes_error = BayesError::from(json_error);
        assert!(matches!(bayes_error, BayesError::Json(_)));
    }
}
