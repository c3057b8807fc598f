//! Configuration for a classifier instance.
//!
//! The feature model is fixed at construction: mixing multinomial and
//! Bernoulli updates inside one set of counters would break the meaning of
//! the accumulated statistics, so it is not a per-call option.

use serde::{Deserialize, Serialize};

use crate::error::{BayesError, Result};

/// How feature values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureModel {
    /// Values are occurrence counts (token frequencies).
    #[default]
    Multinomial,

    /// Values are presence flags: `> 0` present, `0` absent.
    Bernoulli,
}

/// What prediction does with an observation that holds no feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyObservationPolicy {
    /// Rank classes by their priors alone.
    #[default]
    PriorsOnly,

    /// Fail with `EmptyObservation`.
    Reject,
}

/// Configuration for a [`NaiveBayes`](crate::classifier::NaiveBayes) instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Feature semantics, fixed for the lifetime of the classifier.
    pub feature_model: FeatureModel,

    /// Additive smoothing parameter (1.0 = Laplace).
    pub alpha: f64,

    /// Behavior on empty prediction input.
    pub empty_observation: EmptyObservationPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            feature_model: FeatureModel::Multinomial,
            alpha: 1.0,
            empty_observation: EmptyObservationPolicy::PriorsOnly,
        }
    }
}

impl ClassifierConfig {
    /// Create a default multinomial configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the feature model.
    pub fn with_feature_model(mut self, feature_model: FeatureModel) -> Self {
        self.feature_model = feature_model;
        self
    }

    /// Set the smoothing parameter.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the empty observation policy.
    pub fn with_empty_observation(mut self, policy: EmptyObservationPolicy) -> Self {
        self.empty_observation = policy;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(BayesError::invalid_config(format!(
                "alpha must be finite and >= 0, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}
