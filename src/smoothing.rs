//! Additive smoothing of raw counts into probability estimates.
//!
//! A [`SmoothingPolicy`] turns a raw count `c`, the mass `N` it is drawn from
//! and the number of possible outcomes `V` into a strictly positive
//! probability. [`Lidstone`] implements the classic `(c + alpha) / (N + alpha * V)`
//! rule; `alpha = 1` is Laplace smoothing.

use std::fmt::Debug;

use crate::error::{BayesError, Result};

/// Smallest pseudo-count ever applied.
///
/// `alpha = 0` is accepted but is floored to this value so that no estimate is
/// exactly zero and every log-likelihood stays finite.
pub const MIN_PSEUDO_COUNT: f64 = 1e-14;

/// Converts raw counts into smoothed probability estimates.
pub trait SmoothingPolicy: Debug + Send + Sync {
    /// Estimate the probability of an outcome seen `count` times out of `mass`,
    /// among `outcomes` possible outcomes.
    fn probability(&self, count: f64, mass: f64, outcomes: usize) -> Result<f64>;

    /// Natural log of [`SmoothingPolicy::probability`].
    fn log_probability(&self, count: f64, mass: f64, outcomes: usize) -> Result<f64> {
        Ok(self.probability(count, mass, outcomes)?.ln())
    }

    /// The pseudo-count recorded in model metadata.
    fn alpha(&self) -> f64;

    /// Short name for debugging and logging.
    fn name(&self) -> &str;
}

/// Lidstone (additive) smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lidstone {
    alpha: f64,
}

impl Lidstone {
    /// Create a policy with the given pseudo-count.
    pub fn new(alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(BayesError::invalid_config(format!(
                "alpha must be finite and >= 0, got {alpha}"
            )));
        }
        Ok(Lidstone { alpha })
    }

    /// Laplace smoothing (`alpha = 1`).
    pub fn laplace() -> Self {
        Lidstone { alpha: 1.0 }
    }

    fn effective_alpha(&self) -> f64 {
        self.alpha.max(MIN_PSEUDO_COUNT)
    }

    fn check(count: f64, mass: f64, outcomes: usize) -> Result<()> {
        if outcomes == 0 {
            return Err(BayesError::degenerate_model(
                "no features observed: vocabulary size is 0",
            ));
        }
        if !count.is_finite() || !mass.is_finite() || count < 0.0 || mass < 0.0 {
            return Err(BayesError::invalid_observation(format!(
                "counts must be finite and >= 0 (count={count}, mass={mass})"
            )));
        }
        Ok(())
    }
}

impl Default for Lidstone {
    fn default() -> Self {
        Self::laplace()
    }
}

impl SmoothingPolicy for Lidstone {
    fn probability(&self, count: f64, mass: f64, outcomes: usize) -> Result<f64> {
        Self::check(count, mass, outcomes)?;
        let alpha = self.effective_alpha();
        Ok((count + alpha) / (mass + alpha * outcomes as f64))
    }

    fn log_probability(&self, count: f64, mass: f64, outcomes: usize) -> Result<f64> {
        Self::check(count, mass, outcomes)?;
        let alpha = self.effective_alpha();
        // Difference of logs keeps tiny estimates from underflowing to zero.
        Ok((count + alpha).ln() - (mass + alpha * outcomes as f64).ln())
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn name(&self) -> &str {
        "lidstone"
    }
}
