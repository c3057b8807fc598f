//! Immutable model snapshots.
//!
//! A [`Model`] is derived from a [`StatisticsSnapshot`], the vocabulary size at
//! build time and a [`SmoothingPolicy`]. It holds the log-prior of every
//! trained class and a dense, row-major table with one log-likelihood per
//! `(class, feature slot)` pair, including pairs never seen together during
//! training, so scoring never has to special-case them.
//!
//! Models are never mutated after construction. Each build yields a new
//! snapshot with its own `version`; callers share snapshots through `Arc`.

use chrono::{DateTime, Utc};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::FeatureModel;
use crate::error::{BayesError, Result};
use crate::index::{ClassSlot, FeatureSlot, Key, Slot};
use crate::smoothing::SmoothingPolicy;
use crate::statistics::{ClassSnapshot, StatisticsSnapshot};

/// Tolerance used when checking that priors form a distribution.
const PRIOR_SUM_TOLERANCE: f64 = 1e-6;

/// A class represented in a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelClass<L> {
    /// Slot of the class in the registry it was built from.
    pub slot: ClassSlot,
    /// Class label.
    pub label: L,
}

/// Likelihood rows of one class, before flattening.
struct ClassRow {
    log_prior: f64,
    present: Vec<f64>,
    absent: Vec<f64>,
}

/// Immutable, queryable Naive Bayes parameters.
///
/// Deserialized models are validated before they are handed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "ModelParts<L>",
    bound(deserialize = "L: Key + Deserialize<'de>")
)]
pub struct Model<L> {
    version: u64,
    built_at: DateTime<Utc>,
    feature_model: FeatureModel,
    alpha: f64,
    vocab_size: usize,
    classes: Vec<ModelClass<L>>,
    log_priors: Vec<f64>,
    /// `classes.len() * vocab_size` entries, row per class.
    log_likelihood: Vec<f64>,
    /// Log-probability of absence per entry (Bernoulli only, empty otherwise).
    #[serde(default)]
    log_absent: Vec<f64>,
}

/// Serialized layout of a [`Model`], before validation.
#[derive(Deserialize)]
struct ModelParts<L> {
    version: u64,
    built_at: DateTime<Utc>,
    feature_model: FeatureModel,
    alpha: f64,
    vocab_size: usize,
    classes: Vec<ModelClass<L>>,
    log_priors: Vec<f64>,
    log_likelihood: Vec<f64>,
    #[serde(default)]
    log_absent: Vec<f64>,
}

impl<L: Key> TryFrom<ModelParts<L>> for Model<L> {
    type Error = BayesError;

    fn try_from(parts: ModelParts<L>) -> Result<Self> {
        let model = Model {
            version: parts.version,
            built_at: parts.built_at,
            feature_model: parts.feature_model,
            alpha: parts.alpha,
            vocab_size: parts.vocab_size,
            classes: parts.classes,
            log_priors: parts.log_priors,
            log_likelihood: parts.log_likelihood,
            log_absent: parts.log_absent,
        };
        model.validate()?;
        Ok(model)
    }
}

impl<L: Key> Model<L> {
    /// Build a model from accumulated statistics.
    ///
    /// `labels` is indexed by class slot and must cover every class in the
    /// snapshot. Classes without samples are left out of the model.
    pub fn build(
        snapshot: &StatisticsSnapshot,
        vocab_size: usize,
        labels: &[L],
        policy: &dyn SmoothingPolicy,
        version: u64,
    ) -> Result<Self> {
        let total = snapshot.total_samples();
        if total == 0 {
            return Err(BayesError::EmptyTrainingSet);
        }
        if vocab_size == 0 {
            return Err(BayesError::degenerate_model(
                "no features observed: vocabulary size is 0",
            ));
        }
        if snapshot.feature_extent() > vocab_size {
            return Err(BayesError::degenerate_model(format!(
                "statistics reference feature slot {} beyond vocabulary size {vocab_size}",
                snapshot.feature_extent() - 1
            )));
        }
        if labels.len() < snapshot.classes.len() {
            return Err(BayesError::other(format!(
                "{} labels for {} class slots",
                labels.len(),
                snapshot.classes.len()
            )));
        }

        let trained: Vec<(usize, &ClassSnapshot)> = snapshot
            .classes
            .iter()
            .enumerate()
            .filter(|(_, class)| class.samples > 0)
            .collect();

        let log_total = (total as f64).ln();
        let feature_model = snapshot.feature_model;
        let rows: Vec<ClassRow> = trained
            .par_iter()
            .map(|(_, class)| build_row(class, feature_model, vocab_size, log_total, policy))
            .collect::<Result<Vec<_>>>()?;

        let mut classes = Vec::with_capacity(rows.len());
        let mut log_priors = Vec::with_capacity(rows.len());
        let mut log_likelihood = Vec::with_capacity(rows.len() * vocab_size);
        let mut log_absent = Vec::new();
        for ((slot, _), row) in trained.iter().zip(rows) {
            classes.push(ModelClass {
                slot: ClassSlot(*slot as u32),
                label: labels[*slot].clone(),
            });
            log_priors.push(row.log_prior);
            log_likelihood.extend(row.present);
            log_absent.extend(row.absent);
        }

        let model = Model {
            version,
            built_at: Utc::now(),
            feature_model,
            alpha: policy.alpha(),
            vocab_size,
            classes,
            log_priors,
            log_likelihood,
            log_absent,
        };
        model.validate()?;

        debug!(
            "built model v{} ({} classes, {} features, {} samples, {})",
            model.version,
            model.classes.len(),
            vocab_size,
            total,
            policy.name()
        );
        Ok(model)
    }

    /// Check table dimensions, finiteness and prior normalization.
    pub fn validate(&self) -> Result<()> {
        let cells = self
            .classes
            .len()
            .checked_mul(self.vocab_size)
            .ok_or_else(|| BayesError::degenerate_model("table size overflows"))?;
        if self.classes.is_empty() {
            return Err(BayesError::EmptyTrainingSet);
        }
        if self.vocab_size == 0 {
            return Err(BayesError::degenerate_model("vocabulary size is 0"));
        }
        if self.log_priors.len() != self.classes.len() || self.log_likelihood.len() != cells {
            return Err(BayesError::degenerate_model(format!(
                "table dimensions do not match {} classes x {} features",
                self.classes.len(),
                self.vocab_size
            )));
        }
        let expected_absent = match self.feature_model {
            FeatureModel::Multinomial => 0,
            FeatureModel::Bernoulli => cells,
        };
        if self.log_absent.len() != expected_absent {
            return Err(BayesError::degenerate_model(
                "absence table does not match the feature model",
            ));
        }
        if self
            .classes
            .windows(2)
            .any(|pair| pair[0].slot >= pair[1].slot)
        {
            return Err(BayesError::degenerate_model(
                "classes are not in slot order",
            ));
        }
        let all_finite = self
            .log_priors
            .iter()
            .chain(&self.log_likelihood)
            .chain(&self.log_absent)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(BayesError::degenerate_model(
                "model contains non-finite log-probabilities",
            ));
        }
        let prior_sum: f64 = self.log_priors.iter().map(|v| v.exp()).sum();
        if (prior_sum - 1.0).abs() > PRIOR_SUM_TOLERANCE {
            return Err(BayesError::degenerate_model(format!(
                "priors sum to {prior_sum}"
            )));
        }
        Ok(())
    }

    /// Monotonic build number of this snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Build timestamp.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Feature semantics the model was built for.
    pub fn feature_model(&self) -> FeatureModel {
        self.feature_model
    }

    /// Smoothing pseudo-count used for the build.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of feature slots covered by the tables.
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Number of classes in the model.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Classes in slot order.
    pub fn classes(&self) -> &[ModelClass<L>] {
        &self.classes
    }

    /// Position of `label` in [`Model::classes`].
    pub fn position_of(&self, label: &L) -> Option<usize> {
        self.classes.iter().position(|class| &class.label == label)
    }

    /// Log-priors, parallel to [`Model::classes`].
    pub fn log_priors(&self) -> &[f64] {
        &self.log_priors
    }

    /// Priors, parallel to [`Model::classes`].
    pub fn priors(&self) -> Vec<f64> {
        self.log_priors.iter().map(|v| v.exp()).collect()
    }

    /// Log-likelihood of `feature` for the class at `position`.
    pub fn log_likelihood(&self, position: usize, feature: FeatureSlot) -> Option<f64> {
        if position >= self.classes.len() || feature.index() >= self.vocab_size {
            return None;
        }
        Some(self.log_likelihood[position * self.vocab_size + feature.index()])
    }

    /// Log-probability that `feature` is absent for the class at `position` (Bernoulli only).
    pub fn log_absent(&self, position: usize, feature: FeatureSlot) -> Option<f64> {
        if self.log_absent.is_empty() {
            return None;
        }
        if position >= self.classes.len() || feature.index() >= self.vocab_size {
            return None;
        }
        Some(self.log_absent[position * self.vocab_size + feature.index()])
    }

    /// The full log-likelihood row of the class at `position`.
    pub(crate) fn likelihood_row(&self, position: usize) -> &[f64] {
        let start = position * self.vocab_size;
        &self.log_likelihood[start..start + self.vocab_size]
    }

    /// The full absence row of the class at `position` (empty for multinomial models).
    pub(crate) fn absent_row(&self, position: usize) -> &[f64] {
        if self.log_absent.is_empty() {
            return &[];
        }
        let start = position * self.vocab_size;
        &self.log_absent[start..start + self.vocab_size]
    }
}

fn build_row(
    class: &ClassSnapshot,
    feature_model: FeatureModel,
    vocab_size: usize,
    log_total: f64,
    policy: &dyn SmoothingPolicy,
) -> Result<ClassRow> {
    let log_prior = (class.samples as f64).ln() - log_total;

    match feature_model {
        FeatureModel::Multinomial => {
            let unseen = policy.log_probability(0.0, class.mass, vocab_size)?;
            let mut present = vec![unseen; vocab_size];
            for &(slot, count) in &class.features {
                present[slot.index()] = policy.log_probability(count, class.mass, vocab_size)?;
            }
            Ok(ClassRow {
                log_prior,
                present,
                absent: Vec::new(),
            })
        }
        FeatureModel::Bernoulli => {
            let samples = class.samples as f64;
            let mut present = vec![policy.log_probability(0.0, samples, 2)?; vocab_size];
            let mut absent = vec![policy.log_probability(samples, samples, 2)?; vocab_size];
            for &(slot, count) in &class.features {
                if count > samples {
                    return Err(BayesError::degenerate_model(format!(
                        "feature {} present in {count} of {samples} samples",
                        slot.0
                    )));
                }
                present[slot.index()] = policy.log_probability(count, samples, 2)?;
                absent[slot.index()] = policy.log_probability(samples - count, samples, 2)?;
            }
            Ok(ClassRow {
                log_prior,
                present,
                absent,
            })
        }
    }
}
