//! Log-space scoring and ranking against a model snapshot.
//!
//! For every class the score is the log-prior plus the evidence of each
//! observed feature:
//!
//! - multinomial: `value * log P(feature | class)`
//! - Bernoulli: `log P(present | class)` when `value > 0`, otherwise
//!   `log P(absent | class)`
//!
//! Feature slots the model does not cover (features first seen after the
//! build, or never seen at all) are skipped: they carry no information about
//! any class. Scores are only comparable within one snapshot; use
//! [`Ranking::probabilities`] for normalized values.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::{EmptyObservationPolicy, FeatureModel};
use crate::error::{BayesError, Result};
use crate::index::{ClassSlot, FeatureSlot, Key, Slot};
use crate::math;
use crate::model::Model;
use crate::observation::Observation;

/// Score of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredClass<L> {
    /// Slot of the class in the registry.
    pub slot: ClassSlot,
    /// Class label.
    pub label: L,
    /// Unnormalized log-score.
    pub score: f64,
}

/// Classes ordered by descending score.
///
/// Ties keep class slot order, so rankings are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking<L> {
    model_version: u64,
    entries: Vec<ScoredClass<L>>,
}

impl<L> Ranking<L> {
    /// Version of the model snapshot that produced this ranking.
    pub fn model_version(&self) -> u64 {
        self.model_version
    }

    /// The highest scoring class.
    pub fn best(&self) -> Option<&ScoredClass<L>> {
        self.entries.first()
    }

    /// All classes, best first.
    pub fn entries(&self) -> &[ScoredClass<L>] {
        &self.entries
    }

    /// The `k` best classes.
    pub fn top(&self, k: usize) -> &[ScoredClass<L>] {
        &self.entries[..k.min(self.entries.len())]
    }

    /// Consume the ranking into its entries.
    pub fn into_entries(self) -> Vec<ScoredClass<L>> {
        self.entries
    }

    /// Number of ranked classes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ranking is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Softmax of the scores, parallel to [`Ranking::entries`].
    pub fn probabilities(&self) -> Vec<f64> {
        let scores: Vec<f64> = self.entries.iter().map(|entry| entry.score).collect();
        math::softmax(&scores)
    }
}

/// Scores observations against one model snapshot.
///
/// Holding the `Arc` keeps the snapshot alive even if a newer one is published
/// meanwhile.
#[derive(Debug, Clone)]
pub struct Predictor<L> {
    model: Arc<Model<L>>,
    empty_observation: EmptyObservationPolicy,
}

impl<L: Key> Predictor<L> {
    /// Create a predictor for `model`.
    pub fn new(model: Arc<Model<L>>, empty_observation: EmptyObservationPolicy) -> Self {
        Predictor {
            model,
            empty_observation,
        }
    }

    /// The snapshot this predictor scores against.
    pub fn model(&self) -> &Arc<Model<L>> {
        &self.model
    }

    /// Raw scores, parallel to the model's classes.
    pub fn scores(&self, observation: &Observation) -> Result<Vec<f64>> {
        self.check_empty(observation.is_empty())?;
        Ok(self.evidence_scores(observation))
    }

    fn check_empty(&self, input_empty: bool) -> Result<()> {
        if input_empty && self.empty_observation == EmptyObservationPolicy::Reject {
            return Err(BayesError::EmptyObservation);
        }
        Ok(())
    }

    fn evidence_scores(&self, observation: &Observation) -> Vec<f64> {
        let model = &self.model;
        let vocab_size = model.vocab_size();
        let known: Vec<(FeatureSlot, f64)> = observation
            .iter()
            .filter(|(slot, _)| slot.index() < vocab_size)
            .collect();

        (0..model.class_count())
            .map(|position| {
                let prior = model.log_priors()[position];
                let present = model.likelihood_row(position);
                let evidence: f64 = match model.feature_model() {
                    FeatureModel::Multinomial => known
                        .iter()
                        .map(|&(slot, value)| value * present[slot.index()])
                        .sum(),
                    FeatureModel::Bernoulli => {
                        let absent = model.absent_row(position);
                        known
                            .iter()
                            .map(|&(slot, value)| {
                                if value > 0.0 {
                                    present[slot.index()]
                                } else {
                                    absent[slot.index()]
                                }
                            })
                            .sum()
                    }
                };
                prior + evidence
            })
            .collect()
    }

    /// Rank every class of the model for `observation`.
    pub fn classify(&self, observation: &Observation) -> Result<Ranking<L>> {
        self.rank(observation, observation.is_empty())
    }

    /// Rank `observation`, where `input_empty` tells whether the caller supplied
    /// no features at all (as opposed to only unknown ones).
    pub(crate) fn rank(&self, observation: &Observation, input_empty: bool) -> Result<Ranking<L>> {
        self.check_empty(input_empty)?;
        let scores = self.evidence_scores(observation);
        let mut entries: Vec<ScoredClass<L>> = self
            .model
            .classes()
            .iter()
            .zip(scores)
            .map(|(class, score)| ScoredClass {
                slot: class.slot,
                label: class.label.clone(),
                score,
            })
            .collect();
        // Stable: equal scores keep slot order.
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(Ranking {
            model_version: self.model.version(),
            entries,
        })
    }

    /// Classify many observations in parallel.
    pub fn classify_batch(&self, observations: &[Observation]) -> Vec<Result<Ranking<L>>> {
        observations
            .par_iter()
            .map(|observation| self.classify(observation))
            .collect()
    }

    /// Per-feature evidence toward `label`, largest contribution first.
    ///
    /// Returns `None` if the model has no such class.
    pub fn explain(&self, observation: &Observation, label: &L) -> Option<Vec<(FeatureSlot, f64)>> {
        let position = self.model.position_of(label)?;
        let present = self.model.likelihood_row(position);
        let absent = self.model.absent_row(position);
        let vocab_size = self.model.vocab_size();

        let mut contributions: Vec<(FeatureSlot, f64)> = observation
            .iter()
            .filter(|(slot, _)| slot.index() < vocab_size)
            .map(|(slot, value)| {
                let contribution = match self.model.feature_model() {
                    FeatureModel::Multinomial => value * present[slot.index()],
                    FeatureModel::Bernoulli if value > 0.0 => present[slot.index()],
                    FeatureModel::Bernoulli => absent[slot.index()],
                };
                (slot, contribution)
            })
            .collect();
        contributions.sort_by(|a, b| b.1.total_cmp(&a.1));
        Some(contributions)
    }
}
