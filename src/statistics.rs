//! Sufficient statistics accumulated from training.
//!
//! Per class the accumulator keeps the number of samples, a sparse map of
//! per-feature counts and the total feature mass (the sum of those counts).
//! Counts only ever grow: there is no removal or decay, so replaying the same
//! training data twice doubles every count.
//!
//! Counters are sharded per class. Updates take the outer lock in shared mode
//! and then the class's own mutex, so samples for different classes are
//! accumulated in parallel while samples for the same class serialize.
//! [`SufficientStatistics::snapshot`] takes the outer lock exclusively and
//! therefore always sees a state between two complete updates.

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::config::FeatureModel;
use crate::error::{BayesError, Result};
use crate::index::{ClassSlot, FeatureSlot, Slot};
use crate::observation::Observation;

#[derive(Debug, Default)]
struct ClassCounts {
    samples: u64,
    features: AHashMap<FeatureSlot, f64>,
    mass: f64,
}

impl ClassCounts {
    /// Apply one weighted sample. Nothing is mutated unless every increment is valid.
    fn add(
        &mut self,
        feature_model: FeatureModel,
        observation: &Observation,
        multiplicity: u64,
    ) -> Result<()> {
        let samples = self.samples.checked_add(multiplicity).ok_or_else(|| {
            BayesError::invalid_observation("sample count overflows for this class")
        })?;

        let weight = multiplicity as f64;
        let increments: Vec<(FeatureSlot, f64)> = observation
            .iter()
            .filter_map(|(slot, value)| {
                let increment = match feature_model {
                    FeatureModel::Multinomial => value * weight,
                    FeatureModel::Bernoulli if value > 0.0 => weight,
                    FeatureModel::Bernoulli => 0.0,
                };
                (increment > 0.0).then_some((slot, increment))
            })
            .collect();

        let added: f64 = increments.iter().map(|entry| entry.1).sum();
        let mass = self.mass + added;
        if !mass.is_finite() {
            return Err(BayesError::invalid_observation(
                "feature counts overflow for this class",
            ));
        }

        for (slot, increment) in increments {
            *self.features.entry(slot).or_insert(0.0) += increment;
        }
        self.samples = samples;
        self.mass = mass;
        Ok(())
    }

    fn snapshot(&self) -> ClassSnapshot {
        let mut features: Vec<(FeatureSlot, f64)> =
            self.features.iter().map(|(&slot, &count)| (slot, count)).collect();
        features.sort_by_key(|entry| entry.0);
        ClassSnapshot {
            samples: self.samples,
            mass: self.mass,
            features,
        }
    }
}

/// Counts of a single class at snapshot time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSnapshot {
    /// Number of samples, multiplicity included.
    pub samples: u64,
    /// Sum of all feature counts of the class.
    pub mass: f64,
    /// Non-zero feature counts, sorted by slot.
    pub features: Vec<(FeatureSlot, f64)>,
}

/// A consistent, owned copy of the accumulated statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Feature semantics the counts were accumulated under.
    pub feature_model: FeatureModel,
    /// Per-class counts, indexed by class slot.
    pub classes: Vec<ClassSnapshot>,
}

impl StatisticsSnapshot {
    /// Sum of sample counts over all classes.
    pub fn total_samples(&self) -> u64 {
        self.classes.iter().map(|class| class.samples).sum()
    }

    /// Highest feature slot referenced by any class, plus one.
    pub fn feature_extent(&self) -> usize {
        self.classes
            .iter()
            .filter_map(|class| class.features.last())
            .map(|(slot, _)| slot.index() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Thread-safe accumulator of per-class training evidence.
#[derive(Debug)]
pub struct SufficientStatistics {
    feature_model: FeatureModel,
    classes: RwLock<Vec<Mutex<ClassCounts>>>,
}

impl SufficientStatistics {
    /// Create an empty accumulator for the given feature model.
    pub fn new(feature_model: FeatureModel) -> Self {
        SufficientStatistics {
            feature_model,
            classes: RwLock::new(Vec::new()),
        }
    }

    /// Restore an accumulator from a snapshot, checking its invariants.
    pub fn from_snapshot(snapshot: StatisticsSnapshot) -> Result<Self> {
        let mut classes = Vec::with_capacity(snapshot.classes.len());
        for (slot, class) in snapshot.classes.into_iter().enumerate() {
            let mut features = AHashMap::with_capacity(class.features.len());
            let mut mass = 0.0;
            for (feature, count) in class.features {
                if !count.is_finite() || count < 0.0 {
                    return Err(BayesError::invalid_observation(format!(
                        "class {slot}: invalid count {count} for feature {}",
                        feature.0
                    )));
                }
                if features.insert(feature, count).is_some() {
                    return Err(BayesError::invalid_observation(format!(
                        "class {slot}: feature {} listed twice",
                        feature.0
                    )));
                }
                mass += count;
            }
            if (mass - class.mass).abs() > 1e-9 * mass.max(1.0) {
                return Err(BayesError::invalid_observation(format!(
                    "class {slot}: stored mass {} does not match feature counts {mass}",
                    class.mass
                )));
            }
            classes.push(Mutex::new(ClassCounts {
                samples: class.samples,
                features,
                mass,
            }));
        }

        Ok(SufficientStatistics {
            feature_model: snapshot.feature_model,
            classes: RwLock::new(classes),
        })
    }

    /// Feature semantics of this accumulator.
    pub fn feature_model(&self) -> FeatureModel {
        self.feature_model
    }

    /// Add one observation for `class`, weighted by `multiplicity`.
    ///
    /// The class's sample count grows by `multiplicity` and each referenced
    /// feature count by `multiplicity * value` (multinomial) or by
    /// `multiplicity` when the feature is present (Bernoulli).
    pub fn add_sample(
        &self,
        class: ClassSlot,
        observation: &Observation,
        multiplicity: u64,
    ) -> Result<()> {
        if multiplicity == 0 {
            return Err(BayesError::invalid_observation("multiplicity must be > 0"));
        }

        {
            let classes = self.classes.read();
            if let Some(counts) = classes.get(class.index()) {
                return counts
                    .lock()
                    .add(self.feature_model, observation, multiplicity);
            }
        }

        let mut classes = self.classes.write();
        while classes.len() <= class.index() {
            classes.push(Mutex::new(ClassCounts::default()));
        }
        classes[class.index()]
            .get_mut()
            .add(self.feature_model, observation, multiplicity)
    }

    /// Number of class shards (the highest trained class slot plus one).
    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }

    /// Samples accumulated for `class`.
    pub fn sample_count(&self, class: ClassSlot) -> u64 {
        self.classes
            .read()
            .get(class.index())
            .map(|counts| counts.lock().samples)
            .unwrap_or(0)
    }

    /// Count accumulated for `feature` within `class`.
    pub fn feature_count(&self, class: ClassSlot, feature: FeatureSlot) -> f64 {
        self.classes
            .read()
            .get(class.index())
            .and_then(|counts| counts.lock().features.get(&feature).copied())
            .unwrap_or(0.0)
    }

    /// Total feature mass of `class`.
    pub fn feature_mass(&self, class: ClassSlot) -> f64 {
        self.classes
            .read()
            .get(class.index())
            .map(|counts| counts.lock().mass)
            .unwrap_or(0.0)
    }

    /// Samples accumulated over all classes.
    pub fn total_samples(&self) -> u64 {
        self.classes
            .read()
            .iter()
            .map(|counts| counts.lock().samples)
            .sum()
    }

    /// Copy the current counts.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let classes = self.classes.write();
        StatisticsSnapshot {
            feature_model: self.feature_model,
            classes: classes.iter().map(|counts| counts.lock().snapshot()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn observation(pairs: &[(u32, f64)]) -> Observation {
        Observation::from_counts(pairs.iter().map(|&(slot, v)| (FeatureSlot(slot), v))).unwrap()
    }

    #[test]
    fn test_multinomial_accumulation() {
        let stats = SufficientStatistics::new(FeatureModel::Multinomial);
        stats
            .add_sample(ClassSlot(0), &observation(&[(0, 2.0), (1, 1.0)]), 1)
            .unwrap();
        stats
            .add_sample(ClassSlot(0), &observation(&[(1, 1.0)]), 3)
            .unwrap();

        assert_eq!(stats.sample_count(ClassSlot(0)), 4);
        assert_eq!(stats.feature_count(ClassSlot(0), FeatureSlot(0)), 2.0);
        assert_eq!(stats.feature_count(ClassSlot(0), FeatureSlot(1)), 4.0);
        assert_eq!(stats.feature_mass(ClassSlot(0)), 6.0);
    }

    #[test]
    fn test_bernoulli_counts_presence() {
        let stats = SufficientStatistics::new(FeatureModel::Bernoulli);
        stats
            .add_sample(ClassSlot(0), &observation(&[(0, 5.0), (1, 0.0)]), 2)
            .unwrap();

        assert_eq!(stats.feature_count(ClassSlot(0), FeatureSlot(0)), 2.0);
        assert_eq!(stats.feature_count(ClassSlot(0), FeatureSlot(1)), 0.0);
        assert_eq!(stats.feature_mass(ClassSlot(0)), 2.0);
    }

    #[test]
    fn test_zero_multiplicity_is_rejected() {
        let stats = SufficientStatistics::new(FeatureModel::Multinomial);
        let result = stats.add_sample(ClassSlot(0), &observation(&[(0, 1.0)]), 0);
        assert!(matches!(result, Err(BayesError::InvalidObservation(_))));
        assert_eq!(stats.total_samples(), 0);
    }

    #[test]
    fn test_sparse_class_slots_are_padded() {
        let stats = SufficientStatistics::new(FeatureModel::Multinomial);
        stats.add_sample(ClassSlot(2), &Observation::new(), 1).unwrap();

        assert_eq!(stats.class_count(), 3);
        assert_eq!(stats.sample_count(ClassSlot(0)), 0);
        assert_eq!(stats.sample_count(ClassSlot(2)), 1);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let stats = SufficientStatistics::new(FeatureModel::Multinomial);
        stats
            .add_sample(ClassSlot(1), &observation(&[(3, 1.0), (0, 2.0)]), 1)
            .unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_samples(), 1);
        assert_eq!(snapshot.feature_extent(), 4);
        assert_eq!(
            snapshot.classes[1].features,
            vec![(FeatureSlot(0), 2.0), (FeatureSlot(3), 1.0)]
        );

        let restored = SufficientStatistics::from_snapshot(snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_from_snapshot_rejects_inconsistent_mass() {
        let snapshot = StatisticsSnapshot {
            feature_model: FeatureModel::Multinomial,
            classes: vec![ClassSnapshot {
                samples: 1,
                mass: 10.0,
                features: vec![(FeatureSlot(0), 1.0)],
            }],
        };
        assert!(SufficientStatistics::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let stats = Arc::new(SufficientStatistics::new(FeatureModel::Multinomial));
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    let obs = observation(&[(0, 1.0), (t, 1.0)]);
                    for _ in 0..500 {
                        stats.add_sample(ClassSlot(t % 2), &obs, 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.total_samples(), 4000);
        assert_eq!(stats.sample_count(ClassSlot(0)), 2000);
        // Thread 0 hits slot 0 twice per sample.
        assert_eq!(stats.feature_count(ClassSlot(0), FeatureSlot(0)), 2500.0);
        assert_eq!(stats.feature_count(ClassSlot(1), FeatureSlot(0)), 2000.0);
    }
}
