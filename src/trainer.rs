//! Incremental training.
//!
//! The [`Trainer`] turns keyed training input into slot-level observations,
//! feeds them to the [`SufficientStatistics`] and keeps track of whether
//! anything was accumulated since the last model build. When to rebuild is up
//! to the caller; the trainer only answers [`Trainer::needs_rebuild`].

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};
use parking_lot::Mutex;

use crate::config::FeatureModel;
use crate::error::{BayesError, Result};
use crate::index::{ClassRegistry, ClassSlot, FeatureIndex, Key, Slot};
use crate::model::Model;
use crate::observation::Observation;
use crate::smoothing::SmoothingPolicy;
use crate::statistics::SufficientStatistics;

/// Accumulates labeled observations and builds model snapshots.
#[derive(Debug)]
pub struct Trainer<F, L> {
    features: Arc<FeatureIndex<F>>,
    classes: Arc<ClassRegistry<L>>,
    statistics: SufficientStatistics,
    /// Bumped once per accepted training call.
    generation: AtomicU64,
    /// Generation covered by the most recent successful build.
    built_generation: AtomicU64,
    /// Last model version handed out.
    last_version: AtomicU64,
    /// Orders snapshots and version numbers: a higher version never sees less data.
    snapshot_lock: Mutex<()>,
}

impl<F: Key, L: Key> Trainer<F, L> {
    /// Create a trainer with empty statistics.
    pub fn new(
        features: Arc<FeatureIndex<F>>,
        classes: Arc<ClassRegistry<L>>,
        feature_model: FeatureModel,
    ) -> Self {
        Self::from_parts(features, classes, SufficientStatistics::new(feature_model))
    }

    /// Create a trainer around existing statistics.
    pub fn from_parts(
        features: Arc<FeatureIndex<F>>,
        classes: Arc<ClassRegistry<L>>,
        statistics: SufficientStatistics,
    ) -> Self {
        // Restored statistics have never been built into a model.
        let generation = u64::from(statistics.total_samples() > 0);
        Trainer {
            features,
            classes,
            statistics,
            generation: AtomicU64::new(generation),
            built_generation: AtomicU64::new(0),
            last_version: AtomicU64::new(0),
            snapshot_lock: Mutex::new(()),
        }
    }

    /// The shared feature index.
    pub fn features(&self) -> &Arc<FeatureIndex<F>> {
        &self.features
    }

    /// The shared class registry.
    pub fn classes(&self) -> &Arc<ClassRegistry<L>> {
        &self.classes
    }

    /// The accumulated statistics.
    pub fn statistics(&self) -> &SufficientStatistics {
        &self.statistics
    }

    /// Train one keyed observation for `label`, weighted by `multiplicity`.
    ///
    /// Input is validated before any key is resolved, so a rejected call does
    /// not register the class label.
    pub fn train<'a, C, Q, I>(&self, label: &C, features: I, multiplicity: u64) -> Result<()>
    where
        L: Borrow<C>,
        C: Hash + Eq + ToOwned<Owned = L> + ?Sized,
        F: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = F> + ?Sized + 'a,
        I: IntoIterator<Item = (&'a Q, f64)>,
    {
        if multiplicity == 0 {
            return Err(BayesError::invalid_observation("multiplicity must be > 0"));
        }
        let features: Vec<(&Q, f64)> = features.into_iter().collect();
        if let Some((_, value)) = features
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(BayesError::invalid_observation(format!(
                "feature values must be finite and >= 0, got {value}"
            )));
        }
        // Bounds every merged value and every per-sample increment.
        let total: f64 = features.iter().map(|(_, value)| value).sum();
        if !(total * multiplicity as f64).is_finite() {
            return Err(BayesError::invalid_observation(
                "weighted feature values overflow",
            ));
        }

        let mut slots = Vec::with_capacity(features.len());
        for (key, value) in features {
            slots.push((self.features.resolve(key)?, value));
        }
        let observation = Observation::from_counts(slots)?;
        let class = self.classes.resolve(label)?;
        self.accumulate(class, &observation, multiplicity)
    }

    /// Train an observation already expressed in slots.
    ///
    /// The class slot and every feature slot must already be allocated.
    pub fn train_observation(
        &self,
        class: ClassSlot,
        observation: &Observation,
        multiplicity: u64,
    ) -> Result<()> {
        if class.index() >= self.classes.len() {
            return Err(BayesError::invalid_observation(format!(
                "class slot {} is not registered",
                class.0
            )));
        }
        let vocab_size = self.features.len();
        if let Some((slot, _)) = observation.iter().find(|(slot, _)| slot.index() >= vocab_size) {
            return Err(BayesError::invalid_observation(format!(
                "feature slot {} is not registered",
                slot.0
            )));
        }
        self.accumulate(class, observation, multiplicity)
    }

    fn accumulate(
        &self,
        class: ClassSlot,
        observation: &Observation,
        multiplicity: u64,
    ) -> Result<()> {
        self.statistics.add_sample(class, observation, multiplicity)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!(
            "trained class {} with {} features (x{multiplicity})",
            class.0,
            observation.len()
        );
        Ok(())
    }

    /// Whether training happened since the last successful build.
    pub fn needs_rebuild(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.built_generation.load(Ordering::SeqCst)
    }

    /// Number of accepted training calls.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Make sure later builds are numbered above `version`.
    pub fn reserve_version(&self, version: u64) {
        self.last_version.fetch_max(version, Ordering::SeqCst);
    }

    /// Build a new model snapshot from the current statistics.
    pub fn build_model(&self, policy: &dyn SmoothingPolicy) -> Result<Model<L>> {
        let (generation, snapshot, version) = {
            let _guard = self.snapshot_lock.lock();
            // Read before the snapshot: a concurrent update may land in the
            // model and still leave needs_rebuild set, never the reverse.
            let generation = self.generation.load(Ordering::SeqCst);
            let snapshot = self.statistics.snapshot();
            let version = self.last_version.fetch_add(1, Ordering::SeqCst) + 1;
            (generation, snapshot, version)
        };
        let vocab_size = self.features.len();
        let labels = self.classes.keys();

        let model = Model::build(&snapshot, vocab_size, &labels, policy, version)?;
        self.built_generation.fetch_max(generation, Ordering::SeqCst);

        info!(
            "built model v{version}: {} classes, {vocab_size} features, {} samples",
            model.class_count(),
            snapshot.total_samples()
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FeatureSlot;
    use crate::smoothing::Lidstone;

    fn trainer() -> Trainer<String, String> {
        Trainer::new(
            Arc::new(FeatureIndex::new()),
            Arc::new(ClassRegistry::new()),
            FeatureModel::Multinomial,
        )
    }

    #[test]
    fn test_train_resolves_keys() {
        let trainer = trainer();
        trainer.train("spam", [("a", 2.0), ("b", 1.0)], 1).unwrap();
        trainer.train("ham", [("b", 3.0)], 2).unwrap();

        assert_eq!(trainer.features().len(), 2);
        assert_eq!(trainer.classes().len(), 2);
        let ham = trainer.classes().get("ham").unwrap();
        assert_eq!(trainer.statistics().sample_count(ham), 2);
        assert_eq!(trainer.statistics().feature_count(ham, FeatureSlot(1)), 6.0);
    }

    #[test]
    fn test_rejected_call_leaves_registry_untouched() {
        let trainer = trainer();
        let result = trainer.train("spam", [("a", -1.0)], 1);
        assert!(matches!(result, Err(BayesError::InvalidObservation(_))));
        assert!(trainer.classes().is_empty());
        assert!(trainer.features().is_empty());

        assert!(trainer.train("spam", [("a", 1.0)], 0).is_err());
        assert!(trainer.classes().is_empty());
        assert!(!trainer.needs_rebuild());
    }

    #[test]
    fn test_overflowing_call_registers_nothing() {
        let trainer = trainer();
        let result = trainer.train("spam", [("a", f64::MAX), ("a", f64::MAX)], 1);
        assert!(matches!(result, Err(BayesError::InvalidObservation(_))));

        let result = trainer.train("spam", [("b", f64::MAX / 2.0)], 4);
        assert!(matches!(result, Err(BayesError::InvalidObservation(_))));

        assert!(trainer.features().is_empty());
        assert!(trainer.classes().is_empty());
        assert_eq!(trainer.generation(), 0);
    }

    #[test]
    fn test_needs_rebuild_tracks_training() {
        let trainer = trainer();
        assert!(!trainer.needs_rebuild());

        trainer.train("spam", [("a", 1.0)], 1).unwrap();
        assert!(trainer.needs_rebuild());

        let model = trainer.build_model(&Lidstone::laplace()).unwrap();
        assert_eq!(model.version(), 1);
        assert!(!trainer.needs_rebuild());

        trainer.train("ham", [("b", 1.0)], 1).unwrap();
        assert!(trainer.needs_rebuild());
        assert_eq!(trainer.build_model(&Lidstone::laplace()).unwrap().version(), 2);
    }

    #[test]
    fn test_failed_build_keeps_rebuild_flag() {
        let trainer = trainer();
        // A class with an empty observation: samples, but no vocabulary.
        trainer
            .train("spam", std::iter::empty::<(&str, f64)>(), 1)
            .unwrap();
        let result = trainer.build_model(&Lidstone::laplace());
        assert!(matches!(result, Err(BayesError::DegenerateModel(_))));
        assert!(trainer.needs_rebuild());
    }

    #[test]
    fn test_empty_training_set() {
        let trainer = trainer();
        let result = trainer.build_model(&Lidstone::laplace());
        assert!(matches!(result, Err(BayesError::EmptyTrainingSet)));
    }

    #[test]
    fn test_train_observation_checks_slots() {
        let trainer = trainer();
        let spam = trainer.classes().resolve("spam").unwrap();
        let a = trainer.features().resolve("a").unwrap();

        let good = Observation::from_counts([(a, 1.0)]).unwrap();
        trainer.train_observation(spam, &good, 1).unwrap();

        let unknown_feature = Observation::from_counts([(FeatureSlot(5), 1.0)]).unwrap();
        assert!(trainer.train_observation(spam, &unknown_feature, 1).is_err());
        assert!(trainer.train_observation(ClassSlot(3), &good, 1).is_err());
        assert_eq!(trainer.statistics().total_samples(), 1);
    }
}
