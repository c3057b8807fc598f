//! The classifier facade.
//!
//! [`NaiveBayes`] owns the shared feature index and class registry, the
//! trainer and the published model snapshot. It is `Sync`: training,
//! rebuilding and classification can all be called from several threads
//! through `&self`.
//!
//! # Examples
//!
//! ```
//! use fast_bayes::classifier::NaiveBayes;
//! use fast_bayes::config::ClassifierConfig;
//!
//! let nb: NaiveBayes = NaiveBayes::new(ClassifierConfig::default()).unwrap();
//! nb.train("spam", [("tokenA", 2.0), ("tokenB", 1.0)], 1).unwrap();
//! nb.train("ham", [("tokenB", 3.0)], 1).unwrap();
//! nb.refresh().unwrap();
//!
//! let ranking = nb.classify([("tokenA", 1.0)]).unwrap();
//! assert_eq!(ranking.best().unwrap().label, "spam");
//! ```

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use log::warn;

use crate::config::ClassifierConfig;
use crate::error::{BayesError, Result};
use crate::index::{ClassRegistry, ClassSlot, FeatureIndex, FeatureSlot, Key};
use crate::model::Model;
use crate::observation::Observation;
use crate::predictor::{Predictor, Ranking};
use crate::smoothing::{Lidstone, SmoothingPolicy};
use crate::statistics::SufficientStatistics;
use crate::store::ModelStore;
use crate::trainer::Trainer;

/// A Naive Bayes classifier over feature keys `F` and class labels `L`.
#[derive(Debug)]
pub struct NaiveBayes<F = String, L = String> {
    config: ClassifierConfig,
    policy: Arc<dyn SmoothingPolicy>,
    trainer: Trainer<F, L>,
    store: ModelStore<L>,
}

impl<F: Key, L: Key> NaiveBayes<F, L> {
    /// Create a classifier using Lidstone smoothing with the configured alpha.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let policy = Arc::new(Lidstone::new(config.alpha)?);
        Self::with_policy(config, policy)
    }

    /// Create a classifier with a custom smoothing policy.
    ///
    /// `config.alpha` is ignored in favor of the policy. The policy is not part
    /// of a [`TrainingState`](crate::persist::TrainingState); pass it again to
    /// [`TrainingState::restore_with_policy`](crate::persist::TrainingState::restore_with_policy).
    pub fn with_policy(config: ClassifierConfig, policy: Arc<dyn SmoothingPolicy>) -> Result<Self> {
        config.validate()?;
        let trainer = Trainer::new(
            Arc::new(FeatureIndex::new()),
            Arc::new(ClassRegistry::new()),
            config.feature_model,
        );
        Ok(NaiveBayes {
            config,
            policy,
            trainer,
            store: ModelStore::new(),
        })
    }

    /// Assemble a classifier from restored components, smoothing with `config.alpha`.
    pub fn from_parts(
        config: ClassifierConfig,
        features: FeatureIndex<F>,
        classes: ClassRegistry<L>,
        statistics: SufficientStatistics,
    ) -> Result<Self> {
        config.validate()?;
        let policy = Arc::new(Lidstone::new(config.alpha)?);
        Self::from_parts_with_policy(config, policy, features, classes, statistics)
    }

    /// Assemble a classifier from restored components and a custom smoothing policy.
    pub fn from_parts_with_policy(
        config: ClassifierConfig,
        policy: Arc<dyn SmoothingPolicy>,
        features: FeatureIndex<F>,
        classes: ClassRegistry<L>,
        statistics: SufficientStatistics,
    ) -> Result<Self> {
        config.validate()?;
        if statistics.feature_model() != config.feature_model {
            return Err(BayesError::invalid_config(format!(
                "statistics were accumulated as {:?} but the configuration asks for {:?}",
                statistics.feature_model(),
                config.feature_model
            )));
        }
        if statistics.class_count() > classes.len() {
            return Err(BayesError::invalid_config(format!(
                "statistics cover {} classes but only {} labels are registered",
                statistics.class_count(),
                classes.len()
            )));
        }
        if statistics.snapshot().feature_extent() > features.len() {
            return Err(BayesError::invalid_config(
                "statistics reference features missing from the index",
            ));
        }

        let trainer = Trainer::from_parts(Arc::new(features), Arc::new(classes), statistics);
        Ok(NaiveBayes {
            config,
            policy,
            trainer,
            store: ModelStore::new(),
        })
    }

    /// The configuration this classifier was created with.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// The shared feature index.
    pub fn feature_index(&self) -> &Arc<FeatureIndex<F>> {
        self.trainer.features()
    }

    /// The shared class registry.
    pub fn class_registry(&self) -> &Arc<ClassRegistry<L>> {
        self.trainer.classes()
    }

    /// The accumulated statistics.
    pub fn statistics(&self) -> &SufficientStatistics {
        self.trainer.statistics()
    }

    /// Slot of a feature key, allocating it if new.
    pub fn resolve_feature<Q>(&self, key: &Q) -> Result<FeatureSlot>
    where
        F: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = F> + ?Sized,
    {
        self.feature_index().resolve(key)
    }

    /// Slot of a class label, allocating it if new.
    pub fn resolve_class<Q>(&self, label: &Q) -> Result<ClassSlot>
    where
        L: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = L> + ?Sized,
    {
        self.class_registry().resolve(label)
    }

    /// Train one keyed observation. See [`Trainer::train`].
    pub fn train<'a, C, Q, I>(&self, label: &C, features: I, multiplicity: u64) -> Result<()>
    where
        L: Borrow<C>,
        C: Hash + Eq + ToOwned<Owned = L> + ?Sized,
        F: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = F> + ?Sized + 'a,
        I: IntoIterator<Item = (&'a Q, f64)>,
    {
        self.trainer.train(label, features, multiplicity)
    }

    /// Train a slot-level observation. See [`Trainer::train_observation`].
    pub fn train_observation(
        &self,
        class: ClassSlot,
        observation: &Observation,
        multiplicity: u64,
    ) -> Result<()> {
        self.trainer.train_observation(class, observation, multiplicity)
    }

    /// Whether training happened since the last successful build.
    pub fn needs_rebuild(&self) -> bool {
        self.trainer.needs_rebuild()
    }

    /// Build a snapshot with the configured smoothing policy, without publishing it.
    pub fn build_model(&self) -> Result<Arc<Model<L>>> {
        self.build_model_with(self.policy.as_ref())
    }

    /// Build a snapshot with another smoothing policy, without publishing it.
    pub fn build_model_with(&self, policy: &dyn SmoothingPolicy) -> Result<Arc<Model<L>>> {
        self.trainer.build_model(policy).map(Arc::new)
    }

    /// Make `model` the snapshot used by [`NaiveBayes::classify`].
    ///
    /// Returns the replaced snapshot, or the refused `model` if a snapshot with
    /// the same or a newer version is already current. Later builds are
    /// numbered above `model`, so a loaded snapshot does not block them.
    pub fn publish(
        &self,
        model: Arc<Model<L>>,
    ) -> std::result::Result<Option<Arc<Model<L>>>, Arc<Model<L>>> {
        self.trainer.reserve_version(model.version());
        self.store.publish(model)
    }

    /// Rebuild and publish if training happened since the last build.
    ///
    /// Returns the snapshot that is current afterwards.
    pub fn refresh(&self) -> Result<Arc<Model<L>>> {
        if !self.needs_rebuild()
            && let Some(model) = self.store.current()
        {
            return Ok(model);
        }
        let model = self.build_model()?;
        match self.store.publish(Arc::clone(&model)) {
            Ok(_) => Ok(model),
            // A concurrent refresh already published a newer build.
            Err(refused) => Ok(self.store.current().unwrap_or(refused)),
        }
    }

    /// The currently published snapshot.
    pub fn current_model(&self) -> Option<Arc<Model<L>>> {
        self.store.current()
    }

    /// Convert keyed features into an observation without growing the index.
    ///
    /// Keys the index has never seen are dropped.
    pub fn observation<'a, Q, I>(&self, features: I) -> Result<Observation>
    where
        F: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = (&'a Q, f64)>,
    {
        self.keyed_observation(features).map(|(observation, _)| observation)
    }

    /// Like [`NaiveBayes::observation`], also counting the features supplied.
    fn keyed_observation<'a, Q, I>(&self, features: I) -> Result<(Observation, usize)>
    where
        F: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = (&'a Q, f64)>,
    {
        let index = self.feature_index();
        let mut known = Vec::new();
        let mut supplied = 0usize;
        let mut unknown = 0usize;
        for (key, value) in features {
            supplied += 1;
            match index.get(key) {
                Some(slot) => known.push((slot, value)),
                None => {
                    // Still reject malformed values for unknown keys.
                    if !value.is_finite() || value < 0.0 {
                        return Err(BayesError::invalid_observation(format!(
                            "feature values must be finite and >= 0, got {value}"
                        )));
                    }
                    unknown += 1;
                }
            }
        }
        let observation = Observation::from_counts(known)?;
        if unknown > 0 && observation.is_empty() {
            warn!("none of {unknown} features are known to the index");
        }
        Ok((observation, supplied))
    }

    /// A predictor bound to the current snapshot.
    pub fn predictor(&self) -> Result<Predictor<L>> {
        let model = self.store.current().ok_or_else(|| {
            BayesError::model_not_built("no model has been published; call refresh() first")
        })?;
        Ok(Predictor::new(model, self.config.empty_observation))
    }

    /// Rank classes for keyed features against the current snapshot.
    ///
    /// Unknown keys are skipped. Only input with no features at all counts as
    /// empty for [`EmptyObservationPolicy::Reject`](crate::config::EmptyObservationPolicy::Reject).
    pub fn classify<'a, Q, I>(&self, features: I) -> Result<Ranking<L>>
    where
        F: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = (&'a Q, f64)>,
    {
        let (observation, supplied) = self.keyed_observation(features)?;
        self.predictor()?.rank(&observation, supplied == 0)
    }

    /// Rank classes for a slot-level observation against a specific snapshot.
    pub fn classify_with(
        &self,
        model: &Arc<Model<L>>,
        observation: &Observation,
    ) -> Result<Ranking<L>> {
        Predictor::new(Arc::clone(model), self.config.empty_observation).classify(observation)
    }

    /// Rank many slot-level observations in parallel against the current snapshot.
    pub fn classify_batch(&self, observations: &[Observation]) -> Result<Vec<Result<Ranking<L>>>> {
        Ok(self.predictor()?.classify_batch(observations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmptyObservationPolicy, FeatureModel};

    fn spam_ham() -> NaiveBayes {
        let nb = NaiveBayes::new(ClassifierConfig::default()).unwrap();
        nb.train("spam", [("tokenA", 2.0), ("tokenB", 1.0)], 1).unwrap();
        nb.train("ham", [("tokenB", 3.0)], 1).unwrap();
        nb
    }

    #[test]
    fn test_classify_requires_published_model() {
        let nb = spam_ham();
        let result = nb.classify([("tokenA", 1.0)]);
        assert!(matches!(result, Err(BayesError::ModelNotBuilt(_))));
    }

    #[test]
    fn test_refresh_publishes_once() {
        let nb = spam_ham();
        let first = nb.refresh().unwrap();
        let again = nb.refresh().unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        nb.train("ham", [("tokenC", 1.0)], 1).unwrap();
        let rebuilt = nb.refresh().unwrap();
        assert_eq!(rebuilt.version(), first.version() + 1);
        assert_eq!(rebuilt.vocab_size(), 3);
    }

    #[test]
    fn test_observation_does_not_grow_index() {
        let nb = spam_ham();
        let observation = nb.observation([("tokenA", 1.0), ("never-seen", 4.0)]).unwrap();
        assert_eq!(observation.len(), 1);
        assert_eq!(nb.feature_index().len(), 2);

        assert!(nb.observation([("never-seen", -1.0)]).is_err());
    }

    #[test]
    fn test_classify_with_older_snapshot() {
        let nb = spam_ham();
        let old = nb.refresh().unwrap();
        for _ in 0..10 {
            nb.train("ham", [("tokenA", 5.0)], 1).unwrap();
        }
        nb.refresh().unwrap();

        let a = Observation::from_counts([(FeatureSlot(0), 1.0)]).unwrap();
        let against_old = nb.classify_with(&old, &a).unwrap();
        let against_new = nb.classify([("tokenA", 1.0)]).unwrap();
        assert_eq!(against_old.best().unwrap().label, "spam");
        assert_eq!(against_new.best().unwrap().label, "ham");
    }

    #[test]
    fn test_from_parts_checks_feature_model() {
        let config = ClassifierConfig::default().with_feature_model(FeatureModel::Bernoulli);
        let result: Result<NaiveBayes> = NaiveBayes::from_parts(
            config,
            FeatureIndex::new(),
            ClassRegistry::new(),
            SufficientStatistics::new(FeatureModel::Multinomial),
        );
        assert!(matches!(result, Err(BayesError::InvalidConfig(_))));
    }

    #[test]
    fn test_reject_policy_flows_to_predictor() {
        let config = ClassifierConfig::default().with_empty_observation(EmptyObservationPolicy::Reject);
        let nb: NaiveBayes = NaiveBayes::new(config).unwrap();
        nb.train("spam", [("tokenA", 1.0)], 1).unwrap();
        nb.refresh().unwrap();

        let result = nb.classify(std::iter::empty::<(&str, f64)>());
        assert!(matches!(result, Err(BayesError::EmptyObservation)));
    }

    #[test]
    fn test_reject_policy_accepts_unknown_keys() {
        let config = ClassifierConfig::default().with_empty_observation(EmptyObservationPolicy::Reject);
        let nb: NaiveBayes = NaiveBayes::new(config).unwrap();
        nb.train("spam", [("tokenA", 1.0)], 1).unwrap();
        nb.refresh().unwrap();

        let ranking = nb.classify([("never-seen", 1.0)]).unwrap();
        assert_eq!(ranking.best().unwrap().label, "spam");
    }

    #[test]
    fn test_refresh_keeps_newest_snapshot() {
        let nb = spam_ham();
        let v1 = nb.build_model().unwrap();
        nb.train("eggs", [("tokenC", 1.0)], 1).unwrap();
        let v2 = nb.build_model().unwrap();

        assert!(nb.publish(Arc::clone(&v2)).is_ok());
        let refused = nb.publish(Arc::clone(&v1)).unwrap_err();
        assert_eq!(refused.version(), v1.version());

        let current = nb.refresh().unwrap();
        assert_eq!(current.version(), v2.version());
        assert_eq!(current.class_count(), 3);
    }

    #[test]
    fn test_builds_number_above_published_model() {
        let source = spam_ham();
        for _ in 0..5 {
            source.build_model().unwrap();
        }
        let loaded = source.build_model().unwrap();
        assert_eq!(loaded.version(), 6);

        let nb = spam_ham();
        assert!(nb.publish(loaded).is_ok());

        // Training happened, so refresh builds; the build must not be refused.
        let rebuilt = nb.refresh().unwrap();
        assert_eq!(rebuilt.version(), 7);
        assert_eq!(nb.current_model().unwrap().version(), 7);
    }

    #[test]
    fn test_custom_policy() {
        let nb: NaiveBayes =
            NaiveBayes::with_policy(ClassifierConfig::default(), Arc::new(Lidstone::new(0.01).unwrap()))
                .unwrap();
        nb.train("spam", [("tokenA", 1.0)], 1).unwrap();
        assert_eq!(nb.build_model().unwrap().alpha(), 0.01);
    }
}
