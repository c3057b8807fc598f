//! Serializable forms of models and training state.
//!
//! The storage medium is up to the caller; this module only fixes what must
//! round-trip. A [`Model`] serializes as-is (vocabulary size, classes, priors
//! and the full log-likelihood table) and is validated again when loaded. A
//! [`TrainingState`] carries the key orders and raw counts, from which a
//! classifier can resume training.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::classifier::NaiveBayes;
use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::index::{ClassRegistry, FeatureIndex, Key};
use crate::model::Model;
use crate::smoothing::SmoothingPolicy;
use crate::statistics::{StatisticsSnapshot, SufficientStatistics};

/// Everything needed to resume training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState<F, L> {
    /// Classifier configuration.
    pub config: ClassifierConfig,
    /// Feature keys in slot order.
    pub features: Vec<F>,
    /// Class labels in slot order.
    pub classes: Vec<L>,
    /// Accumulated counts.
    pub statistics: StatisticsSnapshot,
}

impl<F, L> TrainingState<F, L>
where
    F: Key + Serialize + DeserializeOwned,
    L: Key + Serialize + DeserializeOwned,
{
    /// Capture the state of `classifier`.
    ///
    /// Statistics are snapshotted first so that every slot they reference is
    /// covered by the key lists read afterwards.
    pub fn capture(classifier: &NaiveBayes<F, L>) -> Self {
        let statistics = classifier.statistics().snapshot();
        TrainingState {
            config: classifier.config().clone(),
            features: classifier.feature_index().keys(),
            classes: classifier.class_registry().keys(),
            statistics,
        }
    }

    /// Rebuild a classifier from this state, smoothing with `config.alpha`.
    pub fn restore(self) -> Result<NaiveBayes<F, L>> {
        NaiveBayes::from_parts(
            self.config,
            FeatureIndex::from_keys(self.features)?,
            ClassRegistry::from_keys(self.classes)?,
            SufficientStatistics::from_snapshot(self.statistics)?,
        )
    }

    /// Rebuild a classifier from this state with a custom smoothing policy.
    ///
    /// Policies are not serialized; a classifier created with
    /// [`NaiveBayes::with_policy`] needs its policy passed again here.
    pub fn restore_with_policy(
        self,
        policy: Arc<dyn SmoothingPolicy>,
    ) -> Result<NaiveBayes<F, L>> {
        NaiveBayes::from_parts_with_policy(
            self.config,
            policy,
            FeatureIndex::from_keys(self.features)?,
            ClassRegistry::from_keys(self.classes)?,
            SufficientStatistics::from_snapshot(self.statistics)?,
        )
    }

    /// Serialize to JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json(true)?)?;
        Ok(())
    }

    /// Read from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Serialize a model snapshot to JSON.
pub fn model_to_json<L: Key + Serialize>(model: &Model<L>) -> Result<String> {
    Ok(serde_json::to_string(model)?)
}

/// Deserialize a model snapshot. Inconsistent tables are rejected.
pub fn model_from_json<L: Key + DeserializeOwned>(json: &str) -> Result<Model<L>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BayesError;
    use crate::observation::Observation;

    fn trained() -> NaiveBayes {
        let nb = NaiveBayes::new(ClassifierConfig::default()).unwrap();
        nb.train("spam", [("tokenA", 2.0), ("tokenB", 1.0)], 1).unwrap();
        nb.train("ham", [("tokenB", 3.0)], 1).unwrap();
        nb
    }

    #[test]
    fn test_training_state_roundtrip() {
        let nb = trained();
        let json = TrainingState::capture(&nb).to_json(false).unwrap();

        let restored = TrainingState::<String, String>::from_json(&json)
            .unwrap()
            .restore()
            .unwrap();
        assert!(restored.needs_rebuild());
        assert_eq!(restored.feature_index().keys(), nb.feature_index().keys());
        assert_eq!(restored.statistics().snapshot(), nb.statistics().snapshot());

        // Training continues where it left off.
        restored.train("ham", [("tokenC", 1.0)], 1).unwrap();
        assert_eq!(restored.feature_index().len(), 3);
    }

    #[test]
    fn test_model_roundtrip_preserves_scores() {
        let nb = trained();
        let model = nb.build_model().unwrap();
        let loaded: Model<String> = model_from_json(&model_to_json(&model).unwrap()).unwrap();

        assert_eq!(loaded.vocab_size(), model.vocab_size());
        assert_eq!(loaded.class_count(), model.class_count());
        assert_eq!(loaded.log_priors(), model.log_priors());

        let observation = Observation::from_counts([(crate::index::FeatureSlot(0), 1.0)]).unwrap();
        let before = nb.classify_with(&model, &observation).unwrap();
        let after = nb.classify_with(&std::sync::Arc::new(loaded), &observation).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_tampered_model_is_rejected() {
        let nb = trained();
        let model = nb.build_model().unwrap();
        let mut value: serde_json::Value = serde_json::to_value(model.as_ref()).unwrap();
        value["log_likelihood"].as_array_mut().unwrap().pop();

        let result = model_from_json::<String>(&value.to_string());
        match result {
            Err(BayesError::Json(e)) => assert!(e.to_string().contains("Degenerate model")),
            other => panic!("Expected JSON error, got {other:?}"),
        }
    }

    #[test]
    fn test_restore_with_custom_policy() {
        let policy = Arc::new(crate::smoothing::Lidstone::new(0.25).unwrap());
        let nb: NaiveBayes =
            NaiveBayes::with_policy(ClassifierConfig::default(), policy.clone()).unwrap();
        nb.train("spam", [("tokenA", 1.0)], 1).unwrap();
        let state = TrainingState::capture(&nb);

        let plain = state.clone().restore().unwrap();
        assert_eq!(plain.build_model().unwrap().alpha(), 1.0);

        let restored = state.restore_with_policy(policy).unwrap();
        assert_eq!(restored.build_model().unwrap().alpha(), 0.25);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        TrainingState::capture(&trained()).save(&path).unwrap();
        let state = TrainingState::<String, String>::load(&path).unwrap();
        assert_eq!(state.classes, vec!["spam", "ham"]);
    }
}
