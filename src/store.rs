//! Versioned model snapshot publication.
//!
//! The store holds the current `Arc<Model>`. Publishing swaps the pointer
//! under a short write lock; predictors that already took a reference keep
//! scoring against their own snapshot until they drop it. Versions only move
//! forward: a snapshot older than the current one is refused.

use std::sync::Arc;

use log::{info, warn};
use parking_lot::RwLock;

use crate::index::Key;
use crate::model::Model;

/// Holds the latest published model snapshot.
#[derive(Debug)]
pub struct ModelStore<L> {
    current: RwLock<Option<Arc<Model<L>>>>,
}

impl<L> Default for ModelStore<L> {
    fn default() -> Self {
        ModelStore {
            current: RwLock::new(None),
        }
    }
}

impl<L: Key> ModelStore<L> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `model` as the current snapshot, returning the one it replaced.
    ///
    /// Fails with the refused model if its version is not newer than the
    /// current one.
    pub fn publish(
        &self,
        model: Arc<Model<L>>,
    ) -> std::result::Result<Option<Arc<Model<L>>>, Arc<Model<L>>> {
        let mut current = self.current.write();
        if let Some(existing) = current.as_ref()
            && existing.version() >= model.version()
        {
            warn!(
                "refusing to publish model v{}: v{} is already current",
                model.version(),
                existing.version()
            );
            return Err(model);
        }
        info!(
            "publishing model v{} ({} classes, {} features)",
            model.version(),
            model.class_count(),
            model.vocab_size()
        );
        Ok(current.replace(model))
    }

    /// The current snapshot, if any has been published.
    pub fn current(&self) -> Option<Arc<Model<L>>> {
        self.current.read().clone()
    }

    /// Version of the current snapshot.
    pub fn version(&self) -> Option<u64> {
        self.current.read().as_ref().map(|model| model.version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureModel;
    use crate::index::FeatureSlot;
    use crate::smoothing::Lidstone;
    use crate::statistics::{ClassSnapshot, StatisticsSnapshot};

    fn model(version: u64, count: f64) -> Arc<Model<String>> {
        let snapshot = StatisticsSnapshot {
            feature_model: FeatureModel::Multinomial,
            classes: vec![ClassSnapshot {
                samples: 1,
                mass: count,
                features: vec![(FeatureSlot(0), count)],
            }],
        };
        Arc::new(
            Model::build(&snapshot, 1, &["only".to_string()], &Lidstone::laplace(), version)
                .unwrap(),
        )
    }

    #[test]
    fn test_publish_swaps_snapshot() {
        let store: ModelStore<String> = ModelStore::new();
        assert!(store.current().is_none());

        assert!(store.publish(model(1, 1.0)).unwrap().is_none());
        let held = store.current().unwrap();

        let replaced = store.publish(model(2, 5.0)).unwrap().unwrap();
        assert_eq!(replaced.version(), 1);
        assert_eq!(store.version(), Some(2));

        // The old reference is untouched by the swap.
        assert_eq!(held.version(), 1);
        assert_eq!(held.vocab_size(), 1);
    }

    #[test]
    fn test_older_snapshot_is_refused() {
        let store: ModelStore<String> = ModelStore::new();
        store.publish(model(2, 5.0)).unwrap();

        let refused = store.publish(model(1, 1.0)).unwrap_err();
        assert_eq!(refused.version(), 1);
        assert_eq!(store.version(), Some(2));

        // Same version again is not newer either.
        assert!(store.publish(model(2, 1.0)).is_err());
        assert!(store.publish(model(3, 1.0)).is_ok());
        assert_eq!(store.version(), Some(3));
    }
}
