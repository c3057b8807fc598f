//! Sparse feature observations.
//!
//! An [`Observation`] maps feature slots to non-negative, finite values: token
//! counts in multinomial mode, presence flags in Bernoulli mode (`> 0` present,
//! `0` explicitly absent). Entries are kept sorted by slot and duplicate slots
//! are merged by summing, so every slot appears at most once.
//!
//! Values are validated as they enter, which makes an `Observation` valid by
//! construction, including one obtained through deserialization.

use serde::{Deserialize, Serialize};

use crate::error::{BayesError, Result};
use crate::index::FeatureSlot;

/// A sparse mapping from feature slot to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(FeatureSlot, f64)>", into = "Vec<(FeatureSlot, f64)>")]
pub struct Observation {
    entries: Vec<(FeatureSlot, f64)>,
}

impl Observation {
    /// Create an empty observation.
    pub fn new() -> Self {
        Observation {
            entries: Vec::new(),
        }
    }

    /// Build an observation from `(slot, value)` pairs.
    pub fn from_counts<I>(counts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (FeatureSlot, f64)>,
    {
        let mut pairs: Vec<(FeatureSlot, f64)> = Vec::new();
        for (slot, value) in counts {
            check_value(slot, value)?;
            pairs.push((slot, value));
        }
        // Stable, so merged values add up in input order.
        pairs.sort_by_key(|entry| entry.0);

        let mut entries: Vec<(FeatureSlot, f64)> = Vec::with_capacity(pairs.len());
        for (slot, value) in pairs {
            match entries.last_mut() {
                Some(last) if last.0 == slot => {
                    last.1 = merge(slot, last.1, value)?;
                }
                _ => entries.push((slot, value)),
            }
        }
        Ok(Observation { entries })
    }

    /// Build a presence observation: every listed slot gets value `1.0`.
    pub fn from_presence<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = FeatureSlot>,
    {
        let mut entries: Vec<(FeatureSlot, f64)> =
            slots.into_iter().map(|slot| (slot, 1.0)).collect();
        entries.sort_by_key(|entry| entry.0);
        entries.dedup_by_key(|entry| entry.0);
        Observation { entries }
    }

    /// Add `value` to the entry of `slot`.
    pub fn add(&mut self, slot: FeatureSlot, value: f64) -> Result<()> {
        check_value(slot, value)?;

        match self.entries.binary_search_by_key(&slot, |entry| entry.0) {
            Ok(pos) => {
                self.entries[pos].1 = merge(slot, self.entries[pos].1, value)?;
            }
            Err(pos) => self.entries.insert(pos, (slot, value)),
        }
        Ok(())
    }

    /// Builder-style variant of [`Observation::add`].
    pub fn with(mut self, slot: FeatureSlot, value: f64) -> Result<Self> {
        self.add(slot, value)?;
        Ok(self)
    }

    /// Value recorded for `slot`, if any.
    pub fn get(&self, slot: FeatureSlot) -> Option<f64> {
        self.entries
            .binary_search_by_key(&slot, |entry| entry.0)
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// Iterate over `(slot, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureSlot, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of distinct slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the observation holds no feature at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|entry| entry.1).sum()
    }
}

fn merge(slot: FeatureSlot, current: f64, value: f64) -> Result<f64> {
    let merged = current + value;
    if !merged.is_finite() {
        return Err(BayesError::invalid_observation(format!(
            "value for slot {} overflows",
            slot.0
        )));
    }
    Ok(merged)
}

fn check_value(slot: FeatureSlot, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(BayesError::invalid_observation(format!(
            "non-finite value {value} for slot {}",
            slot.0
        )));
    }
    if value < 0.0 {
        return Err(BayesError::invalid_observation(format!(
            "negative value {value} for slot {}",
            slot.0
        )));
    }
    Ok(())
}

impl TryFrom<Vec<(FeatureSlot, f64)>> for Observation {
    type Error = BayesError;

    fn try_from(entries: Vec<(FeatureSlot, f64)>) -> Result<Self> {
        Observation::from_counts(entries)
    }
}

impl From<Observation> for Vec<(FeatureSlot, f64)> {
    fn from(observation: Observation) -> Self {
        observation.entries
    }
}
