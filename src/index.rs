//! Append-only key to slot interners.
//!
//! [`FeatureIndex`] and [`ClassRegistry`] map caller-supplied keys (tokens,
//! categorical attributes, class labels) to dense integer slots. Slots are
//! assigned in first-seen order and never change or disappear, so a slot
//! handed out once stays valid for the lifetime of the index.
//!
//! Allocation is an insert-or-get under a [`parking_lot::RwLock`]: the common
//! "already known" case only takes the read lock, and the key vector and the
//! key map are updated under the same write lock, so a reader can never see a
//! slot whose key is not yet committed.
//!
//! # Examples
//!
//! ```
//! use fast_bayes::index::{FeatureIndex, FeatureSlot};
//!
//! let index: FeatureIndex<String> = FeatureIndex::new();
//! let viagra = index.resolve("viagra").unwrap();
//! let lunch = index.resolve("lunch").unwrap();
//!
//! assert_eq!(viagra, FeatureSlot(0));
//! assert_eq!(lunch, FeatureSlot(1));
//! assert_eq!(index.resolve("viagra").unwrap(), viagra);
//! assert_eq!(index.lookup(lunch), Some("lunch".to_string()));
//! ```

use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{BayesError, Result};

/// Bound shared by every feature key and class label type.
///
/// Blanket-implemented, so `String`, integers and plain enums qualify as-is.
pub trait Key: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> Key for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// A dense slot handed out by an [`Interner`].
pub trait Slot: Copy + Eq + Ord + Debug + Send + Sync + 'static {
    /// Build a slot from its raw position.
    fn from_raw(raw: u32) -> Self;

    /// Raw position of the slot.
    fn raw(self) -> u32;

    /// Position of the slot as a vector index.
    fn index(self) -> usize {
        self.raw() as usize
    }
}

/// Dense position of a feature in the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSlot(pub u32);

/// Dense position of a class label in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassSlot(pub u32);

impl Slot for FeatureSlot {
    fn from_raw(raw: u32) -> Self {
        FeatureSlot(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

impl Slot for ClassSlot {
    fn from_raw(raw: u32) -> Self {
        ClassSlot(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

/// Maps feature keys to feature slots.
pub type FeatureIndex<K> = Interner<K, FeatureSlot>;

/// Maps class labels to class slots.
pub type ClassRegistry<K> = Interner<K, ClassSlot>;

#[derive(Debug)]
struct InternerInner<K> {
    /// Key -> raw slot.
    slots: AHashMap<K, u32>,
    /// Raw slot -> key, in allocation order.
    keys: Vec<K>,
}

/// Append-only, thread-safe key to slot mapping.
pub struct Interner<K, S> {
    inner: RwLock<InternerInner<K>>,
    _slot: PhantomData<fn() -> S>,
}

impl<K, S> Debug for Interner<K, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.inner.read().keys.len())
            .finish()
    }
}

impl<K: Key, S: Slot> Default for Interner<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, S: Slot> Interner<K, S> {
    /// Create an empty interner.
    pub fn new() -> Self {
        Interner {
            inner: RwLock::new(InternerInner {
                slots: AHashMap::new(),
                keys: Vec::new(),
            }),
            _slot: PhantomData,
        }
    }

    /// Rebuild an interner from keys listed in slot order.
    ///
    /// Fails if the same key appears twice, since two slots would then share a key.
    pub fn from_keys(keys: Vec<K>) -> Result<Self> {
        if keys.len() > u32::MAX as usize {
            return Err(BayesError::capacity_exceeded(format!(
                "{} keys exceed the slot space",
                keys.len()
            )));
        }

        let mut slots = AHashMap::with_capacity(keys.len());
        for (raw, key) in keys.iter().enumerate() {
            if slots.insert(key.clone(), raw as u32).is_some() {
                return Err(BayesError::other(format!("duplicate key {key:?} at slot {raw}")));
            }
        }

        Ok(Interner {
            inner: RwLock::new(InternerInner { slots, keys }),
            _slot: PhantomData,
        })
    }

    /// Return the slot of `key`, allocating the next slot if it is new.
    pub fn resolve<Q>(&self, key: &Q) -> Result<S>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(&raw) = self.inner.read().slots.get(key) {
            return Ok(S::from_raw(raw));
        }

        let mut inner = self.inner.write();
        // Another writer may have inserted the key between the two locks.
        if let Some(&raw) = inner.slots.get(key) {
            return Ok(S::from_raw(raw));
        }

        let raw = u32::try_from(inner.keys.len())
            .map_err(|_| BayesError::capacity_exceeded("slot space exhausted"))?;
        let owned = key.to_owned();
        inner.keys.push(owned.clone());
        inner.slots.insert(owned, raw);
        Ok(S::from_raw(raw))
    }

    /// Return the slot of `key` without allocating.
    pub fn get<Q>(&self, key: &Q) -> Option<S>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().slots.get(key).map(|&raw| S::from_raw(raw))
    }

    /// Reverse mapping from slot to key.
    pub fn lookup(&self, slot: S) -> Option<K> {
        self.inner.read().keys.get(slot.index()).cloned()
    }

    /// Number of allocated slots.
    pub fn len(&self) -> usize {
        self.inner.read().keys.len()
    }

    /// Whether no slot has been allocated yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys in slot order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys.clone()
    }
}
