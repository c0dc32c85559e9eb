//! Task collections and shape-preserving result collections.
//!
//! Input comes either as a sequence (identity = index) or as a keyed map
//! (identity = key). The shape is decided once, here; the iterator only
//! ever sees numbered slots and hands values back through [`Reassembly`].

use crate::error::{Error, Result};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

// =============================================================================
// OrderedMap
// =============================================================================

/// Map that keeps insertion order and unique keys.
///
/// Lookups are linear; task maps are small and iteration order is what
/// matters here.
#[derive(Clone, PartialEq, Eq)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> OrderedMap<K, V> {
    /// Empty map
    pub fn new() -> Self {
        OrderedMap {
            entries: Vec::new(),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Values in key order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Values in key order, consuming the map
    pub fn into_values(self) -> Vec<V> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }

    fn into_parts(self) -> (Vec<K>, Vec<V>) {
        self.entries.into_iter().unzip()
    }
}

impl<K: PartialEq, V> OrderedMap<K, V> {
    /// Insert a value. An existing key keeps its position and has its value
    /// replaced; the old value is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a value by key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: std::borrow::Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.entries
            .iter()
            .find(|(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Whether the key is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.get(key).is_some()
    }
}

impl<K: Eq + Hash + fmt::Debug, V> OrderedMap<K, V> {
    /// Build from pairs, keeping their order and refusing repeated keys
    pub fn from_pairs(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self> {
        let entries: Vec<(K, V)> = pairs.into_iter().collect();
        let mut seen = HashSet::with_capacity(entries.len());
        for (key, _) in &entries {
            if !seen.insert(key) {
                return Err(Error::invalid_input(format!("duplicate key {:?}", key)));
            }
        }
        Ok(OrderedMap { entries })
    }
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    /// Same outcome as repeated [`insert`](OrderedMap::insert): a repeated
    /// key keeps its first position and takes its last value.
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let pairs: Vec<(K, V)> = iter.into_iter().collect();
        let mut position: HashMap<&K, usize> = HashMap::with_capacity(pairs.len());
        let mut order: Vec<usize> = Vec::with_capacity(pairs.len());
        for (i, (key, _)) in pairs.iter().enumerate() {
            match position.get(key) {
                Some(&at) => order[at] = i,
                None => {
                    position.insert(key, order.len());
                    order.push(i);
                }
            }
        }
        drop(position);

        let mut pairs: Vec<Option<(K, V)>> = pairs.into_iter().map(Some).collect();
        OrderedMap {
            entries: order.into_iter().filter_map(|i| pairs[i].take()).collect(),
        }
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Serialize, V: Serialize> Serialize for OrderedMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// =============================================================================
// TaskCollection
// =============================================================================

/// Work handed to the iterator: one item per identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCollection<K, I> {
    /// Identity is the index; `K` is `usize` for plain sequences
    Sequence(Vec<I>),
    /// Identity is the key
    Keyed(OrderedMap<K, I>),
}

impl<K, I> TaskCollection<K, I> {
    /// Number of items
    pub fn len(&self) -> usize {
        match self {
            TaskCollection::Sequence(items) => items.len(),
            TaskCollection::Keyed(map) => map.len(),
        }
    }

    /// True when there is nothing to run
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether results will come back keyed
    pub fn is_keyed(&self) -> bool {
        matches!(self, TaskCollection::Keyed(_))
    }

    /// Borrow every item, keeping the shape
    pub fn as_ref(&self) -> TaskCollection<K, &I>
    where
        K: Clone,
    {
        match self {
            TaskCollection::Sequence(items) => TaskCollection::Sequence(items.iter().collect()),
            TaskCollection::Keyed(map) => TaskCollection::Keyed(OrderedMap {
                entries: map.entries.iter().map(|(k, v)| (k.clone(), v)).collect(),
            }),
        }
    }

    /// Split into the launch queue of `(slot, item)` pairs and the
    /// reassembly that rebuilds the original shape around results.
    pub(crate) fn normalize<T>(self) -> (VecDeque<(usize, I)>, Reassembly<K, T>) {
        let (keys, items) = match self {
            TaskCollection::Sequence(items) => (None, items),
            TaskCollection::Keyed(map) => {
                let (keys, items) = map.into_parts();
                (Some(keys), items)
            }
        };
        let reassembly = Reassembly::new(keys, items.len());
        (items.into_iter().enumerate().collect(), reassembly)
    }
}

impl<K: Eq + Hash + fmt::Debug, I> TaskCollection<K, I> {
    /// Keyed collection in the given pair order; repeated keys are rejected
    pub fn keyed(pairs: impl IntoIterator<Item = (K, I)>) -> Result<Self> {
        OrderedMap::from_pairs(pairs).map(TaskCollection::Keyed)
    }
}

impl<I> From<Vec<I>> for TaskCollection<usize, I> {
    fn from(items: Vec<I>) -> Self {
        TaskCollection::Sequence(items)
    }
}

impl<I, const N: usize> From<[I; N]> for TaskCollection<usize, I> {
    fn from(items: [I; N]) -> Self {
        TaskCollection::Sequence(items.into())
    }
}

impl<K, I> From<OrderedMap<K, I>> for TaskCollection<K, I> {
    fn from(map: OrderedMap<K, I>) -> Self {
        TaskCollection::Keyed(map)
    }
}

impl<K, I> From<HashMap<K, I>> for TaskCollection<K, I> {
    fn from(map: HashMap<K, I>) -> Self {
        TaskCollection::Keyed(OrderedMap {
            entries: map.into_iter().collect(),
        })
    }
}

impl<K, I> From<BTreeMap<K, I>> for TaskCollection<K, I> {
    fn from(map: BTreeMap<K, I>) -> Self {
        TaskCollection::Keyed(OrderedMap {
            entries: map.into_iter().collect(),
        })
    }
}

// =============================================================================
// Collection (results)
// =============================================================================

/// Results of a run, in the shape the tasks came in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection<K, T> {
    /// Value `i` belongs to task `i`
    Sequence(Vec<T>),
    /// Value under each task's key
    Keyed(OrderedMap<K, T>),
}

impl<K, T> Collection<K, T> {
    /// Number of values
    pub fn len(&self) -> usize {
        match self {
            Collection::Sequence(values) => values.len(),
            Collection::Keyed(map) => map.len(),
        }
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The values of a sequence result
    pub fn into_sequence(self) -> Option<Vec<T>> {
        match self {
            Collection::Sequence(values) => Some(values),
            Collection::Keyed(_) => None,
        }
    }

    /// The map of a keyed result
    pub fn into_keyed(self) -> Option<OrderedMap<K, T>> {
        match self {
            Collection::Sequence(_) => None,
            Collection::Keyed(map) => Some(map),
        }
    }

    /// All values in identity order, whatever the shape
    pub fn into_values(self) -> Vec<T> {
        match self {
            Collection::Sequence(values) => values,
            Collection::Keyed(map) => map.into_values(),
        }
    }
}

impl<K: Serialize, T: Serialize> Serialize for Collection<K, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Collection::Sequence(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for v in values {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Collection::Keyed(map) => map.serialize(serializer),
        }
    }
}

// =============================================================================
// Reassembly
// =============================================================================

/// Pre-shaped result container with one hole per slot.
pub(crate) struct Reassembly<K, T> {
    keys: Option<Vec<K>>,
    slots: Vec<Option<T>>,
    filled: usize,
}

impl<K, T> Reassembly<K, T> {
    fn new(keys: Option<Vec<K>>, len: usize) -> Self {
        Reassembly {
            keys,
            slots: (0..len).map(|_| None).collect(),
            filled: 0,
        }
    }

    /// Write a value into its slot
    pub(crate) fn collect(&mut self, slot: usize, value: T) {
        if self.slots[slot].replace(value).is_none() {
            self.filled += 1;
        }
    }

    /// Number of slots still empty
    pub(crate) fn remaining(&self) -> usize {
        self.slots.len() - self.filled
    }

    /// Rebuild the original shape; every slot must be filled
    pub(crate) fn finalize(self) -> Collection<K, T> {
        debug_assert_eq!(self.remaining(), 0, "finalize with empty slots");
        let values: Vec<T> = self.slots.into_iter().flatten().collect();
        match self.keys {
            None => Collection::Sequence(values),
            Some(keys) => Collection::Keyed(OrderedMap {
                entries: keys.into_iter().zip(values).collect(),
            }),
        }
    }
}
