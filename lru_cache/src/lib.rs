//! An LRU cache with weighted entries, layered on [`lru_map`].
//!
//! [`Cache`] tracks a total weight against a budget and evicts least recently used entries to
//! make room, by looping [`LruMap::remove_lru`] the way any embedder of the core map would. The
//! weight of an entry is whatever unit the caller chooses: bytes for a file cache, 1 per entry
//! for a plain bounded map.
//!
//! Eviction happens synchronously inside [`Cache::insert`] and the explicit helpers
//! [`Cache::evict_lru`] and [`Cache::evict_to_weight`]; the latter takes a callback and supports
//! soft/hard-limit schemes where a maintenance task periodically prunes below the hard budget.
//! The cache is single-threaded like the map; wrap it in a mutex to share it.
//!
//! # Examples
//!
//! ```
//! use lru_cache::Cache;
//!
//! // a cache holding at most 100 units worth of entries
//! let mut cache: Cache<&str, Vec<u8>> = Cache::new(100);
//! cache.insert("a", vec![0; 60], 60);
//! cache.insert("b", vec![0; 30], 30);
//!
//! // inserting 40 more units evicts "a", the least recently used entry
//! cache.insert("c", vec![0; 40], 40);
//! assert_eq!(cache.get(&"a"), None);
//! assert_eq!(cache.weight(), 70);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(missing_docs)]

use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
};

pub use lru_map::{DefaultHashBuilder, LruMap};

struct Entry<V> {
    value: V,
    weight: u64,
}

/// Error returned by [`Cache::get_or_insert_with`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FillError<E> {
    /// The fill closure failed; the cache is unchanged.
    #[error("generating the value failed: {0}")]
    Fill(E),
    /// The filled value was heavier than the whole cache budget and was discarded.
    #[error("entry weight {weight} exceeds the cache budget {budget}")]
    OverBudget {
        /// Weight of the rejected entry.
        weight: u64,
        /// The cache's weight budget.
        budget: u64,
    },
}

/// An LRU cache bounded by the total weight of its entries.
///
/// Entries carry a caller-chosen weight; once the sum of weights would exceed the budget, least
/// recently used entries are evicted until the newcomer fits. An entry heavier than the whole
/// budget is refused outright.
pub struct Cache<K, V, S = DefaultHashBuilder> {
    map: LruMap<K, Entry<V>, S>,
    weight: u64,
    max_weight: u64,
}

impl<K, V> Cache<K, V> {
    /// Returns an empty cache with the given weight budget.
    pub fn new(max_weight: u64) -> Self {
        Self::with_hasher(max_weight, DefaultHashBuilder::default())
    }

    /// Returns an empty cache without a weight budget.
    ///
    /// Nothing is ever evicted implicitly; use [`evict_to_weight`][Self::evict_to_weight] or
    /// [`evict_lru`][Self::evict_lru] to prune.
    pub fn unbounded() -> Self {
        Self::new(u64::MAX)
    }
}

impl<K, V, S> Cache<K, V, S> {
    /// Returns an empty cache with the given weight budget, using `hash_builder` to hash keys.
    pub fn with_hasher(max_weight: u64, hash_builder: S) -> Self {
        Cache {
            map: LruMap::with_hasher(hash_builder),
            weight: 0,
            max_weight,
        }
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the total weight of the cached entries.
    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Returns the weight budget.
    pub fn max_weight(&self) -> u64 {
        self.max_weight
    }

    /// Changes the weight budget.
    ///
    /// Shrinking the budget does not prune existing entries; follow up with
    /// [`evict_to_weight`][Self::evict_to_weight] to enforce the new budget immediately.
    pub fn set_max_weight(&mut self, max_weight: u64) {
        self.max_weight = max_weight;
    }

    /// Removes all entries, keeping the allocated storage.
    pub fn clear(&mut self) {
        self.map.clear();
        self.weight = 0;
    }

    /// Returns an iterator over the entries in LRU to MRU order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter().map(|(key, entry)| (key, &entry.value))
    }

    /// Evicts and returns the least recently used entry.
    pub fn evict_lru(&mut self) -> Option<(K, V)> {
        let (key, entry) = self.map.remove_lru()?;
        self.weight -= entry.weight;
        Some((key, entry.value))
    }

    /// Evicts least recently used entries until the total weight is at most `target`, passing
    /// each evicted entry to `on_evict`.
    ///
    /// The callback runs after the entry has left the cache, so it is free to call back into
    /// the cache.
    pub fn evict_to_weight(&mut self, target: u64, mut on_evict: impl FnMut(K, V)) {
        while self.weight > target {
            match self.map.remove_lru() {
                Some((key, entry)) => {
                    self.weight -= entry.weight;
                    on_evict(key, entry.value);
                }
                None => break,
            }
        }
    }

    /// Evicts LRU entries until `added` more weight fits the budget, keeping at least `keep`
    /// entries resident.
    fn make_room(&mut self, added: u64, keep: usize) -> bool {
        if added > self.max_weight {
            return false;
        }
        let target = self.max_weight - added;
        while self.weight > target && self.map.len() > keep {
            match self.map.remove_lru() {
                Some((_, entry)) => self.weight -= entry.weight,
                None => break,
            }
        }
        self.weight <= target
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Cache<K, V, S> {
    /// Inserts a key-value pair with the given weight, evicting least recently used entries to
    /// make room.
    ///
    /// Returns `false` and leaves the cache unchanged when `weight` alone exceeds the budget.
    /// Replacing an existing key promotes it first and only evicts for the weight difference,
    /// so the replaced entry itself is never evicted.
    pub fn insert(&mut self, key: K, value: V, weight: u64) -> bool {
        if weight > self.max_weight {
            return false;
        }
        let old_weight = self.map.get(&key).map(|entry| entry.weight);
        match old_weight {
            Some(old) => {
                if weight > old && !self.make_room(weight - old, 1) {
                    return false;
                }
                // the entry is the MRU after the lookup above and `make_room` kept at least
                // one entry, so it is still resident
                if let Some(entry) = self.map.get_mut(&key) {
                    entry.value = value;
                    entry.weight = weight;
                    self.weight = self.weight - old + weight;
                }
            }
            None => {
                if !self.make_room(weight, 0) {
                    return false;
                }
                self.map.insert(key, Entry { value, weight });
                self.weight += weight;
            }
        }
        true
    }

    /// Returns the value for `key` and promotes the entry to most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        Q: Hash + Eq + ?Sized,
        K: Borrow<Q>,
    {
        self.map.get(key).map(|entry| &entry.value)
    }

    /// Returns a mutable reference to the value for `key` and promotes the entry to most
    /// recently used.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: Hash + Eq + ?Sized,
        K: Borrow<Q>,
    {
        self.map.get_mut(key).map(|entry| &mut entry.value)
    }

    /// Removes the entry for `key` and returns its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: Hash + Eq + ?Sized,
        K: Borrow<Q>,
    {
        let entry = self.map.remove(key)?;
        self.weight -= entry.weight;
        Some(entry.value)
    }

    /// Returns the value for `key`, calling `fill` to produce a value and weight on a miss and
    /// caching the result.
    ///
    /// This turns the fetch-or-create pattern into a single cache operation: when the cache is
    /// behind a lock, a concurrent embedder holds the lock across both the lookup and the fill.
    pub fn get_or_insert_with<E>(
        &mut self,
        key: K,
        fill: impl FnOnce(&K) -> Result<(V, u64), E>,
    ) -> Result<&V, FillError<E>> {
        if self.map.get(&key).is_none() {
            let (value, weight) = fill(&key).map_err(FillError::Fill)?;
            if !self.make_room(weight, 0) {
                return Err(FillError::OverBudget {
                    weight,
                    budget: self.max_weight,
                });
            }
            self.map.insert(key, Entry { value, weight });
            self.weight += weight;
        }
        // on both paths the entry is now the most recently used
        let Some((_, entry)) = self.map.mru() else {
            unreachable!()
        };
        Ok(&entry.value)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for Cache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
