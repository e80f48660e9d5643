//! Construction options for [`LruMap`].

use std::hash::{BuildHasher, BuildHasherDefault};

use zwohash::ZwoHasher;

use crate::map::LruMap;

/// Default build hasher used by [`LruMap`] when none is injected.
pub type DefaultHashBuilder = BuildHasherDefault<ZwoHasher>;

/// Smallest slot capacity ever allocated. Requested capacities are rounded up to a power of two
/// of at least this size.
pub(crate) const MIN_CAPACITY: usize = 16;

/// Largest supported slot capacity.
///
/// The bound keeps the capacity arithmetic (the 50/32 growth factor, the mirror region, probe
/// offsets) free of overflow on both 32 and 64 bit targets; real allocations fail long before
/// reaching it.
pub(crate) const MAX_CAPACITY: usize = 1 << (usize::BITS - 8);

/// Rounds a nonzero requested capacity to the allocated slot count.
pub(crate) fn round_capacity(requested: usize) -> usize {
    debug_assert!(requested <= MAX_CAPACITY);
    requested.max(MIN_CAPACITY).next_power_of_two()
}

/// Error returned by [`Options::build`] for out-of-range options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// The requested capacity exceeds the largest supported slot capacity.
    #[error("requested capacity {requested} exceeds the supported maximum {max}")]
    CapacityTooLarge {
        /// The capacity that was asked for.
        requested: usize,
        /// The largest capacity the map supports.
        max: usize,
    },
}

/// Builder-style construction options for [`LruMap`].
///
/// [`LruMap::new`] and its sibling constructors cover the common cases; the builder exists for
/// callers that assemble options from untrusted configuration and want a structured error instead
/// of a panic.
///
/// # Examples
///
/// ```
/// use lru_map::{LruMap, Options};
///
/// let mut map: LruMap<u64, u64> = Options::new().capacity(100).build().unwrap();
/// assert_eq!(map.capacity(), 128);
/// map.insert(1, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Options<S = DefaultHashBuilder> {
    capacity: usize,
    hash_builder: S,
}

impl Options {
    /// Returns the default options: zero initial capacity (the map allocates lazily on first
    /// use) and the default hasher.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> Options<S> {
    /// Sets the initial capacity.
    ///
    /// The capacity is a target minimum live-entry count; it is rounded up to the next power of
    /// two of at least 16. Zero keeps the map unallocated until its first operation.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Injects the build hasher producing the 64-bit key hashes.
    pub fn hasher<S2: BuildHasher>(self, hash_builder: S2) -> Options<S2> {
        Options {
            capacity: self.capacity,
            hash_builder,
        }
    }

    /// Builds the map, validating the options.
    pub fn build<K, V>(self) -> Result<LruMap<K, V, S>, OptionsError>
    where
        S: BuildHasher,
    {
        if self.capacity > MAX_CAPACITY {
            return Err(OptionsError::CapacityTooLarge {
                requested: self.capacity,
                max: MAX_CAPACITY,
            });
        }
        Ok(LruMap::with_capacity_and_hasher(
            self.capacity,
            self.hash_builder,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_rounds_to_a_power_of_two() {
        for (requested, expected) in [(0, 16), (1, 16), (16, 16), (17, 32), (100, 128)] {
            let map: LruMap<u64, u64> = Options::new().capacity(requested).build().unwrap();
            if requested == 0 {
                assert_eq!(map.capacity(), 0);
            } else {
                assert_eq!(map.capacity(), expected);
            }
        }
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        let result: Result<LruMap<u64, u64>, _> =
            Options::new().capacity(MAX_CAPACITY + 1).build();
        assert_eq!(
            result.unwrap_err(),
            OptionsError::CapacityTooLarge {
                requested: MAX_CAPACITY + 1,
                max: MAX_CAPACITY,
            }
        );
    }
}
