//! A generic LRU hash map built on an indexed intrusive-list hash table.
//!
//! [`LruMap`] maps keys to values while maintaining a total recency order over its entries: each
//! successful lookup or insertion moves the touched entry to the most recently used end, and
//! [`LruMap::remove_lru`] always removes from the least recently used end. The map itself never
//! evicts; bounded caches are built by layering an eviction loop on top, which keeps weights,
//! limits and callbacks out of the core.
//!
//! Internally a single slot array backs both concerns: an open-addressed hash index with
//! byte-sized slot metadata, scanned eight bytes at a time, and a doubly-linked recency list
//! threaded through the same slots, so entries need no separate node allocations.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(missing_docs)]

mod group;
mod map;
mod options;
mod probe;

#[cfg(test)]
mod test_map;

pub use map::{IntoIter, Iter, Keys, LruMap, Values};
pub use options::{DefaultHashBuilder, Options, OptionsError};
