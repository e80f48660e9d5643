//! The LRU hash map.

use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
    mem::MaybeUninit,
};

use crate::{
    group::{self, Group, EMPTY, GROUP_SIZE, SET_BIT, TOMBSTONE},
    options::{round_capacity, DefaultHashBuilder, MAX_CAPACITY, MIN_CAPACITY},
    probe::ProbeSeq,
};

/// One storage cell: the entry payload plus its recency-list links.
///
/// `entry` is initialized if and only if the slot's metadata byte has the set bit. Slot 0 never
/// holds an entry; its links anchor both ends of the recency list.
struct Slot<K, V> {
    entry: MaybeUninit<(K, V)>,
    prev: usize,
    next: usize,
}

impl<K, V> Slot<K, V> {
    fn new() -> Self {
        Slot {
            entry: MaybeUninit::uninit(),
            prev: 0,
            next: 0,
        }
    }
}

/// A hash map that keeps its entries in least-recently-used order.
///
/// Every successful lookup or insertion moves the touched entry to the most recently used end of
/// an intrusive doubly-linked recency list; [`remove_lru`][Self::remove_lru] always removes the
/// least recently used entry. The map never evicts on its own: an embedder that wants a bounded
/// cache inserts and then calls `remove_lru` in a loop, which keeps eviction policy (entry
/// weights, soft limits, callbacks) entirely outside the map.
///
/// Lookup is served by an open-addressed hash index over the same slots that form the recency
/// list, so entries need no separate node allocations. [`get`][Self::get] takes `&mut self`
/// because even a read reorders the recency list.
///
/// Key hashes are produced by an injected [`BuildHasher`]; the default is the deterministic
/// [`DefaultHashBuilder`], so iteration order is reproducible for a fixed operation sequence.
///
/// # Examples
///
/// ```
/// use lru_map::LruMap;
///
/// let mut map: LruMap<&str, u32> = LruMap::new();
/// map.insert("mercury", 1);
/// map.insert("venus", 2);
/// map.insert("earth", 3);
///
/// // a hit promotes the entry to most recently used
/// assert_eq!(map.get("mercury"), Some(&1));
/// assert_eq!(map.mru(), Some((&"mercury", &1)));
/// assert_eq!(map.lru(), Some((&"venus", &2)));
///
/// // the embedder drives eviction
/// while map.len() > 2 {
///     map.remove_lru();
/// }
/// assert_eq!(map.get("venus"), None);
/// ```
pub struct LruMap<K, V, S = DefaultHashBuilder> {
    /// Metadata bytes, one per slot, index 0 unused. The trailing `GROUP_SIZE - 1` bytes mirror
    /// the bytes of slots `1..GROUP_SIZE` so group loads never need to wrap.
    meta: Box<[u8]>,
    /// `capacity + 1` slots, slot 0 being the recency-list sentinel. Empty until the first
    /// operation when the map was built with zero capacity.
    slots: Box<[Slot<K, V>]>,
    hash_builder: S,
    active: usize,
    tombstones: usize,
}

impl<K, V, S: Default> Default for LruMap<K, V, S> {
    fn default() -> Self {
        LruMap {
            meta: Box::default(),
            slots: Box::default(),
            hash_builder: S::default(),
            active: 0,
            tombstones: 0,
        }
    }
}

impl<K, V> LruMap<K, V> {
    /// Returns an empty map that allocates lazily on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an empty map sized for at least `capacity` live entries.
    ///
    /// A nonzero capacity is rounded up to the next power of two of at least 16 and allocated
    /// immediately; zero defers allocation to the first operation.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> LruMap<K, V, S> {
    /// Returns an empty map using `hash_builder` to hash keys.
    pub fn with_hasher(hash_builder: S) -> Self {
        LruMap {
            meta: Box::default(),
            slots: Box::default(),
            hash_builder,
            active: 0,
            tombstones: 0,
        }
    }

    /// Returns an empty map sized for at least `capacity` live entries, using `hash_builder` to
    /// hash keys.
    ///
    /// Panics when `capacity` is out of range; [`Options::build`](crate::Options::build) reports
    /// the same condition as an error instead.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        assert!(
            capacity <= MAX_CAPACITY,
            "capacity {capacity} exceeds the supported maximum {MAX_CAPACITY}"
        );
        let mut map = Self::with_hasher(hash_builder);
        if capacity > 0 {
            map.allocate(round_capacity(capacity));
        }
        map
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.active
    }

    /// Returns `true` when the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Returns the allocated slot count, a power of two, or 0 before the first allocation.
    pub fn capacity(&self) -> usize {
        self.slots.len().saturating_sub(1)
    }

    /// Returns the load factor, live entries per slot.
    pub fn load(&self) -> f64 {
        let capacity = self.capacity();
        if capacity == 0 {
            return 0.0;
        }
        self.active as f64 / capacity as f64
    }

    /// Returns the least recently used entry without promoting it.
    pub fn lru(&self) -> Option<(&K, &V)> {
        self.peek(self.lru_index())
    }

    /// Returns the most recently used entry without promoting it.
    pub fn mru(&self) -> Option<(&K, &V)> {
        self.peek(self.mru_index())
    }

    /// Removes and returns the least recently used entry.
    pub fn remove_lru(&mut self) -> Option<(K, V)> {
        let index = self.lru_index();
        if index == 0 {
            return None;
        }
        Some(self.remove_slot(index))
    }

    /// Removes all entries, keeping the allocated storage.
    pub fn clear(&mut self) {
        if self.slots.is_empty() {
            return;
        }
        let mut index = self.slots[0].prev;
        while index != 0 {
            let next = self.slots[index].prev;
            // SAFETY: slots on the recency list hold initialized entries and each is visited
            // once.
            unsafe { self.slots[index].entry.assume_init_drop() };
            self.slots[index].prev = 0;
            self.slots[index].next = 0;
            index = next;
        }
        self.slots[0].prev = 0;
        self.slots[0].next = 0;
        self.meta.fill(EMPTY);
        self.active = 0;
        self.tombstones = 0;
    }

    /// Retains only the entries for which `f` returns `true`.
    ///
    /// Entries are visited in LRU to MRU order without changing their recency; rejected entries
    /// are removed as they are visited. This is the supported way to delete while iterating.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        if self.slots.is_empty() {
            return;
        }
        let mut index = self.slots[0].prev;
        while index != 0 {
            // read the link before the entry can be deleted
            let next = self.slots[index].prev;
            let keep = {
                // SAFETY: slots on the recency list hold initialized entries.
                let entry = unsafe { self.slots[index].entry.assume_init_mut() };
                f(&entry.0, &mut entry.1)
            };
            if !keep {
                self.remove_slot(index);
            }
            index = next;
        }
    }

    /// Returns an iterator over the entries in LRU to MRU order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            index: self.lru_index(),
            remaining: self.active,
        }
    }

    /// Returns an iterator over the keys in LRU to MRU order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values in LRU to MRU order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    fn peek(&self, index: usize) -> Option<(&K, &V)> {
        if index == 0 {
            return None;
        }
        // SAFETY: nonzero list indices refer to slots holding initialized entries.
        let entry = unsafe { self.slots[index].entry.assume_init_ref() };
        Some((&entry.0, &entry.1))
    }

    fn lru_index(&self) -> usize {
        if self.slots.is_empty() {
            return 0;
        }
        self.slots[0].prev
    }

    fn mru_index(&self) -> usize {
        if self.slots.is_empty() {
            return 0;
        }
        self.slots[0].next
    }

    /// Removes the entry in slot `index` and decides whether the slot becomes empty or a
    /// tombstone.
    fn remove_slot(&mut self, index: usize) -> (K, V) {
        debug_assert!(self.meta[index] & SET_BIT != 0);
        self.unlink(index);
        // SAFETY: the caller passes a set slot; the metadata byte is rewritten below so the
        // entry is never read again.
        let entry = unsafe { self.slots[index].entry.assume_init_read() };
        self.active -= 1;

        // The slot may only become empty if no probe window across it was ever seen as a full
        // group, since an empty byte terminates lookups. That is guaranteed when the groups
        // before and after the slot both still contain an empty byte and the contiguous non-empty
        // run through the slot is shorter than a group.
        let capacity = self.capacity();
        let after = Group::load(&self.meta, index).match_empty();
        if after.any() {
            let before_start = if index > GROUP_SIZE {
                index - GROUP_SIZE
            } else {
                index + capacity - GROUP_SIZE
            };
            let before = Group::load(&self.meta, before_start).match_empty();
            if before.any() && before.first_from_end() + after.first() < GROUP_SIZE {
                self.set_meta(index, EMPTY);
                return entry;
            }
        }
        self.set_meta(index, TOMBSTONE);
        self.tombstones += 1;
        entry
    }

    /// Writes a metadata byte, keeping the trailing mirror region in sync.
    fn set_meta(&mut self, index: usize, byte: u8) {
        self.meta[index] = byte;
        if index < GROUP_SIZE {
            let capacity = self.capacity();
            self.meta[index + capacity] = byte;
        }
    }

    fn unlink(&mut self, index: usize) {
        let prev = self.slots[index].prev;
        let next = self.slots[index].next;
        self.slots[prev].next = next;
        self.slots[next].prev = prev;
    }

    /// Splices slot `index` in at the most recently used end of the list.
    fn push_front(&mut self, index: usize) {
        let next = self.slots[0].next;
        self.slots[index].prev = 0;
        self.slots[index].next = next;
        self.slots[0].next = index;
        self.slots[next].prev = index;
    }

    /// Replaces the storage with freshly allocated arrays of the given capacity.
    fn allocate(&mut self, capacity: usize) {
        debug_assert!(capacity.is_power_of_two() && capacity >= MIN_CAPACITY);
        self.meta = vec![EMPTY; capacity + GROUP_SIZE].into_boxed_slice();
        let mut slots = Vec::new();
        slots.resize_with(capacity + 1, Slot::new);
        self.slots = slots.into_boxed_slice();
        self.active = 0;
        self.tombstones = 0;
    }
}

fn h1(hash: u64) -> u64 {
    hash >> 7
}

impl<K: Hash + Eq, V, S: BuildHasher> LruMap<K, V, S> {
    /// Inserts a key-value pair and promotes it to most recently used.
    ///
    /// Returns the previous value when the key was already present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (hash, index) = self.find(&key);
        if index != 0 {
            self.unlink(index);
            self.push_front(index);
            // SAFETY: `find` only returns set slots, which hold initialized entries.
            let entry = unsafe { self.slots[index].entry.assume_init_mut() };
            return Some(std::mem::replace(&mut entry.1, value));
        }
        self.insert_new(hash, key, value);
        None
    }

    /// Returns the value for `key` and promotes the entry to most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        Q: Hash + Eq + ?Sized,
        K: Borrow<Q>,
    {
        let (_, index) = self.find(key);
        if index == 0 {
            return None;
        }
        self.unlink(index);
        self.push_front(index);
        // SAFETY: `find` only returns set slots, which hold initialized entries.
        Some(unsafe { &self.slots[index].entry.assume_init_ref().1 })
    }

    /// Returns a mutable reference to the value for `key` and promotes the entry to most
    /// recently used.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: Hash + Eq + ?Sized,
        K: Borrow<Q>,
    {
        let (_, index) = self.find(key);
        if index == 0 {
            return None;
        }
        self.unlink(index);
        self.push_front(index);
        // SAFETY: `find` only returns set slots, which hold initialized entries.
        Some(unsafe { &mut self.slots[index].entry.assume_init_mut().1 })
    }

    /// Removes the entry for `key` and returns its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: Hash + Eq + ?Sized,
        K: Borrow<Q>,
    {
        let (_, index) = self.find(key);
        if index == 0 {
            return None;
        }
        Some(self.remove_slot(index).1)
    }

    /// Returns the hash of `key` and the index of its slot, or index 0 when absent.
    ///
    /// Every keyed operation funnels through here, which makes it the spot for lazy
    /// initialization of maps built with zero capacity.
    fn find<Q>(&mut self, key: &Q) -> (u64, usize)
    where
        Q: Hash + Eq + ?Sized,
        K: Borrow<Q>,
    {
        if self.capacity() == 0 {
            self.allocate(MIN_CAPACITY);
            return (self.hash_builder.hash_one(key), 0);
        }
        let hash = self.hash_builder.hash_one(key);
        (hash, self.locate(hash, key))
    }

    fn locate<Q>(&self, hash: u64, key: &Q) -> usize
    where
        Q: Eq + ?Sized,
        K: Borrow<Q>,
    {
        let tag = group::tag(hash);
        let mut probe = ProbeSeq::new(h1(hash), self.capacity());
        loop {
            let group = Group::load(&self.meta, probe.index());
            for offset in group.match_byte(tag) {
                let index = probe.slot(offset);
                // the byte match can be a false positive, the key comparison is authoritative
                // SAFETY: slots with a set metadata byte hold initialized entries, and a false
                // positive of `match_byte` can only report a set byte.
                let entry = unsafe { self.slots[index].entry.assume_init_ref() };
                if entry.0.borrow() == key {
                    return index;
                }
            }
            if group.match_empty().any() {
                return 0;
            }
            probe.next();
        }
    }

    /// Inserts a key known to be absent.
    fn insert_new(&mut self, hash: u64, key: K, value: V) {
        if self.needs_rehash_or_grow() {
            self.rehash_or_grow();
            // the build hasher is fixed for the lifetime of the map, so `hash` stays valid
            // across the reallocation
        }
        let index = self.find_first_not_set(hash);
        if self.meta[index] == TOMBSTONE {
            self.tombstones -= 1;
        }
        self.set_meta(index, group::tag(hash));
        self.slots[index].entry.write((key, value));
        self.push_front(index);
        self.active += 1;
    }

    /// Returns the first slot along the probe sequence whose metadata byte is not set.
    ///
    /// Terminates because the resize policy keeps at least one empty slot in the table.
    fn find_first_not_set(&self, hash: u64) -> usize {
        let mut probe = ProbeSeq::new(h1(hash), self.capacity());
        loop {
            let matches = Group::load(&self.meta, probe.index()).match_not_set();
            if matches.any() {
                return probe.slot(matches.first());
            }
            probe.next();
        }
    }

    /// Returns `true` when fewer than an eighth of the slots are free, at which point the next
    /// insertion must reclaim tombstones or grow so probes keep terminating.
    fn needs_rehash_or_grow(&self) -> bool {
        let capacity = self.capacity();
        capacity - self.active - self.tombstones < capacity >> 3
    }

    #[cold]
    #[inline(never)]
    fn rehash_or_grow(&mut self) {
        // Same cutoff as abseil's raw_hash_set: when the live load is at most ~0.78 the
        // saturation is mostly tombstones, which an in-place rehash reclaims without
        // allocating.
        if self.active * 32 <= self.capacity() * 25 {
            self.rehash_in_place();
        } else {
            self.grow();
        }
    }

    /// Reclaims all tombstones at the current capacity.
    fn rehash_in_place(&mut self) {
        let capacity = self.capacity();
        // Tombstones become empty and set bytes become tombstones; the pass below then
        // re-places every live slot and restores its tag.
        let mut start = 1;
        while start <= capacity {
            group::prepare_rehash(&mut self.meta, start);
            start += GROUP_SIZE;
        }
        self.meta.copy_within(1..GROUP_SIZE, capacity + 1);

        // Walk the recency list instead of scanning all slots, so only live entries are
        // visited. Entries displaced by a swap keep their list links and are re-examined when
        // the walk reaches them.
        let mut index = self.slots[0].prev;
        while index != 0 {
            let hash = {
                // SAFETY: slots on the recency list hold initialized entries.
                let entry = unsafe { self.slots[index].entry.assume_init_ref() };
                self.hash_builder.hash_one(&entry.0)
            };
            let probe = ProbeSeq::new(h1(hash), capacity);
            let target = self.find_first_not_set(hash);

            // already inside the first group its probe reaches: keep it there
            if probe.distance(index) / GROUP_SIZE == probe.distance(target) / GROUP_SIZE {
                self.set_meta(index, group::tag(hash));
                index = self.slots[index].prev;
                continue;
            }
            if self.meta[target] == EMPTY {
                self.set_meta(index, EMPTY);
                self.set_meta(target, group::tag(hash));
                self.move_slot(target, index);
                index = self.slots[target].prev;
                continue;
            }
            // the target tombstone is another live entry still waiting to be re-placed: swap
            // payloads and continue the walk from the entry now sitting in `target`
            self.set_meta(target, group::tag(hash));
            self.swap_slots(index, target);
            index = self.slots[target].prev;
        }
        self.tombstones = 0;
    }

    /// Reallocates at the next capacity step and reinserts every entry.
    ///
    /// The old list is walked LRU first; since each insertion lands at the MRU end, the recency
    /// order carries over to the new table.
    fn grow(&mut self) {
        let requested = ((self.capacity() * 50).div_ceil(32)).min(MAX_CAPACITY);
        let old_slots = std::mem::take(&mut self.slots);
        self.allocate(round_capacity(requested));
        if old_slots.is_empty() {
            return;
        }
        let mut index = old_slots[0].prev;
        while index != 0 {
            let next = old_slots[index].prev;
            // SAFETY: slots on the old recency list hold initialized entries; each is read out
            // exactly once and `Slot` has no drop glue, so dropping `old_slots` cannot touch
            // the moved-out payloads.
            let (key, value) = unsafe { old_slots[index].entry.assume_init_read() };
            let hash = self.hash_builder.hash_one(&key);
            self.insert_new(hash, key, value);
            index = next;
        }
    }

    /// Moves the payload and list position of slot `index` to the unoccupied slot `target`.
    fn move_slot(&mut self, target: usize, index: usize) {
        debug_assert_ne!(target, index);
        // SAFETY: the source slot holds an initialized entry which is moved, not duplicated:
        // its metadata byte was cleared by the caller so it is never read again.
        let entry = unsafe { self.slots[index].entry.assume_init_read() };
        let prev = self.slots[index].prev;
        let next = self.slots[index].next;
        let slot = &mut self.slots[target];
        slot.entry.write(entry);
        slot.prev = prev;
        slot.next = next;
        self.slots[prev].next = target;
        self.slots[next].prev = target;
    }

    /// Swaps the payloads and list positions of two occupied slots.
    fn swap_slots(&mut self, i: usize, j: usize) {
        debug_assert_ne!(i, j);
        // SAFETY: both slots hold initialized entries; the two reads are balanced by the two
        // writes directly below.
        let (a, b) = unsafe {
            (
                self.slots[i].entry.assume_init_read(),
                self.slots[j].entry.assume_init_read(),
            )
        };
        self.slots[i].entry.write(b);
        self.slots[j].entry.write(a);

        let (i_prev, i_next) = (self.slots[i].prev, self.slots[i].next);
        let (j_prev, j_next) = (self.slots[j].prev, self.slots[j].next);
        if i_next == j {
            // adjacent: x -> i -> j -> y becomes x -> j -> i -> y
            self.slots[i_prev].next = j;
            self.slots[j].prev = i_prev;
            self.slots[j].next = i;
            self.slots[i].prev = j;
            self.slots[i].next = j_next;
            self.slots[j_next].prev = i;
        } else if j_next == i {
            // adjacent: x -> j -> i -> y becomes x -> i -> j -> y
            self.slots[j_prev].next = i;
            self.slots[i].prev = j_prev;
            self.slots[i].next = j;
            self.slots[j].prev = i;
            self.slots[j].next = i_next;
            self.slots[i_next].prev = j;
        } else {
            self.slots[i].prev = j_prev;
            self.slots[i].next = j_next;
            self.slots[j].prev = i_prev;
            self.slots[j].next = i_next;
            self.slots[j_prev].next = i;
            self.slots[j_next].prev = i;
            self.slots[i_prev].next = j;
            self.slots[i_next].prev = j;
        }
    }
}

impl<K, V, S> Drop for LruMap<K, V, S> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<(K, V)>() || self.slots.is_empty() {
            return;
        }
        let mut index = self.slots[0].prev;
        while index != 0 {
            let next = self.slots[index].prev;
            // SAFETY: slots on the recency list hold initialized entries and each is dropped
            // once.
            unsafe { self.slots[index].entry.assume_init_drop() };
            index = next;
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone, S: BuildHasher + Clone> Clone for LruMap<K, V, S> {
    fn clone(&self) -> Self {
        let mut clone = Self::with_capacity_and_hasher(self.capacity(), self.hash_builder.clone());
        // reinserting in LRU to MRU order reproduces the recency order
        for (key, value) in self.iter() {
            clone.insert(key.clone(), value.clone());
        }
        clone
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for LruMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// An iterator over the entries of an [`LruMap`] in LRU to MRU order.
///
/// This struct is created by the [`iter`](LruMap::iter) method on [`LruMap`].
pub struct Iter<'a, K, V> {
    slots: &'a [Slot<K, V>],
    index: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index == 0 {
            return None;
        }
        let slot = &self.slots[self.index];
        self.index = slot.prev;
        self.remaining -= 1;
        // SAFETY: nonzero list indices refer to slots holding initialized entries.
        let entry = unsafe { slot.entry.assume_init_ref() };
        Some((&entry.0, &entry.1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// An iterator over the keys of an [`LruMap`] in LRU to MRU order.
///
/// This struct is created by the [`keys`](LruMap::keys) method on [`LruMap`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// An iterator over the values of an [`LruMap`] in LRU to MRU order.
///
/// This struct is created by the [`values`](LruMap::values) method on [`LruMap`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a LruMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator moving entries out of an [`LruMap`] in LRU to MRU order.
///
/// This struct is created by the `into_iter` method on [`LruMap`].
pub struct IntoIter<K, V, S> {
    map: LruMap<K, V, S>,
}

impl<K, V, S> Iterator for IntoIter<K, V, S> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.map.remove_lru()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len(), Some(self.map.len()))
    }
}

impl<K, V, S> ExactSizeIterator for IntoIter<K, V, S> {}

impl<K, V, S> IntoIterator for LruMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { map: self }
    }
}

#[cfg(test)]
impl<K: Hash + Eq, V, S: BuildHasher> LruMap<K, V, S> {
    pub(crate) fn tombstone_count(&self) -> usize {
        self.tombstones
    }

    /// Asserts the structural invariants that must hold between public calls.
    pub(crate) fn check(&self) {
        let capacity = self.capacity();
        if capacity == 0 {
            assert_eq!(self.active, 0);
            assert_eq!(self.tombstones, 0);
            return;
        }
        assert!(capacity.is_power_of_two());
        assert!(capacity >= MIN_CAPACITY);
        assert_eq!(self.meta.len(), capacity + GROUP_SIZE);
        assert_eq!(self.slots.len(), capacity + 1);
        for index in 1..GROUP_SIZE {
            assert_eq!(self.meta[index + capacity], self.meta[index], "mirror byte");
        }

        let mut set = 0;
        let mut tombstones = 0;
        for index in 1..=capacity {
            match self.meta[index] {
                EMPTY => {}
                TOMBSTONE => tombstones += 1,
                byte => {
                    assert!(byte & SET_BIT != 0);
                    set += 1;
                }
            }
        }
        assert_eq!(set, self.active);
        assert_eq!(tombstones, self.tombstones);
        assert!(self.active + self.tombstones <= capacity);

        // the prev chain from the sentinel must visit exactly the set slots, and the next chain
        // must be its reverse
        let mut forward = Vec::new();
        let mut index = self.slots[0].prev;
        while index != 0 {
            assert!(self.meta[index] & SET_BIT != 0);
            forward.push(index);
            assert!(forward.len() <= self.active, "cycle in the recency list");
            index = self.slots[index].prev;
        }
        assert_eq!(forward.len(), self.active);
        let mut backward = Vec::new();
        let mut index = self.slots[0].next;
        while index != 0 {
            backward.push(index);
            assert!(backward.len() <= self.active, "cycle in the recency list");
            index = self.slots[index].next;
        }
        backward.reverse();
        assert_eq!(forward, backward);

        // every live key is reachable through its probe sequence and carries its tag
        for index in 1..=capacity {
            if self.meta[index] & SET_BIT != 0 {
                // SAFETY: set slots hold initialized entries.
                let key = unsafe { &self.slots[index].entry.assume_init_ref().0 };
                let hash = self.hash_builder.hash_one(key);
                assert_eq!(self.meta[index], group::tag(hash));
                assert_eq!(self.locate(hash, key), index);
            }
        }
    }
}
