//! Quadratic probe sequence over metadata groups.

use crate::group::GROUP_SIZE;

/// Probe state for one lookup or insertion.
///
/// The capacity is a power of two and the probe advances by a triangular-number schedule of
/// groups: starting from the home offset derived from the hash, the visited group offsets are
/// `home`, `home + g`, `home + 3g`, `home + 6g`, ... modulo the capacity, with `g` the group
/// size. For power-of-two capacities this schedule visits every group exactly once before
/// repeating, so a probe is guaranteed to terminate as long as the table has a free slot.
pub(crate) struct ProbeSeq {
    /// Zero-based slot offset of the current group's first byte.
    offset: usize,
    /// Accumulated step, `GROUP_SIZE` times the step number.
    acc: usize,
    /// `capacity - 1`.
    mask: usize,
}

impl ProbeSeq {
    #[inline]
    pub(crate) fn new(h1: u64, capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let mask = capacity - 1;
        ProbeSeq {
            offset: h1 as usize & mask,
            acc: 0,
            mask,
        }
    }

    /// One-based slot index of the first byte of the current group.
    #[inline]
    pub(crate) fn index(&self) -> usize {
        self.offset + 1
    }

    /// One-based slot index of the byte `offset` positions into the current group.
    #[inline]
    pub(crate) fn slot(&self, offset: usize) -> usize {
        ((self.offset + offset) & self.mask) + 1
    }

    /// Number of slots between the current group's first byte and the one-based slot `index`,
    /// walking forward modulo the capacity.
    #[inline]
    pub(crate) fn distance(&self, index: usize) -> usize {
        (index - 1).wrapping_sub(self.offset) & self.mask
    }

    /// Advances to the next group of the schedule.
    #[inline]
    pub(crate) fn next(&mut self) {
        self.acc += GROUP_SIZE;
        self.offset = (self.offset + self.acc) & self.mask;
    }

    /// Steps back to the previous group of the schedule.
    #[cfg(test)]
    pub(crate) fn prev(&mut self) {
        self.offset = self.offset.wrapping_sub(self.acc) & self.mask;
        self.acc -= GROUP_SIZE;
    }
}
