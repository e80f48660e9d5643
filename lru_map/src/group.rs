//! SWAR match primitives over groups of eight metadata bytes.
//!
//! Each slot of the map is described by one metadata byte: [`EMPTY`], [`TOMBSTONE`] or
//! `SET_BIT | tag` where `tag` carries the low seven bits of the slot's key hash. Groups of
//! [`GROUP_SIZE`] consecutive bytes are loaded into a single `u64` and matched in parallel using
//! the zero-byte detector from
//! <https://graphics.stanford.edu/~seander/bithacks.html#ZeroInWord>.

/// Number of metadata bytes scanned as one word.
pub(crate) const GROUP_SIZE: usize = 8;

/// Metadata byte of a slot that has never held an entry since the last (re)hash.
pub(crate) const EMPTY: u8 = 0;

/// Metadata byte of a slot whose entry was deleted while some probe window across it was full.
///
/// The value 2 (rather than 1) keeps the zero-byte detector in [`Group::match_empty`] exact for
/// the byte values actually stored, and makes the set and tombstone states a single shift apart
/// for [`prepare_rehash`].
pub(crate) const TOMBSTONE: u8 = 2;

/// High bit marking a metadata byte as set; the low seven bits hold the hash tag.
pub(crate) const SET_BIT: u8 = 0x80;

const LO_BITS: u64 = 0x0101_0101_0101_0101;
const HI_BITS: u64 = 0x8080_8080_8080_8080;

/// Returns the metadata byte for a set slot holding a key with the given hash.
#[inline]
pub(crate) fn tag(hash: u64) -> u8 {
    hash as u8 | SET_BIT
}

/// Eight metadata bytes loaded as a little-endian word.
#[derive(Clone, Copy)]
pub(crate) struct Group(u64);

impl Group {
    /// Loads the eight metadata bytes starting at `index`.
    ///
    /// The metadata array mirrors its first `GROUP_SIZE - 1` slot bytes past the end, so any
    /// `index` in `1..=capacity` has eight readable bytes without wrap handling.
    #[inline]
    pub(crate) fn load(meta: &[u8], index: usize) -> Self {
        Group(u64::from_le_bytes(
            meta[index..index + GROUP_SIZE].try_into().unwrap(),
        ))
    }

    /// Positions of bytes equal to zero.
    ///
    /// May report a false positive one past a `0x01` byte; of the byte values stored in the
    /// metadata array only the hash tag `0x81` has a `0x01` low byte pattern, and every user of a
    /// tag match confirms with a key comparison anyway.
    #[inline]
    fn match_zero(self) -> MatchMask {
        MatchMask(self.0.wrapping_sub(LO_BITS) & !self.0 & HI_BITS)
    }

    /// Positions of bytes equal to `byte`. Subject to the false positives of [`match_zero`].
    #[inline]
    pub(crate) fn match_byte(self, byte: u8) -> MatchMask {
        Group(self.0 ^ LO_BITS.wrapping_mul(byte as u64)).match_zero()
    }

    /// Positions of [`EMPTY`] bytes. Exact, since [`TOMBSTONE`] is 2, not 1.
    #[inline]
    pub(crate) fn match_empty(self) -> MatchMask {
        self.match_zero()
    }

    /// Positions of bytes that are not set, i.e. either empty or tombstones.
    #[inline]
    pub(crate) fn match_not_set(self) -> MatchMask {
        MatchMask(!self.0 & HI_BITS)
    }
}

/// Rewrites one group for in-place rehashing: tombstones become empty, set bytes become
/// tombstones, empty bytes stay empty.
#[inline]
pub(crate) fn prepare_rehash(meta: &mut [u8], index: usize) {
    let group = u64::from_le_bytes(meta[index..index + GROUP_SIZE].try_into().unwrap());
    let group = (group & HI_BITS) >> 6;
    meta[index..index + GROUP_SIZE].copy_from_slice(&group.to_le_bytes());
}

/// Match positions within a group, at most one bit per byte.
///
/// Iterating yields the byte offsets of the matches, lowest first.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct MatchMask(u64);

impl MatchMask {
    #[inline]
    pub(crate) fn any(self) -> bool {
        self.0 != 0
    }

    /// Byte offset of the first match. Meaningless when there is no match.
    #[inline]
    pub(crate) fn first(self) -> usize {
        (self.0.trailing_zeros() >> 3) as usize
    }

    /// Byte offset of the first match counted from the end of the group, i.e. the number of
    /// non-matching bytes at the end. Meaningless when there is no match.
    #[inline]
    pub(crate) fn first_from_end(self) -> usize {
        (self.0.leading_zeros() >> 3) as usize
    }
}

impl Iterator for MatchMask {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let offset = (self.0.trailing_zeros() >> 3) as usize;
        self.0 &= self.0 - 1;
        Some(offset)
    }
}
