//! Control byte encoding.
//!
//! Every slot of a table has exactly one control byte. The byte is one of:
//!
//! - [`EMPTY`]: the slot has never held an entry since the last `clear`.
//! - [`ERASED`]: a tombstone. The slot held an entry which has since been
//!   erased. It may be reused by insertion, but it does not end a probe.
//! - a hashlet in `0x00..=0x7F`: the slot holds a live entry whose hash has
//!   these low seven bits.
//!
//! Special values have the top bit set, so a group scan can separate live
//! slots from free ones with a single sign-bit test.

/// Control byte of a slot that has never been used.
pub(crate) const EMPTY: u8 = 0b1111_1111;

/// Control byte of a slot whose entry has been erased.
pub(crate) const ERASED: u8 = 0b1000_0000;

/// Mask selecting the hash bits cached in an occupied control byte.
pub(crate) const HASHLET_MASK: u64 = 0x7F;

/// Returns the control byte an entry with the given hash is tagged with.
#[inline(always)]
pub(crate) fn hashlet(hash: u64) -> u8 {
    (hash & HASHLET_MASK) as u8
}

/// Checks whether a control byte marks a live entry (top bit is clear).
#[inline(always)]
pub(crate) fn is_full(ctrl: u8) -> bool {
    ctrl & 0x80 == 0
}

/// Checks whether a control byte is `EMPTY` or `ERASED` (top bit is set).
#[inline(always)]
pub(crate) fn is_special(ctrl: u8) -> bool {
    ctrl & 0x80 != 0
}

/// A set of positions within one group, one bit per control byte.
///
/// Bit `i` corresponds to the control byte at offset `i` from the start of
/// the group.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct BitMask(pub(crate) u16);

impl BitMask {
    #[inline(always)]
    pub(crate) fn any_bit_set(self) -> bool {
        self.0 != 0
    }

    /// Returns the lowest set position, if any.
    #[inline(always)]
    pub(crate) fn lowest_set_bit(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    /// Clears every position below `offset`.
    #[inline(always)]
    pub(crate) fn from_offset(self, offset: usize) -> BitMask {
        debug_assert!(offset <= 16);
        if offset >= 16 {
            BitMask(0)
        } else {
            BitMask(self.0 & (u16::MAX << offset))
        }
    }
}

impl IntoIterator for BitMask {
    type IntoIter = BitMaskIter;
    type Item = usize;

    #[inline(always)]
    fn into_iter(self) -> BitMaskIter {
        BitMaskIter(self.0)
    }
}

/// Iterator over the set positions of a [`BitMask`], lowest first.
pub(crate) struct BitMaskIter(u16);

impl Iterator for BitMaskIter {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}
