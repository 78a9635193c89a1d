//! Group scan primitive.
//!
//! A [`Group`] is a snapshot of [`Group::WIDTH`] consecutive control bytes.
//! Scanning it answers, in one step, which positions hold a given hashlet,
//! which are `EMPTY`, and which are free or live. Scans are exact: a set bit
//! always means the byte matched.

#[cfg(all(
    target_feature = "sse2",
    any(target_arch = "x86", target_arch = "x86_64"),
    not(miri)
))]
mod sse2 {
    #[cfg(target_arch = "x86")]
    use core::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64::*;

    use crate::control::BitMask;
    use crate::control::EMPTY;

    #[derive(Clone, Copy)]
    pub(crate) struct Group(__m128i);

    impl Group {
        pub(crate) const WIDTH: usize = 16;

        /// Loads a group of control bytes.
        ///
        /// # Safety
        ///
        /// `ptr` must be valid for reads of `WIDTH` bytes and aligned to
        /// `WIDTH`.
        #[inline(always)]
        pub(crate) unsafe fn load_aligned(ptr: *const u8) -> Self {
            debug_assert_eq!(ptr as usize % Self::WIDTH, 0);
            // SAFETY: Caller guarantees a readable, 16-byte aligned range.
            unsafe { Group(_mm_load_si128(ptr as *const __m128i)) }
        }

        #[inline(always)]
        pub(crate) fn match_tag(self, tag: u8) -> BitMask {
            // SAFETY: SSE2 is statically enabled for this target.
            unsafe {
                let cmp = _mm_cmpeq_epi8(self.0, _mm_set1_epi8(tag as i8));
                BitMask(_mm_movemask_epi8(cmp) as u16)
            }
        }

        #[inline(always)]
        pub(crate) fn match_empty(self) -> BitMask {
            self.match_tag(EMPTY)
        }

        /// Positions whose control byte has the top bit set.
        #[inline(always)]
        pub(crate) fn match_empty_or_erased(self) -> BitMask {
            // SAFETY: SSE2 is statically enabled for this target.
            unsafe { BitMask(_mm_movemask_epi8(self.0) as u16) }
        }

        #[inline(always)]
        pub(crate) fn match_full(self) -> BitMask {
            BitMask(!self.match_empty_or_erased().0)
        }
    }
}

#[cfg(any(
    test,
    not(all(
        target_feature = "sse2",
        any(target_arch = "x86", target_arch = "x86_64"),
        not(miri)
    ))
))]
mod generic {
    use crate::control::BitMask;
    use crate::control::EMPTY;

    const LSB: u64 = 0x0101_0101_0101_0101;
    const LOW7: u64 = 0x7F7F_7F7F_7F7F_7F7F;
    const MSB: u64 = 0x8080_8080_8080_8080;

    /// Sets `0x80` in exactly the bytes of `x` that are zero.
    #[inline(always)]
    fn zero_bytes(x: u64) -> u64 {
        !(((x & LOW7) + LOW7) | x | LOW7)
    }

    /// Packs the top bit of each byte into the low 8 bits.
    #[inline(always)]
    fn movemask(x: u64) -> u16 {
        (((x & MSB) >> 7).wrapping_mul(0x0102_0408_1020_4080) >> 56) as u16
    }

    #[derive(Clone, Copy)]
    pub(crate) struct Group {
        lo: u64,
        hi: u64,
    }

    impl Group {
        pub(crate) const WIDTH: usize = 16;

        /// Loads a group of control bytes.
        ///
        /// # Safety
        ///
        /// `ptr` must be valid for reads of `WIDTH` bytes and aligned to
        /// `WIDTH`.
        #[inline(always)]
        pub(crate) unsafe fn load_aligned(ptr: *const u8) -> Self {
            debug_assert_eq!(ptr as usize % Self::WIDTH, 0);
            // SAFETY: Caller guarantees `WIDTH` readable bytes.
            unsafe {
                Group {
                    lo: u64::from_le(core::ptr::read_unaligned(ptr as *const u64)),
                    hi: u64::from_le(core::ptr::read_unaligned(ptr.add(8) as *const u64)),
                }
            }
        }

        #[inline(always)]
        fn combine(self, f: impl Fn(u64) -> u64) -> BitMask {
            BitMask(movemask(f(self.lo)) | (movemask(f(self.hi)) << 8))
        }

        #[inline(always)]
        pub(crate) fn match_tag(self, tag: u8) -> BitMask {
            let repeated = LSB.wrapping_mul(tag as u64);
            self.combine(|word| zero_bytes(word ^ repeated))
        }

        #[inline(always)]
        pub(crate) fn match_empty(self) -> BitMask {
            self.match_tag(EMPTY)
        }

        /// Positions whose control byte has the top bit set.
        #[inline(always)]
        pub(crate) fn match_empty_or_erased(self) -> BitMask {
            self.combine(|word| word)
        }

        #[inline(always)]
        pub(crate) fn match_full(self) -> BitMask {
            BitMask(!self.match_empty_or_erased().0)
        }
    }
}

cfg_if::cfg_if! {
    // SSE2 compares all 16 bytes with one instruction. Everywhere else we fall
    // back to scanning two 64-bit words with bit tricks, which keeps the group
    // width (and therefore the table geometry) identical on every target.
    if #[cfg(all(
        target_feature = "sse2",
        any(target_arch = "x86", target_arch = "x86_64"),
        not(miri)
    ))] {
        pub(crate) use sse2::Group;
    } else {
        pub(crate) use generic::Group;
    }
}

/// Number of control bytes scanned together.
pub const GROUP_WIDTH: usize = Group::WIDTH;

// Scan results are 16-bit masks.
const _: () = assert!(Group::WIDTH == 16);

#[cfg(test)]
mod tests {
    use crate::control::BitMask;
    use crate::control::EMPTY;
    use crate::control::ERASED;

    #[repr(C, align(16))]
    struct Aligned([u8; 16]);

    fn reference_mask(bytes: &[u8; 16], pred: impl Fn(u8) -> bool) -> BitMask {
        let mut bits = 0u16;
        for (i, &b) in bytes.iter().enumerate() {
            if pred(b) {
                bits |= 1 << i;
            }
        }
        BitMask(bits)
    }

    // The same checks run against every backend compiled for this target.
    macro_rules! backend_tests {
        ($backend:ident) => {
            mod $backend {
                use rand::Rng;
                use rand::SeedableRng;
                use rand::rngs::SmallRng;

                use super::*;
                use crate::group::$backend::Group;

                fn load(bytes: [u8; 16]) -> Group {
                    let aligned = Aligned(bytes);
                    // SAFETY: `aligned` is 16 readable bytes with 16-byte alignment.
                    unsafe { Group::load_aligned(aligned.0.as_ptr()) }
                }

                #[test]
                fn all_empty_group() {
                    let group = load([EMPTY; 16]);
                    assert_eq!(group.match_empty(), BitMask(0xFFFF));
                    assert_eq!(group.match_empty_or_erased(), BitMask(0xFFFF));
                    assert_eq!(group.match_full(), BitMask(0));
                    assert_eq!(group.match_tag(0x12), BitMask(0));
                }

                #[test]
                fn mixed_group_matches_exactly() {
                    let mut bytes = [EMPTY; 16];
                    bytes[0] = 0x12;
                    bytes[3] = ERASED;
                    bytes[4] = 0x12;
                    bytes[7] = 0x13;
                    bytes[8] = 0x00;
                    bytes[9] = 0x7F;
                    bytes[15] = 0x12;
                    let group = load(bytes);

                    assert_eq!(group.match_tag(0x12), BitMask(0b1000_0000_0001_0001));
                    assert_eq!(group.match_tag(0x13), BitMask(1 << 7));
                    assert_eq!(group.match_tag(0x00), BitMask(1 << 8));
                    assert_eq!(group.match_tag(0x7F), BitMask(1 << 9));
                    assert_eq!(group.match_tag(ERASED), BitMask(1 << 3));
                    assert_eq!(
                        group.match_full(),
                        reference_mask(&bytes, |b| b & 0x80 == 0)
                    );
                    assert_eq!(group.match_empty(), reference_mask(&bytes, |b| b == EMPTY));
                }

                #[test]
                fn every_byte_pattern_position() {
                    // Neighbouring bytes differing by one bit must never leak
                    // into each other's match.
                    for tag in [0x00u8, 0x01, 0x40, 0x7E, 0x7F] {
                        for pos in 0..16 {
                            let mut bytes = [tag ^ 1; 16];
                            bytes[pos] = tag;
                            let group = load(bytes);
                            assert_eq!(
                                group.match_tag(tag),
                                BitMask(1 << pos),
                                "tag {tag:#x} pos {pos}"
                            );
                        }
                    }
                }

                #[test]
                fn random_groups_match_reference() {
                    let mut rng = SmallRng::seed_from_u64(0x5EED);
                    for _ in 0..10_000 {
                        let mut bytes = [0u8; 16];
                        rng.fill(&mut bytes);
                        // Skew towards repeated tags so partial matches are common.
                        let tag = bytes[rng.random_range(0..16)] & 0x7F;
                        bytes[rng.random_range(0..16)] = tag;
                        let group = load(bytes);

                        assert_eq!(group.match_tag(tag), reference_mask(&bytes, |b| b == tag));
                        assert_eq!(group.match_empty(), reference_mask(&bytes, |b| b == EMPTY));
                        assert_eq!(
                            group.match_empty_or_erased(),
                            reference_mask(&bytes, |b| b & 0x80 != 0)
                        );
                        assert_eq!(
                            group.match_full(),
                            reference_mask(&bytes, |b| b & 0x80 == 0)
                        );
                    }
                }
            }
        };
    }

    #[cfg(all(
        target_feature = "sse2",
        any(target_arch = "x86", target_arch = "x86_64"),
        not(miri)
    ))]
    backend_tests!(sse2);
    backend_tests!(generic);
}
