//! Alignment arithmetic shared by the platform layer and the arena.
//!
//! All helpers take power-of-two alignments. Callers that accept
//! user-supplied alignments must go through [`clamp_alignment`] first.

/// Largest alignment an arena push will honour. Larger requests are clamped.
pub const MAX_ALIGN: usize = 4096;

/// Round `value` up to the next multiple of `align`.
///
/// Returns `None` on overflow. `align` must be a power of two.
#[inline]
pub fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    let mask = align - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

/// Round `value` down to the previous multiple of `align`.
///
/// `align` must be a power of two.
#[inline]
pub fn align_down(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value & !(align - 1)
}

/// Round `value` up to a multiple of `granule`, which need not be a
/// power of two.
///
/// Returns `None` on overflow or if `granule` is zero.
#[inline]
pub fn round_up(value: usize, granule: usize) -> Option<usize> {
    if granule == 0 {
        return None;
    }
    let rem = value % granule;
    if rem == 0 {
        Some(value)
    } else {
        value.checked_add(granule - rem)
    }
}

/// Normalise a requested push alignment.
///
/// Clamps to `[1, MAX_ALIGN]` and rounds non-powers of two up to the next
/// power of two, so the result is always usable with [`align_up`].
#[inline]
pub fn clamp_alignment(align: usize) -> usize {
    align.clamp(1, MAX_ALIGN).next_power_of_two()
}

/// Padding needed to bring `offset` up to `align`.
#[inline]
pub fn padding_for(offset: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    offset.wrapping_neg() & (align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(0, 16), Some(0));
        assert_eq!(align_up(1, 16), Some(16));
        assert_eq!(align_up(16, 16), Some(16));
        assert_eq!(align_up(17, 16), Some(32));
        assert_eq!(align_up(usize::MAX, 16), None);
    }

    #[test]
    fn align_down_truncates() {
        assert_eq!(align_down(70_112, 65_536), 65_536);
        assert_eq!(align_down(65_535, 65_536), 0);
    }

    #[test]
    fn round_up_handles_non_power_granules() {
        assert_eq!(round_up(10, 3), Some(12));
        assert_eq!(round_up(9, 3), Some(9));
        assert_eq!(round_up(9, 0), None);
    }

    #[test]
    fn clamp_alignment_bounds() {
        assert_eq!(clamp_alignment(0), 1);
        assert_eq!(clamp_alignment(1), 1);
        assert_eq!(clamp_alignment(3), 4);
        assert_eq!(clamp_alignment(4096), 4096);
        assert_eq!(clamp_alignment(8192), 4096);
        assert_eq!(clamp_alignment(usize::MAX), 4096);
    }

    #[test]
    fn padding_matches_align_up() {
        for offset in [0usize, 1, 63, 64, 65, 4095, 4097] {
            for align in [1usize, 2, 8, 64, 4096] {
                let pad = padding_for(offset, align);
                assert_eq!(offset + pad, align_up(offset, align).unwrap());
            }
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn padded_offset_is_aligned(
                offset in 0usize..(1 << 40),
                shift in 0u32..13,
            ) {
                let align = 1usize << shift;
                let pad = padding_for(offset, align);
                prop_assert!(pad < align);
                prop_assert_eq!((offset + pad) % align, 0);
            }

            #[test]
            fn clamped_alignment_is_power_of_two(align in any::<usize>()) {
                let a = clamp_alignment(align);
                prop_assert!(a.is_power_of_two());
                prop_assert!(a <= MAX_ALIGN);
            }
        }
    }
}
