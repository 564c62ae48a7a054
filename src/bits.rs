//! Bit-twiddling helpers shared by the bucketed growable array and the
//! tiered index: pure functions over machine words, kept out of those
//! modules so the allocation/traversal logic isn't cluttered with bit math.

/// Index (from zero) of the highest set bit of `v`. Panics on zero, same as
/// the original `bit_utils::highest_bit`, since every caller adds a
/// non-zero bias (`FBS`) before calling this.
#[inline]
pub(crate) fn highest_bit(v: u32) -> u32 {
    debug_assert!(v != 0, "highest_bit of zero is undefined");
    31 - v.leading_zeros()
}

#[cfg(test)]
mod bits_test {
    use super::*;

    #[test]
    fn test_highest_bit() {
        assert_eq!(highest_bit(1), 0);
        assert_eq!(highest_bit(2), 1);
        assert_eq!(highest_bit(3), 1);
        assert_eq!(highest_bit(16), 4);
        assert_eq!(highest_bit(17), 4);
        assert_eq!(highest_bit(0xFFFF_FFFF), 31);
    }
}
