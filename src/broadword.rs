//! Broadword (SWAR) kernels for 64-bit words.
//!
//! These are the constant-time primitives the query paths are built on:
//! population count, floor-log2, in-word select, and the single bit-reversal
//! primitive that converts between the two bit-order conventions used in this
//! crate (see [`crate::bit_buffer::BitBuffer`] and
//! [`crate::bit_vectors::RsBitVector`]).

const ONES_STEP_8: u64 = 0x0101_0101_0101_0101;
const MSBS_STEP_8: u64 = 0x8080_8080_8080_8080;

/// Returns the number of bits set in `x`.
#[inline(always)]
pub fn popcount(x: u64) -> usize {
    x.count_ones() as usize
}

/// Returns the index of the highest bit set in `x`, i.e. `floor(log2(x))`,
/// or [`None`] if `x == 0`.
///
/// # Examples
///
/// ```
/// use ribbit::broadword::msb;
///
/// assert_eq!(msb(1), Some(0));
/// assert_eq!(msb(0b1010), Some(3));
/// assert_eq!(msb(0), None);
/// ```
#[inline(always)]
pub fn msb(x: u64) -> Option<usize> {
    (x != 0).then(|| 63 - x.leading_zeros() as usize)
}

/// Returns the index of the lowest bit set in `x`, or [`None`] if `x == 0`.
#[inline(always)]
pub fn lsb(x: u64) -> Option<usize> {
    (x != 0).then(|| x.trailing_zeros() as usize)
}

/// Reverses the bit order of `x`, mapping bit `i` to bit `63 - i`.
///
/// This is the only conversion point between the MSB-first convention of
/// [`BitBuffer`](crate::bit_buffer::BitBuffer) words and the LSB-first
/// convention the rank/select kernels operate on.
#[inline(always)]
pub fn reverse(x: u64) -> u64 {
    x.reverse_bits()
}

/// Searches the position of the `k`-th (0-based) bit set in `x`, counting
/// from the least significant bit, or [`None`] if `popcount(x) <= k`.
///
/// The byte containing the target bit is located with byte-parallel prefix
/// sums in constant time; the position within the byte is then resolved by
/// clearing the `k` lowest survivors.
///
/// # Examples
///
/// ```
/// use ribbit::broadword::select_in_word;
///
/// assert_eq!(select_in_word(0b1010, 0), Some(1));
/// assert_eq!(select_in_word(0b1010, 1), Some(3));
/// assert_eq!(select_in_word(0b1010, 2), None);
/// ```
#[inline(always)]
pub fn select_in_word(x: u64, k: usize) -> Option<usize> {
    if popcount(x) <= k {
        return None;
    }
    // Byte-wise popcounts, then inclusive prefix sums in each byte lane.
    let mut s = x - ((x >> 1) & 0x5555_5555_5555_5555);
    s = (s & 0x3333_3333_3333_3333) + ((s >> 2) & 0x3333_3333_3333_3333);
    s = (s + (s >> 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    let sums = s.wrapping_mul(ONES_STEP_8);

    // Count the bytes whose inclusive prefix sum is <= k; that count is the
    // index of the byte holding the k-th set bit.
    let k_step = (k as u64) * ONES_STEP_8;
    let geq = ((k_step | MSBS_STEP_8) - sums) & MSBS_STEP_8;
    let byte_idx = geq.count_ones() as usize;
    debug_assert!(byte_idx < 8);

    let prefix = ((sums << 8) >> (byte_idx * 8)) & 0xFF;
    let mut rank_in_byte = k as u64 - prefix;
    let mut byte = (x >> (byte_idx * 8)) & 0xFF;
    while rank_in_byte > 0 {
        byte &= byte - 1;
        rank_in_byte -= 1;
    }
    Some(byte_idx * 8 + byte.trailing_zeros() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn select_naive(x: u64, k: usize) -> Option<usize> {
        let mut rank = 0;
        for i in 0..64 {
            if (x >> i) & 1 == 1 {
                if rank == k {
                    return Some(i);
                }
                rank += 1;
            }
        }
        None
    }

    #[test]
    fn test_msb_lsb() {
        assert_eq!(msb(0), None);
        assert_eq!(lsb(0), None);
        assert_eq!(msb(u64::MAX), Some(63));
        assert_eq!(lsb(u64::MAX), Some(0));
        for i in 0..64 {
            assert_eq!(msb(1 << i), Some(i as usize));
            assert_eq!(lsb(1 << i), Some(i as usize));
        }
    }

    #[test]
    fn test_reverse() {
        assert_eq!(reverse(0), 0);
        assert_eq!(reverse(1), 1 << 63);
        for i in 0..64 {
            assert_eq!(reverse(1 << i), 1 << (63 - i));
        }
        let mut rng = ChaChaRng::seed_from_u64(7);
        for _ in 0..100 {
            let x: u64 = rng.gen();
            assert_eq!(reverse(reverse(x)), x);
        }
    }

    #[test]
    fn test_select_in_word_patterns() {
        assert_eq!(select_in_word(0, 0), None);
        assert_eq!(select_in_word(u64::MAX, 63), Some(63));
        assert_eq!(select_in_word(u64::MAX, 64), None);
        for i in 0..64 {
            assert_eq!(select_in_word(1 << i, 0), Some(i as usize));
        }
    }

    #[test]
    fn test_select_in_word_random() {
        let mut rng = ChaChaRng::seed_from_u64(13);
        for _ in 0..1000 {
            let x: u64 = rng.gen();
            for k in 0..=popcount(x) {
                assert_eq!(select_in_word(x, k), select_naive(x, k));
            }
        }
    }
}
