//! Rank/select bit vector with a two-level rank directory.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use crate::bit_buffer::BitBuffer;
use crate::bit_vectors::{Access, NumBits, Rank, Select};
use crate::broadword;
use crate::error::{Error, Result};
use crate::serialization::Serializable;

/// The number of bits in a machine word.
pub const WORD_LEN: usize = std::mem::size_of::<u64>() * 8;

/// The number of bits covered by one small block (one word).
const SMALL_LEN: usize = WORD_LEN;
/// The number of bits covered by one large block.
const LARGE_LEN: usize = 512;
/// The number of small blocks per large block.
const WORDS_PER_LARGE: usize = LARGE_LEN / SMALL_LEN;

/// Rank/select bit vector with a two-level rank directory.
///
/// The bits are stored verbatim in 64-bit words, LSB-first relative to the
/// logical index so that the rank kernel reduces to a popcount of a word
/// suffix. A directory entry per 512-bit large block stores
/// $`\textrm{Rank}(j \cdot 512)`$; rank adds word popcounts below that, and
/// select binary-searches the directory before finishing with
/// [`broadword::select_in_word`].
///
/// The vector has two phases: bits are loaded with [`Self::set_bit`] (or
/// ingested from a [`BitBuffer`], whose MSB-first words are bit-reversed on
/// the way in), then [`Self::build`] freezes it for querying. Rank and
/// select queries before `build()` fail with
/// [`Error::NotBuilt`].
///
/// # Examples
///
/// ```
/// use ribbit::bit_vectors::{Access, NumBits, Rank, RsBitVector, Select};
///
/// let bv = RsBitVector::from_bits([true, false, false, true]);
///
/// assert_eq!(bv.num_bits(), 4);
/// assert_eq!(bv.num_ones(), 2);
///
/// assert_eq!(bv.access(1)?, false);
///
/// assert_eq!(bv.rank1(1)?, 1);
/// assert_eq!(bv.rank0(1)?, 0);
///
/// assert_eq!(bv.select1(1)?, 3);
/// assert_eq!(bv.select0(0)?, 1);
/// # Ok::<(), ribbit::Error>(())
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct RsBitVector {
    words: Vec<u64>,
    len: usize,
    num_ones: usize,
    large_ranks: Vec<u64>,
    built: bool,
}

impl RsBitVector {
    /// Creates a new empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty vector with room for at least `capa` bits
    /// reserved.
    pub fn with_capacity(capa: usize) -> Self {
        Self {
            words: Vec::with_capacity(Self::words_for(capa)),
            ..Self::default()
        }
    }

    /// Creates a built vector holding the bits of `buf`.
    ///
    /// The buffer's MSB-first words are converted to this vector's LSB-first
    /// layout through [`broadword::reverse`]; this is the only place the two
    /// conventions meet.
    pub fn from_bit_buffer(buf: &BitBuffer) -> Self {
        let mut this = Self {
            words: buf.words().iter().map(|&w| broadword::reverse(w)).collect(),
            len: buf.len(),
            ..Self::default()
        };
        this.build();
        this
    }

    /// Creates a built vector from input bit stream `bits`.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut this = Self::new();
        for (pos, bit) in bits.into_iter().enumerate() {
            this.set_bit(pos, bit);
        }
        this.build();
        this
    }

    /// Sets the `pos`-th bit to `bit`, growing the vector to `pos + 1` bits
    /// if it is shorter. Bits opened up by growth are zero.
    ///
    /// Must not be called once the vector is built; the rank directory would
    /// go stale.
    pub fn set_bit(&mut self, pos: usize, bit: bool) {
        debug_assert!(!self.built, "set_bit on a built vector");
        if pos >= self.len {
            self.len = pos + 1;
            let need = Self::words_for(self.len);
            if self.words.len() < need {
                self.words.resize(need, 0);
            }
        }
        let mask = 1u64 << (pos % WORD_LEN);
        if bit {
            self.words[pos / WORD_LEN] |= mask;
        } else {
            self.words[pos / WORD_LEN] &= !mask;
        }
    }

    /// Builds the rank directory in a single sweep over the words, freezing
    /// the vector for queries.
    pub fn build(&mut self) {
        let mut large_ranks =
            Vec::with_capacity((self.words.len() + WORDS_PER_LARGE - 1) / WORDS_PER_LARGE);
        let mut rank = 0u64;
        for (q, &w) in self.words.iter().enumerate() {
            if q % WORDS_PER_LARGE == 0 {
                large_ranks.push(rank);
            }
            rank += broadword::popcount(w) as u64;
        }
        self.large_ranks = large_ranks;
        self.num_ones = rank as usize;
        self.built = true;
    }

    /// Returns the number of bits stored.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the vector is empty.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Checks if [`Self::build`] has been called.
    pub const fn is_built(&self) -> bool {
        self.built
    }

    /// Returns the raw word slice (LSB-first layout).
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    fn check_built(&self, what: &str) -> Result<()> {
        if self.built {
            Ok(())
        } else {
            Err(Error::not_built(format!(
                "{what} requires build() to have been called."
            )))
        }
    }

    #[inline(always)]
    const fn words_for(n: usize) -> usize {
        (n + WORD_LEN - 1) / WORD_LEN
    }
}

impl NumBits for RsBitVector {
    fn num_bits(&self) -> usize {
        self.len
    }

    /// Returns the number of bits set. On an unbuilt vector this is a linear
    /// scan; after [`RsBitVector::build`] it is the stored total.
    fn num_ones(&self) -> usize {
        if self.built {
            self.num_ones
        } else {
            self.words.iter().map(|&w| broadword::popcount(w)).sum()
        }
    }
}

impl Access for RsBitVector {
    fn access(&self, pos: usize) -> Result<bool> {
        if self.len <= pos {
            return Err(Error::out_of_bounds(format!(
                "pos must be less than self.len()={}, but got {pos}.",
                self.len
            )));
        }
        Ok((self.words[pos / WORD_LEN] >> (pos % WORD_LEN)) & 1 == 1)
    }
}

impl Rank for RsBitVector {
    /// Returns the number of ones from the 0-th bit to the `pos-1`-th bit.
    ///
    /// # Complexity
    ///
    /// Constant: one directory lookup, at most seven whole-word popcounts,
    /// and one suffix popcount.
    fn rank1(&self, pos: usize) -> Result<usize> {
        self.check_built("rank1")?;
        if self.len < pos {
            return Err(Error::out_of_bounds(format!(
                "pos must be no greater than self.len()={}, but got {pos}.",
                self.len
            )));
        }
        if pos == 0 {
            return Ok(0);
        }
        let last = pos - 1;
        let (q_large, q_small) = (last / LARGE_LEN, last / SMALL_LEN);
        let left = last % SMALL_LEN + 1;
        let mut r = self.large_ranks[q_large] as usize;
        for q in (q_large * WORDS_PER_LARGE)..q_small {
            r += broadword::popcount(self.words[q]);
        }
        r += broadword::popcount(self.words[q_small] << (WORD_LEN - left));
        Ok(r)
    }

    fn rank0(&self, pos: usize) -> Result<usize> {
        Ok(pos - self.rank1(pos)?)
    }
}

impl Select for RsBitVector {
    /// Searches the position of the `k`-th bit set.
    ///
    /// # Complexity
    ///
    /// Logarithmic in the number of large blocks, then constant.
    fn select1(&self, k: usize) -> Result<usize> {
        self.check_built("select1")?;
        if self.num_ones <= k {
            return Err(Error::out_of_bounds(format!(
                "k must be less than self.num_ones()={}, but got {k}.",
                self.num_ones
            )));
        }
        let (mut a, mut b) = (0, self.large_ranks.len());
        while b - a > 1 {
            let mid = a + (b - a) / 2;
            if self.large_ranks[mid] as usize <= k {
                a = mid;
            } else {
                b = mid;
            }
        }
        let mut rem = k - self.large_ranks[a] as usize;
        let mut q = a * WORDS_PER_LARGE;
        loop {
            let cnt = broadword::popcount(self.words[q]);
            if rem < cnt {
                break;
            }
            rem -= cnt;
            q += 1;
        }
        Ok(q * WORD_LEN + broadword::select_in_word(self.words[q], rem).unwrap())
    }

    fn select0(&self, k: usize) -> Result<usize> {
        self.check_built("select0")?;
        if self.len - self.num_ones <= k {
            return Err(Error::out_of_bounds(format!(
                "k must be less than self.num_zeros()={}, but got {k}.",
                self.len - self.num_ones
            )));
        }
        let (mut a, mut b) = (0, self.large_ranks.len());
        while b - a > 1 {
            let mid = a + (b - a) / 2;
            if mid * LARGE_LEN - self.large_ranks[mid] as usize <= k {
                a = mid;
            } else {
                b = mid;
            }
        }
        let mut rem = k - (a * LARGE_LEN - self.large_ranks[a] as usize);
        let mut q = a * WORDS_PER_LARGE;
        loop {
            let cnt = broadword::popcount(!self.words[q]);
            if rem < cnt {
                break;
            }
            rem -= cnt;
            q += 1;
        }
        let sel = q * WORD_LEN + broadword::select_in_word(!self.words[q], rem).unwrap();
        // Padding zeros in the last word sit above every in-range zero, so a
        // bounds-checked k never lands on them.
        debug_assert!(sel < self.len);
        Ok(sel)
    }
}

impl Serializable for RsBitVector {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        self.check_built("serialization")?;
        let mut mem = (self.len as u64).serialize_into(&mut writer)?;
        mem += (self.num_ones as u64).serialize_into(&mut writer)?;
        mem += self.words.serialize_into(&mut writer)?;
        mem += self.large_ranks.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let len = u64::deserialize_from(&mut reader)? as usize;
        let num_ones = u64::deserialize_from(&mut reader)? as usize;
        let words = Vec::<u64>::deserialize_from(&mut reader)?;
        let large_ranks = Vec::<u64>::deserialize_from(&mut reader)?;
        if words.len() != Self::words_for(len) {
            return Err(Error::invalid_metadata(format!(
                "expected {} words for a vector of {} bits, but got {}.",
                Self::words_for(len),
                len,
                words.len()
            )));
        }
        let expected_ranks = (words.len() + WORDS_PER_LARGE - 1) / WORDS_PER_LARGE;
        if large_ranks.len() != expected_ranks {
            return Err(Error::invalid_metadata(format!(
                "expected {} rank samples, but got {}.",
                expected_ranks,
                large_ranks.len()
            )));
        }
        Ok(Self {
            words,
            len,
            num_ones,
            large_ranks,
            built: true,
        })
    }

    fn size_in_bytes(&self) -> usize {
        8 + 8 + self.words.size_in_bytes() + self.large_ranks.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn gen_random_bits(len: usize, seed: u64) -> Vec<bool> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen::<bool>()).collect()
    }

    fn verify_queries(bits: &[bool], bv: &RsBitVector) {
        assert_eq!(bits.len(), bv.num_bits());
        let mut ones = 0;
        let mut zeros = 0;
        for (i, &b) in bits.iter().enumerate() {
            assert_eq!(bv.access(i).unwrap(), b);
            assert_eq!(bv.rank1(i).unwrap(), ones);
            assert_eq!(bv.rank0(i).unwrap(), zeros);
            if b {
                assert_eq!(bv.select1(ones).unwrap(), i);
                ones += 1;
            } else {
                assert_eq!(bv.select0(zeros).unwrap(), i);
                zeros += 1;
            }
        }
        assert_eq!(bv.rank1(bits.len()).unwrap(), ones);
        assert_eq!(bv.rank0(bits.len()).unwrap(), zeros);
        assert_eq!(bv.num_ones(), ones);
        assert_eq!(bv.num_zeros(), zeros);
    }

    #[test]
    fn test_tiny_bits() {
        let bv = RsBitVector::from_bits([true, false, false, true, false, true, true]);
        assert_eq!(bv.select1(0).unwrap(), 0);
        assert_eq!(bv.select1(1).unwrap(), 3);
        assert_eq!(bv.select1(2).unwrap(), 5);
        assert_eq!(bv.select1(3).unwrap(), 6);
        assert_eq!(bv.select0(0).unwrap(), 1);
        assert_eq!(bv.select0(1).unwrap(), 2);
        assert_eq!(bv.select0(2).unwrap(), 4);
    }

    #[test]
    fn test_listed_positions() {
        let positions = [0, 511, 512, 1000, 2000, 2015, 2016, 2017, 3000];
        let mut bv = RsBitVector::new();
        bv.set_bit(3000, false);
        for &p in &positions {
            bv.set_bit(p, true);
        }
        bv.build();
        assert_eq!(bv.len(), 3001);
        for (k, &p) in positions.iter().enumerate() {
            assert_eq!(bv.select1(k).unwrap(), p);
            assert_eq!(bv.rank1(p).unwrap(), k);
        }
        assert_eq!(bv.rank1(3001).unwrap(), 9);
        assert_eq!(bv.access(2016).unwrap(), true);
        assert_eq!(bv.access(2015).unwrap(), true);
        assert_eq!(bv.access(2014).unwrap(), false);
    }

    #[test]
    fn test_boundary_lengths() {
        for n in [1, 63, 64, 65, 511, 512, 513, 2016, 2017] {
            let zeros = vec![false; n];
            verify_queries(&zeros, &RsBitVector::from_bits(zeros.iter().copied()));
            let ones = vec![true; n];
            verify_queries(&ones, &RsBitVector::from_bits(ones.iter().copied()));
            let bits = gen_random_bits(n, n as u64);
            verify_queries(&bits, &RsBitVector::from_bits(bits.iter().copied()));
        }
    }

    #[test]
    fn test_empty() {
        let bv = RsBitVector::from_bits([]);
        assert!(bv.is_empty());
        assert_eq!(bv.rank1(0).unwrap(), 0);
        assert_eq!(bv.rank0(0).unwrap(), 0);
        assert!(bv.select1(0).is_err());
        assert!(bv.select0(0).is_err());
    }

    #[test]
    fn test_random_bits() {
        for seed in 0..5 {
            let bits = gen_random_bits(10000, seed);
            let bv = RsBitVector::from_bits(bits.iter().copied());
            verify_queries(&bits, &bv);
        }
    }

    #[test]
    fn test_from_bit_buffer() {
        let bits = gen_random_bits(4321, 99);
        let mut buf = BitBuffer::new();
        for &b in &bits {
            buf.push_bits(b as u64, 1).unwrap();
        }
        let bv = RsBitVector::from_bit_buffer(&buf);
        verify_queries(&bits, &bv);
        assert_eq!(bv, RsBitVector::from_bits(bits.iter().copied()));
    }

    #[test]
    fn test_not_built() {
        let mut bv = RsBitVector::new();
        bv.set_bit(100, true);
        assert!(matches!(bv.rank1(5), Err(Error::NotBuilt(_))));
        assert!(matches!(bv.rank0(5), Err(Error::NotBuilt(_))));
        assert!(matches!(bv.select1(0), Err(Error::NotBuilt(_))));
        assert!(matches!(bv.select0(0), Err(Error::NotBuilt(_))));
        let mut bytes = vec![];
        assert!(matches!(
            bv.serialize_into(&mut bytes),
            Err(Error::NotBuilt(_))
        ));
        // Access works without the directory.
        assert_eq!(bv.access(100).unwrap(), true);
        assert_eq!(bv.num_ones(), 1);
    }

    #[test]
    fn test_query_oob() {
        let bv = RsBitVector::from_bits(gen_random_bits(200, 5).iter().copied());
        assert!(matches!(bv.access(200), Err(Error::OutOfBounds(_))));
        assert!(matches!(bv.rank1(201), Err(Error::OutOfBounds(_))));
        assert!(matches!(bv.rank0(201), Err(Error::OutOfBounds(_))));
        assert!(matches!(
            bv.select1(bv.num_ones()),
            Err(Error::OutOfBounds(_))
        ));
        assert!(matches!(
            bv.select0(bv.num_zeros()),
            Err(Error::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_serialize() {
        let bits = gen_random_bits(3000, 77);
        let bv = RsBitVector::from_bits(bits.iter().copied());
        let mut bytes = vec![];
        let size = bv.serialize_into(&mut bytes).unwrap();
        let other = RsBitVector::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(bv, other);
        assert_eq!(size, bytes.len());
        assert_eq!(size, bv.size_in_bytes());
        verify_queries(&bits, &other);
    }

    #[test]
    fn test_deserialize_rejects_rank_mismatch() {
        let bv = RsBitVector::from_bits([true; 100]);
        let mut bytes = vec![];
        bv.serialize_into(&mut bytes).unwrap();
        // Truncate the rank sample count to zero.
        let off = bytes.len() - (4 + 8);
        bytes.truncate(off);
        0i32.serialize_into(&mut bytes).unwrap();
        let e = RsBitVector::deserialize_from(&bytes[..]).unwrap_err();
        assert!(matches!(e, Error::InvalidMetadata(_)));
    }
}
