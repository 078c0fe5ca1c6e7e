//! Compressed rank/select bit vector with block class/offset encoding.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};
use std::sync::OnceLock;

use crate::bit_buffer::BitBuffer;
use crate::bit_vectors::{Access, NumBits, Rank, Select};
use crate::broadword;
use crate::error::{Error, Result};
use crate::mii_sequences::EliasFano;
use crate::serialization::Serializable;

/// The number of bits per block. One bit short of a word so a block and its
/// intermediate sums always fit in a `u64`.
const BLOCK_LEN: usize = 63;
/// The number of blocks per super-block.
const BLOCKS_PER_SUPER: usize = 32;
/// The number of bits per super-block.
const SUPER_LEN: usize = BLOCK_LEN * BLOCKS_PER_SUPER;
/// The number of bits storing a block class, enough for `0..=63`.
const CLASS_BITS: usize = 6;
/// All 63 block bits set.
const BLOCK_MASK: u64 = (1 << BLOCK_LEN) - 1;

struct Tables {
    /// `binomial[n][k]` is the standard binomial coefficient for
    /// `n, k >= 1`, with the `binomial[0][*] = binomial[*][0] = 0` boundary
    /// the coding kernel relies on.
    binomial: [[u64; BLOCK_LEN + 1]; BLOCK_LEN + 1],
    /// `offset_bits[c]` is the stored width of an offset of class `c`:
    /// `ceil(lg(binomial[63][c] + 1))`.
    offset_bits: [usize; BLOCK_LEN + 1],
    max_offset_bits: usize,
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut pascal = [[0u64; BLOCK_LEN + 1]; BLOCK_LEN + 1];
        for n in 0..=BLOCK_LEN {
            pascal[n][0] = 1;
            for k in 1..=n {
                pascal[n][k] = pascal[n - 1][k - 1] + pascal[n - 1][k];
            }
        }
        let mut binomial = [[0u64; BLOCK_LEN + 1]; BLOCK_LEN + 1];
        for n in 1..=BLOCK_LEN {
            for k in 1..=BLOCK_LEN {
                binomial[n][k] = pascal[n][k];
            }
        }
        let mut offset_bits = [0usize; BLOCK_LEN + 1];
        for c in 0..=BLOCK_LEN {
            offset_bits[c] = 64 - binomial[BLOCK_LEN][c].leading_zeros() as usize;
        }
        let max_offset_bits = *offset_bits.iter().max().unwrap();
        Tables {
            binomial,
            offset_bits,
            max_offset_bits,
        }
    })
}

/// Returns the lexicographic rank of `block` among all 63-bit values of
/// popcount `class`.
///
/// Scans bit positions from high to low; every set bit at position `i`
/// contributes `binomial[i][c]` where `c` counts the ones not yet consumed.
fn offset_of(block: u64, class: usize, t: &Tables) -> u64 {
    debug_assert_eq!(broadword::popcount(block), class);
    let mut offset = 0;
    let mut c = class;
    for i in (0..BLOCK_LEN).rev() {
        if c == 0 {
            break;
        }
        if (block >> i) & 1 == 1 {
            offset += t.binomial[i][c];
            c -= 1;
        }
    }
    offset
}

/// Inverse of [`offset_of`]: reconstructs the unique 63-bit block of
/// popcount `class` whose lexicographic rank is `offset`.
fn block_of_offset(mut offset: u64, class: usize, t: &Tables) -> u64 {
    let mut block = 0u64;
    let mut c = class;
    for i in (0..BLOCK_LEN).rev() {
        if c == 0 {
            break;
        }
        let w = t.binomial[i][c];
        if offset >= w {
            block |= 1 << i;
            offset -= w;
            c -= 1;
        }
    }
    debug_assert_eq!(offset, 0);
    block
}

/// Compressed rank/select bit vector with block class/offset encoding
/// (Raman-Raman-Rao).
///
/// The bits are cut into 63-bit blocks. Each block is stored as its *class*
/// (popcount, 6 bits) plus its *offset* (lexicographic rank among the
/// $`\binom{63}{c}`$ blocks of the same class, in
/// $`\lceil \lg (\binom{63}{c} + 1) \rceil`$ bits), which compresses the
/// vector to $`n H_0 + o(n)`$ bits. Every 32nd block, a super-block sample
/// records the running rank and the bit position of the block's offset code;
/// both sample sequences are themselves [`EliasFano`]-compressed.
///
/// Queries decode at most one block: rank sums class codes from the
/// super-block sample, select binary-searches the samples and finishes with
/// [`broadword::select_in_word`] on the decoded block, and all-zero /
/// all-one super-blocks are answered from the samples alone.
///
/// # Examples
///
/// ```
/// use ribbit::bit_vectors::{Access, NumBits, Rank, RrrBitVector, Select};
///
/// let bv = RrrBitVector::from_bits([true, false, false, true]);
///
/// assert_eq!(bv.num_bits(), 4);
/// assert_eq!(bv.num_ones(), 2);
///
/// assert_eq!(bv.access(1)?, false);
/// assert_eq!(bv.rank1(4)?, 2);
/// assert_eq!(bv.select1(1)?, 3);
/// assert_eq!(bv.select0(0)?, 1);
/// # Ok::<(), ribbit::Error>(())
/// ```
///
/// # References
///
///  - R. Raman, V. Raman, and S. S. Rao, "Succinct indexable dictionaries
///    with applications to encoding k-ary trees and multisets," In SODA,
///    2002.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RrrBitVector {
    len: usize,
    num_ones: usize,
    classes: BitBuffer,
    offsets: BitBuffer,
    rank_samples: EliasFano,
    offset_pos_samples: EliasFano,
}

impl RrrBitVector {
    /// Creates a compressed vector holding the bits of `buf`, in one linear
    /// pass over the source.
    pub fn from_bit_buffer(buf: &BitBuffer) -> Self {
        let t = tables();
        let len = buf.len();
        let num_blocks = (len + BLOCK_LEN - 1) / BLOCK_LEN;
        let num_supers = (num_blocks + BLOCKS_PER_SUPER - 1) / BLOCKS_PER_SUPER;

        let mut classes = BitBuffer::with_capacity(num_blocks * CLASS_BITS);
        let mut offsets = BitBuffer::new();
        let mut rank_samples = EliasFano::new(num_supers, len as u64);
        let mut offset_pos_samples =
            EliasFano::new(num_supers, (num_blocks * t.max_offset_bits) as u64);

        let mut rank = 0usize;
        for i in 0..num_blocks {
            if i % BLOCKS_PER_SUPER == 0 {
                // Sample pushes are monotone and within the declared
                // universe by construction.
                rank_samples.push(rank as u64).unwrap();
                offset_pos_samples.push(offsets.len() as u64).unwrap();
            }
            let begin = i * BLOCK_LEN;
            let width = BLOCK_LEN.min(len - begin);
            // A short final block is zero-padded at its tail.
            let block = buf.get_bits(begin, width).unwrap() << (BLOCK_LEN - width);
            let class = broadword::popcount(block);
            classes.push_bits(class as u64, CLASS_BITS).unwrap();
            let offset = offset_of(block, class, t);
            debug_assert_eq!(block_of_offset(offset, class, t), block);
            offsets.push_bits(offset, t.offset_bits[class]).unwrap();
            rank += class;
        }
        rank_samples.build();
        offset_pos_samples.build();

        Self {
            len,
            num_ones: rank,
            classes,
            offsets,
            rank_samples,
            offset_pos_samples,
        }
    }

    /// Creates a compressed vector from input bit stream `bits`.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        Self::from_bit_buffer(&BitBuffer::from_bits(bits))
    }

    /// Returns the number of bits stored.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the vector is empty.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn class_of_block(&self, b: usize) -> usize {
        self.classes.get_bits(b * CLASS_BITS, CLASS_BITS).unwrap() as usize
    }

    /// Bit position of block `b`'s offset code, found by scanning class
    /// widths from the nearest super-block sample (at most 31 of them).
    fn offset_pos_of_block(&self, b: usize) -> usize {
        let t = tables();
        let sb = b / BLOCKS_PER_SUPER;
        let mut pos = self.offset_pos_samples.get(sb).unwrap() as usize;
        for j in (sb * BLOCKS_PER_SUPER)..b {
            pos += t.offset_bits[self.class_of_block(j)];
        }
        pos
    }

    /// Decodes block `b` of known `class` back to its 63 bits.
    fn block_of(&self, b: usize, class: usize) -> u64 {
        if class == 0 {
            return 0;
        }
        if class == BLOCK_LEN {
            return BLOCK_MASK;
        }
        let t = tables();
        let pos = self.offset_pos_of_block(b);
        let offset = self.offsets.get_bits(pos, t.offset_bits[class]).unwrap();
        block_of_offset(offset, class, t)
    }
}

impl NumBits for RrrBitVector {
    fn num_bits(&self) -> usize {
        self.len
    }

    fn num_ones(&self) -> usize {
        self.num_ones
    }
}

impl Access for RrrBitVector {
    fn access(&self, pos: usize) -> Result<bool> {
        if self.len <= pos {
            return Err(Error::out_of_bounds(format!(
                "pos must be less than self.len()={}, but got {pos}.",
                self.len
            )));
        }
        let b = pos / BLOCK_LEN;
        let class = self.class_of_block(b);
        if class == 0 {
            return Ok(false);
        }
        if class == BLOCK_LEN {
            return Ok(true);
        }
        let block = self.block_of(b, class);
        Ok((block >> (BLOCK_LEN - 1 - pos % BLOCK_LEN)) & 1 == 1)
    }
}

impl Rank for RrrBitVector {
    /// Returns the number of ones from the 0-th bit to the `pos-1`-th bit.
    ///
    /// # Complexity
    ///
    /// Constant: one sample access, at most 31 class codes, and one block
    /// decode.
    fn rank1(&self, pos: usize) -> Result<usize> {
        if self.len < pos {
            return Err(Error::out_of_bounds(format!(
                "pos must be no greater than self.len()={}, but got {pos}.",
                self.len
            )));
        }
        if pos == self.len {
            return Ok(self.num_ones);
        }
        if pos == 0 {
            return Ok(0);
        }
        let sb = pos / SUPER_LEN;
        let mut rank = self.rank_samples.get(sb)? as usize;
        if sb + 1 < self.rank_samples.len() {
            let delta = self.rank_samples.get(sb + 1)? as usize - rank;
            if delta == 0 {
                return Ok(rank);
            }
            if delta == SUPER_LEN {
                return Ok(rank + (pos - sb * SUPER_LEN));
            }
        }
        let b = pos / BLOCK_LEN;
        for j in (sb * BLOCKS_PER_SUPER)..b {
            rank += self.class_of_block(j);
        }
        let left = pos % BLOCK_LEN;
        if left != 0 {
            let class = self.class_of_block(b);
            let block = self.block_of(b, class);
            rank += broadword::popcount(block >> (BLOCK_LEN - left));
        }
        Ok(rank)
    }

    fn rank0(&self, pos: usize) -> Result<usize> {
        Ok(pos - self.rank1(pos)?)
    }
}

impl Select for RrrBitVector {
    /// Searches the position of the `k`-th bit set.
    ///
    /// # Complexity
    ///
    /// Logarithmic in the number of super-blocks, then constant.
    fn select1(&self, k: usize) -> Result<usize> {
        if self.num_ones <= k {
            return Err(Error::out_of_bounds(format!(
                "k must be less than self.num_ones()={}, but got {k}.",
                self.num_ones
            )));
        }
        let num_samples = self.rank_samples.len();
        let (mut a, mut b) = (0, num_samples);
        while b - a > 1 {
            let mid = a + (b - a) / 2;
            if (self.rank_samples.get(mid)? as usize) <= k {
                a = mid;
            } else {
                b = mid;
            }
        }
        let sample = self.rank_samples.get(a)? as usize;
        let mut rem = k - sample;
        if a + 1 < num_samples && self.rank_samples.get(a + 1)? as usize - sample == SUPER_LEN {
            // Fully set super-block.
            return Ok(a * SUPER_LEN + rem);
        }
        let mut j = a * BLOCKS_PER_SUPER;
        loop {
            let class = self.class_of_block(j);
            if rem < class {
                let block = self.block_of(j, class);
                let aligned = broadword::reverse(block << (64 - BLOCK_LEN));
                return Ok(j * BLOCK_LEN + broadword::select_in_word(aligned, rem).unwrap());
            }
            rem -= class;
            j += 1;
        }
    }

    fn select0(&self, k: usize) -> Result<usize> {
        let num_zeros = self.len - self.num_ones;
        if num_zeros <= k {
            return Err(Error::out_of_bounds(format!(
                "k must be less than self.num_zeros()={num_zeros}, but got {k}."
            )));
        }
        let num_samples = self.rank_samples.len();
        let (mut a, mut b) = (0, num_samples);
        while b - a > 1 {
            let mid = a + (b - a) / 2;
            if mid * SUPER_LEN - self.rank_samples.get(mid)? as usize <= k {
                a = mid;
            } else {
                b = mid;
            }
        }
        let sample = self.rank_samples.get(a)? as usize;
        let mut rem = k - (a * SUPER_LEN - sample);
        if a + 1 < num_samples && self.rank_samples.get(a + 1)? as usize == sample {
            // Fully unset super-block.
            return Ok(a * SUPER_LEN + rem);
        }
        let mut j = a * BLOCKS_PER_SUPER;
        loop {
            let class = self.class_of_block(j);
            let zeros = BLOCK_LEN - class;
            if rem < zeros {
                let block = self.block_of(j, class);
                let comp = !block & BLOCK_MASK;
                let aligned = broadword::reverse(comp << (64 - BLOCK_LEN));
                let sel = j * BLOCK_LEN + broadword::select_in_word(aligned, rem).unwrap();
                // Padding zeros in a short final block sit above every
                // in-range zero, so a bounds-checked k never lands on them.
                debug_assert!(sel < self.len);
                return Ok(sel);
            }
            rem -= zeros;
            j += 1;
        }
    }
}

impl Serializable for RrrBitVector {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = (self.len as u64).serialize_into(&mut writer)?;
        mem += (self.num_ones as u64).serialize_into(&mut writer)?;
        mem += self.classes.serialize_into(&mut writer)?;
        mem += self.offsets.serialize_into(&mut writer)?;
        mem += self.rank_samples.serialize_into(&mut writer)?;
        mem += self.offset_pos_samples.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let t = tables();
        let len = u64::deserialize_from(&mut reader)? as usize;
        let num_ones = u64::deserialize_from(&mut reader)? as usize;
        let classes = BitBuffer::deserialize_from(&mut reader)?;
        let offsets = BitBuffer::deserialize_from(&mut reader)?;
        let rank_samples = EliasFano::deserialize_from(&mut reader)?;
        let offset_pos_samples = EliasFano::deserialize_from(&mut reader)?;

        let num_blocks = (len + BLOCK_LEN - 1) / BLOCK_LEN;
        let num_supers = (num_blocks + BLOCKS_PER_SUPER - 1) / BLOCKS_PER_SUPER;
        if classes.len() != num_blocks * CLASS_BITS {
            return Err(Error::invalid_metadata(format!(
                "expected {} class bits for {} blocks, but got {}.",
                num_blocks * CLASS_BITS,
                num_blocks,
                classes.len()
            )));
        }
        if rank_samples.len() != num_supers || offset_pos_samples.len() != num_supers {
            return Err(Error::invalid_metadata(format!(
                "expected {} super-block samples, but got {} and {}.",
                num_supers,
                rank_samples.len(),
                offset_pos_samples.len()
            )));
        }
        let mut offset_len = 0;
        let mut class_sum = 0;
        for b in 0..num_blocks {
            let class = classes.get_bits(b * CLASS_BITS, CLASS_BITS).unwrap() as usize;
            offset_len += t.offset_bits[class];
            class_sum += class;
        }
        if offsets.len() != offset_len {
            return Err(Error::invalid_metadata(format!(
                "expected {} offset bits, but got {}.",
                offset_len,
                offsets.len()
            )));
        }
        if num_ones != class_sum {
            return Err(Error::invalid_metadata(format!(
                "expected {class_sum} ones per the class codes, but got {num_ones}."
            )));
        }
        Ok(Self {
            len,
            num_ones,
            classes,
            offsets,
            rank_samples,
            offset_pos_samples,
        })
    }

    fn size_in_bytes(&self) -> usize {
        8 + 8
            + self.classes.size_in_bytes()
            + self.offsets.size_in_bytes()
            + self.rank_samples.size_in_bytes()
            + self.offset_pos_samples.size_in_bytes()
    }
}
