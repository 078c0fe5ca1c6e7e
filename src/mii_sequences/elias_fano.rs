//! Elias-Fano encoding of monotone non-decreasing integer sequences.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::anyhow;
use num_traits::ToPrimitive;

use crate::bit_buffer::BitBuffer;
use crate::bit_vectors::{RsBitVector, Select};
use crate::broadword;
use crate::error::{Error, Result};
use crate::serialization::Serializable;

/// Elias-Fano encoding of a monotone non-decreasing integer sequence.
///
/// The sequence is declared with a capacity $`n`$ and an inclusive upper
/// bound $`U`$. Each value is split at $`\ell = \max(0, \lfloor \lg (U/n)
/// \rfloor)`$: the low $`\ell`$ bits go verbatim into a [`BitBuffer`], and
/// the high part $`x_i \gg \ell`$ marks position $`(x_i \gg \ell) + i`$ in an
/// [`RsBitVector`], whose select recovers it as
/// $`\textrm{Select}_1(i) - i`$.
///
/// Values are loaded in order with [`Self::push`], then [`Self::build`]
/// freezes the high-part index; [`Self::get`] before `build()` fails with
/// [`Error::NotBuilt`].
///
/// # Examples
///
/// ```
/// use ribbit::EliasFano;
///
/// let mut ef = EliasFano::new(4, 1000);
/// for v in [3, 50, 50, 1000] {
///     ef.push(v)?;
/// }
/// ef.build();
///
/// assert_eq!(ef.len(), 4);
/// assert_eq!(ef.get(1)?, 50);
/// assert_eq!(ef.get(3)?, 1000);
/// # Ok::<(), ribbit::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EliasFano {
    low_len: usize,
    low_mask: u64,
    universe: u64,
    capacity: usize,
    len: usize,
    last: u64,
    lows: BitBuffer,
    highs: RsBitVector,
}

impl EliasFano {
    /// Creates an empty sequence accepting up to `capacity` values in
    /// `0..=universe`.
    pub fn new(capacity: usize, universe: u64) -> Self {
        let low_len = broadword::msb(universe / capacity.max(1) as u64).unwrap_or(0);
        Self {
            low_len,
            low_mask: (1u64 << low_len) - 1,
            universe,
            capacity,
            len: 0,
            last: 0,
            lows: BitBuffer::new(),
            highs: RsBitVector::new(),
        }
    }

    /// Appends `val` to the sequence.
    ///
    /// # Errors
    ///
    /// - [`Error::OrderViolation`] if `val` is smaller than the last pushed
    ///   value,
    /// - [`Error::CapacityExceeded`] if the declared capacity is already
    ///   full,
    /// - [`Error::UpperBoundExceeded`] if `val` exceeds the declared
    ///   universe.
    pub fn push(&mut self, val: u64) -> Result<()> {
        if val < self.last {
            return Err(Error::order_violation(format!(
                "val must be no less than the last value {}, but got {val}.",
                self.last
            )));
        }
        if self.capacity <= self.len {
            return Err(Error::capacity_exceeded(format!(
                "the sequence already holds capacity()={} values.",
                self.capacity
            )));
        }
        if self.universe < val {
            return Err(Error::upper_bound_exceeded(format!(
                "val must be no greater than universe()={}, but got {val}.",
                self.universe
            )));
        }
        self.lows.push_bits(val & self.low_mask, self.low_len)?;
        self.highs.set_bit((val >> self.low_len) as usize + self.len, true);
        self.last = val;
        self.len += 1;
        Ok(())
    }

    /// Builds the high-part select index, freezing the sequence for queries.
    pub fn build(&mut self) {
        self.highs.build();
        debug_assert_eq!(
            crate::bit_vectors::NumBits::num_ones(&self.highs),
            self.len
        );
    }

    /// Returns the `i`-th value.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] if `self.len() <= i`, or [`Error::NotBuilt`]
    /// before [`Self::build`].
    ///
    /// # Complexity
    ///
    /// Constant up to the high-part select.
    pub fn get(&self, i: usize) -> Result<u64> {
        if self.len <= i {
            return Err(Error::out_of_bounds(format!(
                "i must be less than self.len()={}, but got {i}.",
                self.len
            )));
        }
        let high = (self.highs.select1(i)? - i) as u64;
        let low = self.lows.get_bits(i * self.low_len, self.low_len)?;
        Ok(high << self.low_len | low)
    }

    /// Returns the number of values stored.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the sequence is empty.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the declared capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the declared inclusive upper bound.
    pub const fn universe(&self) -> u64 {
        self.universe
    }

    /// Returns the number of low bits per value ($`\ell`$).
    pub const fn low_len(&self) -> usize {
        self.low_len
    }

    /// Creates an iterator over all values.
    ///
    /// # Panics
    ///
    /// Iteration panics if the sequence has not been built.
    pub const fn iter(&self) -> Iter<'_> {
        Iter { ef: self, pos: 0 }
    }

    /// Builds a finished sequence from a sorted slice of castable integers,
    /// using the last element as the universe.
    ///
    /// # Examples
    ///
    /// ```
    /// use ribbit::EliasFano;
    ///
    /// let ef = EliasFano::from_slice(&[2u32, 5, 9, 9, 42])?;
    /// assert_eq!(ef.len(), 5);
    /// assert_eq!(ef.get(4)?, 42);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_slice<T: ToPrimitive>(vals: &[T]) -> anyhow::Result<Self> {
        let mut xs = Vec::with_capacity(vals.len());
        for v in vals {
            xs.push(
                v.to_u64()
                    .ok_or_else(|| anyhow!("vals must be castable to u64"))?,
            );
        }
        let universe = xs.last().copied().unwrap_or(0);
        let mut ef = Self::new(xs.len(), universe);
        for x in xs {
            ef.push(x)?;
        }
        ef.build();
        Ok(ef)
    }
}

/// Iterator over values in an [`EliasFano`], created by [`EliasFano::iter`].
pub struct Iter<'a> {
    ef: &'a EliasFano,
    pos: usize,
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.ef.len() {
            let val = self.ef.get(self.pos).unwrap();
            self.pos += 1;
            Some(val)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.ef.len() - self.pos;
        (rest, Some(rest))
    }
}

impl Serializable for EliasFano {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let low_len = i32::try_from(self.low_len)
            .map_err(|_| Error::invalid_metadata("low_len exceeds i32"))?;
        let mut mem = low_len.serialize_into(&mut writer)?;
        mem += self.low_mask.serialize_into(&mut writer)?;
        mem += self.universe.serialize_into(&mut writer)?;
        mem += (self.capacity as u64).serialize_into(&mut writer)?;
        mem += (self.len as u64).serialize_into(&mut writer)?;
        mem += self.last.serialize_into(&mut writer)?;
        mem += self.lows.serialize_into(&mut writer)?;
        mem += self.highs.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let low_len = i32::deserialize_from(&mut reader)?;
        let low_len = usize::try_from(low_len)
            .map_err(|_| Error::invalid_metadata(format!("negative low_len: {low_len}")))?;
        if low_len >= 64 {
            return Err(Error::invalid_metadata(format!(
                "low_len must be less than 64, but got {low_len}."
            )));
        }
        let low_mask = u64::deserialize_from(&mut reader)?;
        let universe = u64::deserialize_from(&mut reader)?;
        let capacity = u64::deserialize_from(&mut reader)? as usize;
        let len = u64::deserialize_from(&mut reader)? as usize;
        let last = u64::deserialize_from(&mut reader)?;
        let lows = BitBuffer::deserialize_from(&mut reader)?;
        let highs = RsBitVector::deserialize_from(&mut reader)?;
        if lows.len() != len * low_len {
            return Err(Error::invalid_metadata(format!(
                "expected {} low bits for {} values, but got {}.",
                len * low_len,
                len,
                lows.len()
            )));
        }
        Ok(Self {
            low_len,
            low_mask,
            universe,
            capacity,
            len,
            last,
            lows,
            highs,
        })
    }

    fn size_in_bytes(&self) -> usize {
        4 + 8 * 5 + self.lows.size_in_bytes() + self.highs.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn gen_monotone(len: usize, universe: u64, seed: u64) -> Vec<u64> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mut vals: Vec<u64> = (0..len).map(|_| rng.gen_range(0..=universe)).collect();
        vals.sort_unstable();
        vals
    }

    #[test]
    fn test_monotone_sequence() {
        let vals = [0u64, 0, 7, 7, 100, 1000, 99999];
        let mut ef = EliasFano::new(7, 99999);
        for &v in &vals {
            ef.push(v).unwrap();
        }
        ef.build();
        for (i, &v) in vals.iter().enumerate() {
            assert_eq!(ef.get(i).unwrap(), v);
        }
        // The order check fires before the capacity check.
        assert!(matches!(ef.push(99998), Err(Error::OrderViolation(_))));
        assert!(matches!(ef.push(99999), Err(Error::CapacityExceeded(_))));
    }

    #[test]
    fn test_upper_bound() {
        let mut ef = EliasFano::new(7, 99999);
        assert!(matches!(
            ef.push(100000),
            Err(Error::UpperBoundExceeded(_))
        ));
        ef.push(99999).unwrap();
    }

    #[test]
    fn test_not_built() {
        let mut ef = EliasFano::new(3, 10);
        ef.push(4).unwrap();
        assert!(matches!(ef.get(0), Err(Error::NotBuilt(_))));
        ef.build();
        assert_eq!(ef.get(0).unwrap(), 4);
    }

    #[test]
    fn test_get_oob() {
        let ef = EliasFano::from_slice(&[1u64, 2, 3]).unwrap();
        assert!(matches!(ef.get(3), Err(Error::OutOfBounds(_))));
    }

    #[test]
    fn test_dense_universe() {
        // universe < capacity forces the degenerate split with no low bits.
        let vals = [0u64, 0, 1, 1, 1, 2];
        let mut ef = EliasFano::new(6, 2);
        assert_eq!(ef.low_len(), 0);
        for &v in &vals {
            ef.push(v).unwrap();
        }
        ef.build();
        for (i, &v) in vals.iter().enumerate() {
            assert_eq!(ef.get(i).unwrap(), v);
        }
    }

    #[test]
    fn test_empty() {
        let mut ef = EliasFano::new(0, 0);
        assert!(matches!(ef.push(0), Err(Error::CapacityExceeded(_))));
        ef.build();
        assert!(ef.is_empty());
        assert!(ef.get(0).is_err());
    }

    #[test]
    fn test_random_sequences() {
        for (len, universe, seed) in [(100, 1u64 << 10, 1), (1000, 1 << 40, 2), (5000, 300, 3)] {
            let vals = gen_monotone(len, universe, seed);
            let mut ef = EliasFano::new(len, universe);
            for &v in &vals {
                ef.push(v).unwrap();
            }
            ef.build();
            assert_eq!(ef.len(), vals.len());
            for (i, &v) in vals.iter().enumerate() {
                assert_eq!(ef.get(i).unwrap(), v);
            }
            assert_eq!(ef.iter().collect::<Vec<_>>(), vals);
        }
    }

    #[test]
    fn test_partial_fill() {
        // Fewer pushes than the declared capacity is fine.
        let mut ef = EliasFano::new(100, 1 << 20);
        for &v in &[5u64, 17, 1 << 19] {
            ef.push(v).unwrap();
        }
        ef.build();
        assert_eq!(ef.len(), 3);
        assert_eq!(ef.get(2).unwrap(), 1 << 19);
    }

    #[test]
    fn test_serialize() {
        let vals = gen_monotone(777, 1 << 33, 42);
        let mut ef = EliasFano::new(777, 1 << 33);
        for &v in &vals {
            ef.push(v).unwrap();
        }
        ef.build();
        let mut bytes = vec![];
        let size = ef.serialize_into(&mut bytes).unwrap();
        let other = EliasFano::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(ef, other);
        assert_eq!(size, bytes.len());
        assert_eq!(size, ef.size_in_bytes());
        for (i, &v) in vals.iter().enumerate() {
            assert_eq!(other.get(i).unwrap(), v);
        }
    }

    #[test]
    fn test_serialize_unbuilt_fails() {
        let mut ef = EliasFano::new(2, 10);
        ef.push(3).unwrap();
        let mut bytes = vec![];
        assert!(matches!(
            ef.serialize_into(&mut bytes),
            Err(Error::NotBuilt(_))
        ));
    }
}
