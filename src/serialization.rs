//! Byte-stream serialization with a fixed little-endian layout.
//!
//! Every structure in this crate round-trips through a contractual byte
//! format: integers are little-endian, `u64` fields take 8 bytes, `i32`
//! counts take 4 bytes, and field order is part of the contract. There is no
//! version tag or checksum; compatibility is purely structural.

use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Types that round-trip through the crate's little-endian byte format.
///
/// [`Serializable::deserialize_from`] is the exact inverse of
/// [`Serializable::serialize_into`]: reading back the produced bytes yields a
/// value equal to the original.
///
/// # Examples
///
/// ```
/// use ribbit::{BitBuffer, Serializable};
///
/// let mut buf = BitBuffer::new();
/// buf.push_bits(0b10110, 5)?;
///
/// let mut bytes = vec![];
/// let size = buf.serialize_into(&mut bytes)?;
/// let other = BitBuffer::deserialize_from(&bytes[..])?;
/// assert_eq!(buf, other);
/// assert_eq!(size, bytes.len());
/// assert_eq!(size, buf.size_in_bytes());
/// # Ok::<(), ribbit::Error>(())
/// ```
pub trait Serializable: Sized {
    /// Serializes `self` into `writer`, returning the number of bytes
    /// written.
    fn serialize_into<W: Write>(&self, writer: W) -> Result<usize>;

    /// Deserializes a value from `reader`.
    fn deserialize_from<R: Read>(reader: R) -> Result<Self>;

    /// Returns the number of bytes [`Self::serialize_into`] will write.
    fn size_in_bytes(&self) -> usize;
}

impl Serializable for u64 {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        writer.write_all(&self.to_le_bytes())?;
        Ok(8)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(Self::from_le_bytes(buf))
    }

    fn size_in_bytes(&self) -> usize {
        8
    }
}

impl Serializable for i32 {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        writer.write_all(&self.to_le_bytes())?;
        Ok(4)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(Self::from_le_bytes(buf))
    }

    fn size_in_bytes(&self) -> usize {
        4
    }
}

/// A word sequence is laid out as an `i32` count followed by the words.
impl Serializable for Vec<u64> {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let n = i32::try_from(self.len())
            .map_err(|_| Error::invalid_metadata("word count exceeds i32"))?;
        let mut mem = n.serialize_into(&mut writer)?;
        for x in self {
            mem += x.serialize_into(&mut writer)?;
        }
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let n = i32::deserialize_from(&mut reader)?;
        let n = usize::try_from(n)
            .map_err(|_| Error::invalid_metadata(format!("negative word count: {n}")))?;
        let mut words = Vec::with_capacity(n);
        for _ in 0..n {
            words.push(u64::deserialize_from(&mut reader)?);
        }
        Ok(words)
    }

    fn size_in_bytes(&self) -> usize {
        4 + 8 * self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_little_endian() {
        let mut bytes = vec![];
        0x0102_0304_0506_0708u64
            .serialize_into(&mut bytes)
            .unwrap();
        assert_eq!(bytes, [8, 7, 6, 5, 4, 3, 2, 1]);

        let mut bytes = vec![];
        0x01020304i32.serialize_into(&mut bytes).unwrap();
        assert_eq!(bytes, [4, 3, 2, 1]);
    }

    #[test]
    fn word_vec_roundtrip() {
        let words = vec![u64::MAX, 0, 42];
        let mut bytes = vec![];
        let size = words.serialize_into(&mut bytes).unwrap();
        assert_eq!(size, bytes.len());
        assert_eq!(size, words.size_in_bytes());
        let other = Vec::<u64>::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(words, other);
    }

    #[test]
    fn word_vec_rejects_negative_count() {
        let mut bytes = vec![];
        (-1i32).serialize_into(&mut bytes).unwrap();
        let e = Vec::<u64>::deserialize_from(&bytes[..]).unwrap_err();
        assert!(matches!(e, Error::InvalidMetadata(_)));
    }

    #[test]
    fn short_input_is_an_io_error() {
        let bytes = [1u8, 2];
        let e = u64::deserialize_from(&bytes[..]).unwrap_err();
        assert!(matches!(e, Error::Io(_)));
    }
}
