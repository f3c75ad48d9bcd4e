//! packed per-step on/off patterns

use crate::Error;

/// fixed-length bit vector stored LSB-first in at most `BYTES` bytes
///
/// Bit `i` lives in byte `i / 8` under mask `1 << (i % 8)`. Only the first
/// `ceil(len / 8)` bytes are live; those are the bytes that cross the
/// persistence boundary through [`save_into`](Self::save_into) and
/// [`load_from`](Self::load_from).
#[derive(Clone)]
pub struct BitSequence<const BYTES: usize> {
    len: usize,
    bytes: [u8; BYTES],
}

impl<const BYTES: usize> BitSequence<BYTES> {
    /// zero-filled sequence of `len` bits
    pub fn new(len: usize) -> Result<Self, Error> {
        if len > BYTES * 8 {
            return Err(Error::Capacity {
                requested: len,
                capacity: BYTES * 8,
            });
        }
        Ok(Self {
            len,
            bytes: [0; BYTES],
        })
    }

    /// sequence with one bit per input value; tail bits of the last byte stay zero
    pub fn from_bits<I>(values: I) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: Into<bool>,
    {
        let mut bytes = [0u8; BYTES];
        let mut len = 0;
        for value in values {
            if len >= BYTES * 8 {
                return Err(Error::Capacity {
                    requested: len + 1,
                    capacity: BYTES * 8,
                });
            }
            if value.into() {
                bytes[len / 8] |= 1 << (len % 8);
            }
            len += 1;
        }
        Ok(Self { len, bytes })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// packed length in bytes, rounded up
    pub fn byte_len(&self) -> usize {
        self.len.div_ceil(8)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.byte_len()]
    }

    fn index_mask(&self, index: usize) -> Result<(usize, u8), Error> {
        if index >= self.len {
            return Err(Error::OutOfRange {
                index,
                len: self.len,
            });
        }
        Ok((index / 8, 1 << (index % 8)))
    }

    pub fn get(&self, index: usize) -> Result<bool, Error> {
        let (byte, mask) = self.index_mask(index)?;
        Ok(self.bytes[byte] & mask != 0)
    }

    pub fn set(&mut self, index: usize, value: bool) -> Result<(), Error> {
        let (byte, mask) = self.index_mask(index)?;
        if value {
            self.bytes[byte] |= mask;
        } else {
            self.bytes[byte] &= !mask;
        }
        Ok(())
    }

    pub fn toggle(&mut self, index: usize) -> Result<(), Error> {
        let (byte, mask) = self.index_mask(index)?;
        self.bytes[byte] ^= mask;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.bytes[i / 8] & (1 << (i % 8)) != 0)
    }

    /// copy the packed bytes into `buffer` at `offset`
    pub fn save_into(&self, buffer: &mut [u8], offset: usize) -> Result<(), Error> {
        let dst = Self::window(buffer.len(), offset, self.byte_len())?;
        buffer[dst].copy_from_slice(self.as_bytes());
        Ok(())
    }

    /// overwrite the packed bytes with those in `buffer` at `offset`
    pub fn load_from(&mut self, buffer: &[u8], offset: usize) -> Result<(), Error> {
        let n = self.byte_len();
        let src = Self::window(buffer.len(), offset, n)?;
        self.bytes[..n].copy_from_slice(&buffer[src]);
        Ok(())
    }

    fn window(buf_len: usize, offset: usize, n: usize) -> Result<core::ops::Range<usize>, Error> {
        match offset.checked_add(n) {
            Some(end) if end <= buf_len => Ok(offset..end),
            _ => Err(Error::OutOfRange {
                index: offset.saturating_add(n).saturating_sub(1),
                len: buf_len,
            }),
        }
    }
}

impl<const BYTES: usize> PartialEq for BitSequence<BYTES> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<const BYTES: usize> Eq for BitSequence<BYTES> {}

impl<const BYTES: usize> core::fmt::Debug for BitSequence<BYTES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("BitSequence(")?;
        for (i, bit) in self.iter().enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            f.write_str(if bit { "1" } else { "0" })?;
        }
        f.write_str(")")
    }
}

#[cfg(feature = "defmt")]
impl<const BYTES: usize> defmt::Format for BitSequence<BYTES> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "BitSequence({=[u8]}, len={=usize})", self.as_bytes(), self.len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    type Bits = BitSequence<4>;

    #[test]
    fn packs_lsb_first() {
        let bits = Bits::from_bits([true, false, true, true]).unwrap();
        assert_eq!(bits.len(), 4);
        assert_eq!(bits.as_bytes(), &[0b0000_1101]);
    }

    #[test]
    fn from_ints() {
        let bits = Bits::from_bits([1u8, 0, 0, 0].map(|v| v != 0)).unwrap();
        assert_eq!(bits.as_bytes(), &[0b0000_0001]);
    }

    #[test]
    fn rounds_byte_len_up() {
        assert_eq!(Bits::new(0).unwrap().byte_len(), 0);
        assert_eq!(Bits::new(1).unwrap().byte_len(), 1);
        assert_eq!(Bits::new(8).unwrap().byte_len(), 1);
        assert_eq!(Bits::new(9).unwrap().byte_len(), 2);
        assert_eq!(Bits::new(32).unwrap().byte_len(), 4);
    }

    #[test]
    fn rejects_over_capacity() {
        assert_eq!(
            Bits::new(33).err(),
            Some(Error::Capacity {
                requested: 33,
                capacity: 32
            })
        );
        assert!(Bits::from_bits([false; 33]).is_err());
    }

    #[test]
    fn set_touches_one_bit() {
        for n in 1..=32 {
            for i in 0..n {
                let mut bits = Bits::new(n).unwrap();
                assert!(!bits.get(i).unwrap());
                bits.set(i, true).unwrap();
                for j in 0..n {
                    assert_eq!(bits.get(j).unwrap(), i == j);
                }
                bits.set(i, false).unwrap();
                assert!(bits.iter().all(|b| !b));
            }
        }
    }

    #[test]
    fn toggle_twice_restores() {
        let mut bits = Bits::from_bits([true, false, true, false, false, true, true, false, true])
            .unwrap();
        let before = bits.clone();
        for i in 0..bits.len() {
            bits.toggle(i).unwrap();
            assert_ne!(bits, before);
            bits.toggle(i).unwrap();
            assert_eq!(bits, before);
        }
    }

    #[test]
    fn out_of_range_fails_without_mutation() {
        let mut bits = Bits::new(4).unwrap();
        let err = Error::OutOfRange { index: 4, len: 4 };
        assert_eq!(bits.get(4), Err(err));
        assert_eq!(bits.set(4, true), Err(err));
        assert_eq!(bits.toggle(4), Err(err));
        // bit 4 shares a byte with the live bits
        assert_eq!(bits.as_bytes(), &[0]);
    }

    #[test]
    fn save_then_load() {
        let bits = Bits::from_bits([
            true, true, false, true, false, false, false, true, false, true, true,
        ])
        .unwrap();
        let mut buffer = [0u8; 5];
        bits.save_into(&mut buffer, 3).unwrap();
        assert_eq!(buffer, [0, 0, 0, 0b1000_1011, 0b0000_0110]);

        let mut loaded = Bits::new(11).unwrap();
        loaded.load_from(&buffer, 3).unwrap();
        assert_eq!(loaded, bits);
    }

    #[test]
    fn save_and_load_bounds() {
        let bits = Bits::new(16).unwrap();
        let mut buffer = [0u8; 3];
        assert!(bits.save_into(&mut buffer, 2).is_err());
        assert!(bits.save_into(&mut buffer, usize::MAX).is_err());

        let mut target = Bits::from_bits([true; 16]).unwrap();
        assert!(target.load_from(&buffer, 2).is_err());
        assert!(target.iter().all(|b| b));
    }

    #[test]
    fn load_overwrites_whole_bytes() {
        let mut bits = Bits::from_bits([true; 4]).unwrap();
        bits.load_from(&[0b0000_0010], 0).unwrap();
        assert_eq!(format!("{bits:?}"), "BitSequence(0,1,0,0)");
    }

    #[test]
    fn equality_ignores_dead_bits() {
        let mut a = Bits::new(4).unwrap();
        a.load_from(&[0b1111_0001], 0).unwrap();
        let b = Bits::from_bits([true, false, false, false]).unwrap();
        assert_eq!(a, b);
        assert_ne!(b, Bits::from_bits([true, false, false]).unwrap());
    }
}
