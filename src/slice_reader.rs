use super::{Error, ErrorDetails, Result};
use std::convert::TryFrom;

/// Bounds-checked cursor over a byte slice that remembers its absolute location for errors.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    slice: &'a [u8],
    location: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(slice: &'a [u8]) -> Self {
        Self { slice, location: 0 }
    }

    /// Splits off the next `length` bytes as a reader of their own.
    pub fn new_sub_reader(&mut self, length: usize) -> Result<Self> {
        let location = self.location;
        Ok(Self {
            slice: self.read(length)?,
            location,
        })
    }

    pub fn make_error(&self, details: ErrorDetails) -> Error {
        Error::new(self.location, details)
    }

    pub fn location(&self) -> usize {
        self.location
    }

    pub fn remaining_len(&self) -> usize {
        self.slice.len()
    }

    pub fn skip(&mut self, length: usize) -> Result<()> {
        self.read(length).map(|_| ())
    }

    pub fn read(&mut self, length: usize) -> Result<&'a [u8]> {
        if length > self.slice.len() {
            Err(self.make_error(ErrorDetails::Underrun(length)))
        } else {
            self.location += length;
            let (left, right) = self.slice.split_at(length);
            self.slice = right;
            Ok(left)
        }
    }

    pub fn read_to_end(&mut self) -> Result<&'a [u8]> {
        self.read(self.slice.len())
    }

    pub fn read_array_ref<const N: usize>(&mut self) -> Result<&'a [u8; N]> {
        let location = self.location;
        <&[u8; N]>::try_from(self.read(N)?)
            .map_err(|_| Error::new(location, ErrorDetails::Underrun(N)))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array_ref::<1>()?[0])
    }

    pub fn read_be_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(*self.read_array_ref::<2>()?))
    }

    pub fn peek(&self, length: usize) -> Result<&'a [u8]> {
        if length > self.slice.len() {
            Err(self.make_error(ErrorDetails::Underrun(length)))
        } else {
            Ok(&self.slice[0..length])
        }
    }

    pub fn peek_u8(&self) -> Result<u8> {
        Ok(self.peek(1)?[0])
    }

    /// Starts reading the following bytes bit by bit.
    pub fn bits(&mut self) -> BitReader<'_, 'a> {
        BitReader {
            reader: self,
            current: 0,
            bits_left: 0,
        }
    }
}

/// MSB-first bit cursor borrowing a [`SliceReader`].
///
/// Whole bytes are taken from the parent reader as bits are needed. Unread bits of the last
/// byte are discarded when the `BitReader` is dropped, leaving the parent byte aligned.
pub struct BitReader<'r, 'a> {
    reader: &'r mut SliceReader<'a>,
    current: u8,
    bits_left: u32,
}

impl<'r, 'a> BitReader<'r, 'a> {
    /// Reads `count` bits (at most 16) as an unsigned value.
    pub fn read(&mut self, count: u32) -> Result<u16> {
        debug_assert!(count <= 16);
        let mut value = 0_u16;
        let mut needed = count;
        while needed > 0 {
            if self.bits_left == 0 {
                self.current = self.reader.read_u8()?;
                self.bits_left = 8;
            }
            let take = needed.min(self.bits_left);
            let shift = self.bits_left - take;
            let bits = (self.current >> shift) & ((1_u16 << take) - 1) as u8;
            value = (value << take) | bits as u16;
            self.bits_left -= take;
            needed -= take;
        }
        Ok(value)
    }

    pub fn read_u8(&mut self, count: u32) -> Result<u8> {
        debug_assert!(count <= 8);
        Ok(self.read(count)? as u8)
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read(1)? != 0)
    }

    /// Location of the byte holding the next unread bit.
    pub fn location(&self) -> usize {
        if self.bits_left > 0 {
            self.reader.location() - 1
        } else {
            self.reader.location()
        }
    }

    pub fn make_error(&self, details: ErrorDetails) -> Error {
        Error::new(self.location(), details)
    }
}

#[macro_export]
macro_rules! read_bitfield {
    ($reader:expr, $type:ty) => {
        <$type>::from_bytes(*$reader.read_array_ref::<{ std::mem::size_of::<$type>() }>()?)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_reader_advances_parent() {
        let data = [1, 2, 3, 4, 5];
        let mut reader = SliceReader::new(&data);
        reader.skip(1).unwrap();
        let mut sub = reader.new_sub_reader(3).unwrap();
        assert_eq!(sub.location(), 1);
        assert_eq!(sub.read_be_u16().unwrap(), 0x0203);
        assert_eq!(reader.location(), 4);
        assert_eq!(reader.read_to_end().unwrap(), &[5]);
    }

    #[test]
    fn underrun_leaves_reader_untouched() {
        let data = [0xAB];
        let mut reader = SliceReader::new(&data);
        let error = reader.read_be_u16().unwrap_err();
        assert_eq!(error.details(), &ErrorDetails::Underrun(2));
        assert_eq!(reader.peek_u8().unwrap(), 0xAB);
        assert_eq!(reader.remaining_len(), 1);
    }

    #[test]
    fn bits_are_msb_first() {
        let data = [0b1011_0010, 0b0111_1111, 0xEE];
        let mut reader = SliceReader::new(&data);
        {
            let mut bits = reader.bits();
            assert_eq!(bits.read(2).unwrap(), 0b10);
            assert!(bits.read_bit().unwrap());
            assert_eq!(bits.read_u8(4).unwrap(), 0b1001);
            assert_eq!(bits.location(), 0);
            assert_eq!(bits.read(3).unwrap(), 0b001);
            assert_eq!(bits.read_u8(2).unwrap(), 0b11);
        }
        // Remaining bits of the second byte were dropped.
        assert_eq!(reader.read_u8().unwrap(), 0xEE);
    }

    #[test]
    fn bits_underrun() {
        let data = [0xFF];
        let mut reader = SliceReader::new(&data);
        let mut bits = reader.bits();
        assert_eq!(bits.read(8).unwrap(), 0xFF);
        assert_eq!(
            bits.read(1).unwrap_err().details(),
            &ErrorDetails::Underrun(1)
        );
    }
}
