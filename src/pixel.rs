//! Run-length pixel-code decoding of object fields.

use super::{Error, ErrorDetails, Result, SliceReader};
use crate::slice_reader::BitReader;
use num_derive::FromPrimitive;

/// Bits per pixel of a region, and of the objects placed in it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive)]
pub enum PixelDepth {
    Bits2 = 1,
    Bits4 = 2,
    Bits8 = 3,
}

impl PixelDepth {
    pub fn bits(self) -> u8 {
        match self {
            PixelDepth::Bits2 => 2,
            PixelDepth::Bits4 => 4,
            PixelDepth::Bits8 => 8,
        }
    }
}

const DATA_TYPE_2BIT_STRING: u8 = 0x10;
const DATA_TYPE_4BIT_STRING: u8 = 0x11;
const DATA_TYPE_8BIT_STRING: u8 = 0x12;
const DATA_TYPE_2TO4_MAP: u8 = 0x20;
const DATA_TYPE_2TO8_MAP: u8 = 0x21;
const DATA_TYPE_4TO8_MAP: u8 = 0x22;
const DATA_TYPE_END_OF_LINE: u8 = 0xF0;

/// Destination of decoded pixel runs.
///
/// The decoder checks every run against `width` and `height` before calling
/// [`PixelSink::write_run`], so implementations may index without further checks.
pub trait PixelSink {
    fn depth(&self) -> PixelDepth;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn write_run(&mut self, row: usize, column: usize, code: u8, count: usize);
}

/// Writes pixel codes into a byte-per-pixel buffer.
///
/// With an origin and stride the sink addresses a window of a larger canvas.
pub struct BitmapSink<'b> {
    pixels: &'b mut [u8],
    stride: usize,
    origin: usize,
    width: usize,
    height: usize,
    depth: PixelDepth,
}

impl<'b> BitmapSink<'b> {
    pub fn new(pixels: &'b mut [u8], width: usize, height: usize, depth: PixelDepth) -> Self {
        Self::with_origin(pixels, width, 0, 0, width, height, depth)
    }

    /// A `width` x `height` window at (`x`, `y`) of a canvas with `stride` bytes per row.
    ///
    /// Panics if the window does not fit `pixels`.
    pub fn with_origin(
        pixels: &'b mut [u8],
        stride: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        depth: PixelDepth,
    ) -> Self {
        assert!(x + width <= stride, "window wider than canvas");
        if height > 0 {
            assert!(
                (y + height - 1) * stride + x + width <= pixels.len(),
                "window taller than canvas"
            );
        }
        Self {
            pixels,
            stride,
            origin: y * stride + x,
            width,
            height,
            depth,
        }
    }
}

impl PixelSink for BitmapSink<'_> {
    fn depth(&self) -> PixelDepth {
        self.depth
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn write_run(&mut self, row: usize, column: usize, code: u8, count: usize) {
        let start = self.origin + row * self.stride + column;
        self.pixels[start..start + count].fill(code);
    }
}

/// Tables widening 2-bit and 4-bit codes for deeper objects.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MapTables {
    pub two_to_four: [u8; 4],
    pub two_to_eight: [u8; 4],
    pub four_to_eight: [u8; 16],
}

impl Default for MapTables {
    fn default() -> Self {
        let mut four_to_eight = [0; 16];
        for (index, value) in four_to_eight.iter_mut().enumerate() {
            *value = (index as u8) << 4 | index as u8;
        }
        Self {
            two_to_four: [0x0, 0x7, 0x8, 0xF],
            two_to_eight: [0x00, 0x77, 0x88, 0xFF],
            four_to_eight,
        }
    }
}

/// Decodes the data blocks of one object field into a [`PixelSink`].
///
/// Lines of the field are written to every second row starting at `first_row`, so the top and
/// bottom fields of an interlaced object interleave into one bitmap.
pub struct PixelDecoder<'s, S: PixelSink> {
    sink: &'s mut S,
    maps: MapTables,
    row: usize,
    column: usize,
    lines: usize,
}

impl<'s, S: PixelSink> PixelDecoder<'s, S> {
    pub fn new(sink: &'s mut S, first_row: usize) -> Self {
        Self {
            sink,
            maps: MapTables::default(),
            row: first_row,
            column: 0,
            lines: 0,
        }
    }

    /// Decodes every data block of `reader`, returning the number of lines written.
    pub fn decode(mut self, reader: &mut SliceReader) -> Result<usize> {
        while reader.remaining_len() > 0 {
            let location = reader.location();
            match reader.read_u8()? {
                DATA_TYPE_2BIT_STRING => self.string_2bit(&mut reader.bits())?,
                DATA_TYPE_4BIT_STRING => self.string_4bit(&mut reader.bits())?,
                DATA_TYPE_8BIT_STRING => self.string_8bit(&mut reader.bits())?,
                DATA_TYPE_2TO4_MAP => {
                    let mut bits = reader.bits();
                    for entry in self.maps.two_to_four.iter_mut() {
                        *entry = bits.read_u8(4)?;
                    }
                }
                DATA_TYPE_2TO8_MAP => {
                    for entry in self.maps.two_to_eight.iter_mut() {
                        *entry = reader.read_u8()?;
                    }
                }
                DATA_TYPE_4TO8_MAP => {
                    for entry in self.maps.four_to_eight.iter_mut() {
                        *entry = reader.read_u8()?;
                    }
                }
                DATA_TYPE_END_OF_LINE => self.end_line(location)?,
                data_type => {
                    return Err(Error::new(
                        location,
                        ErrorDetails::InvalidPixelDataType(data_type),
                    ))
                }
            }
        }
        if self.column != 0 {
            return Err(self.overflow(reader.location()));
        }
        Ok(self.lines)
    }

    fn overflow(&self, location: usize) -> Error {
        Error::new(
            location,
            ErrorDetails::PixelRunOverflow {
                row: self.row,
                column: self.column,
                width: self.sink.width(),
            },
        )
    }

    fn end_line(&mut self, location: usize) -> Result<()> {
        if self.column != self.sink.width() {
            return Err(self.overflow(location));
        }
        self.row += 2;
        self.column = 0;
        self.lines += 1;
        Ok(())
    }

    fn put(&mut self, location: usize, code: u8, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if self.row >= self.sink.height() || self.column + count > self.sink.width() {
            return Err(self.overflow(location));
        }
        self.sink.write_run(self.row, self.column, code, count);
        self.column += count;
        Ok(())
    }

    fn depth_mismatch(&self, location: usize, string_bits: u8) -> Error {
        Error::new(
            location,
            ErrorDetails::PixelDepthMismatch {
                string_bits,
                object_bits: self.sink.depth().bits(),
            },
        )
    }

    fn put_2bit(&mut self, bits: &BitReader, code: u16, count: usize) -> Result<()> {
        let code = code as usize & 0x3;
        let mapped = match self.sink.depth() {
            PixelDepth::Bits2 => code as u8,
            PixelDepth::Bits4 => self.maps.two_to_four[code],
            PixelDepth::Bits8 => self.maps.two_to_eight[code],
        };
        self.put(bits.location(), mapped, count)
    }

    fn put_4bit(&mut self, bits: &BitReader, code: u16, count: usize) -> Result<()> {
        let code = code as usize & 0xF;
        let mapped = match self.sink.depth() {
            PixelDepth::Bits2 => return Err(self.depth_mismatch(bits.location(), 4)),
            PixelDepth::Bits4 => code as u8,
            PixelDepth::Bits8 => self.maps.four_to_eight[code],
        };
        self.put(bits.location(), mapped, count)
    }

    fn put_8bit(&mut self, bits: &BitReader, code: u16, count: usize) -> Result<()> {
        match self.sink.depth() {
            PixelDepth::Bits8 => self.put(bits.location(), code as u8, count),
            _ => Err(self.depth_mismatch(bits.location(), 8)),
        }
    }

    fn string_2bit(&mut self, bits: &mut BitReader) -> Result<()> {
        loop {
            let code = bits.read(2)?;
            if code != 0 {
                self.put_2bit(bits, code, 1)?;
            } else if bits.read_bit()? {
                // 00 1 LLL CC
                let count = bits.read(3)? as usize + 3;
                let code = bits.read(2)?;
                self.put_2bit(bits, code, count)?;
            } else if bits.read_bit()? {
                // 00 01
                self.put_2bit(bits, 0, 1)?;
            } else {
                match bits.read(2)? {
                    0 => return Ok(()),
                    1 => self.put_2bit(bits, 0, 2)?,
                    2 => {
                        let count = bits.read(4)? as usize + 12;
                        let code = bits.read(2)?;
                        self.put_2bit(bits, code, count)?;
                    }
                    _ => {
                        let count = bits.read(8)? as usize + 29;
                        let code = bits.read(2)?;
                        self.put_2bit(bits, code, count)?;
                    }
                }
            }
        }
    }

    fn string_4bit(&mut self, bits: &mut BitReader) -> Result<()> {
        loop {
            let code = bits.read(4)?;
            if code != 0 {
                self.put_4bit(bits, code, 1)?;
            } else if !bits.read_bit()? {
                // 0000 0 LLL, zero length ends the string
                let count = bits.read(3)? as usize;
                if count == 0 {
                    return Ok(());
                }
                self.put_4bit(bits, 0, count + 2)?;
            } else if !bits.read_bit()? {
                // 0000 10 LL CCCC
                let count = bits.read(2)? as usize + 4;
                let code = bits.read(4)?;
                self.put_4bit(bits, code, count)?;
            } else {
                match bits.read(2)? {
                    0 => self.put_4bit(bits, 0, 1)?,
                    1 => self.put_4bit(bits, 0, 2)?,
                    2 => {
                        let count = bits.read(4)? as usize + 9;
                        let code = bits.read(4)?;
                        self.put_4bit(bits, code, count)?;
                    }
                    _ => {
                        let count = bits.read(8)? as usize + 25;
                        let code = bits.read(4)?;
                        self.put_4bit(bits, code, count)?;
                    }
                }
            }
        }
    }

    fn string_8bit(&mut self, bits: &mut BitReader) -> Result<()> {
        loop {
            let code = bits.read(8)?;
            if code != 0 {
                self.put_8bit(bits, code, 1)?;
            } else if !bits.read_bit()? {
                // 00000000 0 LLLLLLL, zero length ends the string
                let count = bits.read(7)? as usize;
                if count == 0 {
                    return Ok(());
                }
                self.put_8bit(bits, 0, count)?;
            } else {
                // 00000000 1 LLLLLLL CCCCCCCC
                let count = bits.read(7)? as usize;
                let code = bits.read(8)?;
                self.put_8bit(bits, code, count)?;
            }
        }
    }
}
