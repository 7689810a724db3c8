//! Colour look-up tables and their definition segments.

use super::{read_bitfield, ErrorDetails, PixelDepth, Result, SliceReader};
use modular_bitfield_msb::prelude::*;
use std::fmt::{Debug, Formatter};

/// A packed `0xAARRGGBB` colour.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Argb(pub u32);

impl Argb {
    pub const TRANSPARENT: Argb = Argb(0);

    pub fn from_components(a: u8, r: u8, g: u8, b: u8) -> Self {
        Argb((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }
}

/// A CLUT colour as transmitted: luma, chroma and transparency.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct YCrCbT {
    pub y: u8,
    pub cr: u8,
    pub cb: u8,
    /// 0 is opaque, 255 fully transparent.
    pub t: u8,
}

const SCALE_BITS: i32 = 10;
const SCALE_HALF: i32 = 1 << (SCALE_BITS - 1);
// ITU-R BT.601 coefficients scaled by 2^SCALE_BITS
const Y_COEF: i32 = 1192;
const R_CR_COEF: i32 = 1634;
const G_CR_COEF: i32 = 833;
const G_CB_COEF: i32 = 401;
const B_CB_COEF: i32 = 2065;

fn descale(value: i32) -> u8 {
    ((value + SCALE_HALF) >> SCALE_BITS).max(0).min(255) as u8
}

impl From<YCrCbT> for Argb {
    fn from(color: YCrCbT) -> Self {
        // Y of zero selects full transparency regardless of the other components.
        if color.y == 0 {
            return Argb::from_components(0x00, 0xFF, 0xFF, 0xFF);
        }
        let y = (color.y as i32).max(16).min(235) - 16;
        let cr = (color.cr as i32).max(16).min(240) - 128;
        let cb = (color.cb as i32).max(16).min(240) - 128;

        let part_y = Y_COEF * y;
        Argb::from_components(
            255 - color.t,
            descale(part_y + R_CR_COEF * cr),
            descale(part_y - G_CR_COEF * cr - G_CB_COEF * cb),
            descale(part_y + B_CB_COEF * cb),
        )
    }
}

const P100: u8 = 0xFF;
const P75: u8 = 0xBF;
const P67: u8 = 0xAA;
const P50: u8 = 0x7F;
const P33: u8 = 0x55;
const P17: u8 = 0x2B;

fn rgbt(r: u8, g: u8, b: u8, t: u8) -> Argb {
    Argb::from_components(255 - t, r, g, b)
}

fn pick(bit: bool, value: u8) -> u8 {
    if bit {
        value
    } else {
        0
    }
}

fn default_2bit(index: usize) -> Argb {
    match index {
        0 => rgbt(0, 0, 0, P100),
        1 => rgbt(P100, P100, P100, 0),
        2 => rgbt(0, 0, 0, 0),
        _ => rgbt(P50, P50, P50, 0),
    }
}

fn default_4bit(index: usize) -> Argb {
    let bit = |n: usize| index & (1 << n) != 0;
    if index == 0 {
        rgbt(0, 0, 0, P100)
    } else if !bit(3) {
        rgbt(pick(bit(0), P100), pick(bit(1), P100), pick(bit(2), P100), 0)
    } else {
        rgbt(pick(bit(0), P50), pick(bit(1), P50), pick(bit(2), P50), 0)
    }
}

fn default_8bit(index: usize) -> Argb {
    let bit = |n: usize| index & (1 << n) != 0;
    let low = |n: usize, value: u8| pick(bit(n), value);
    match (bit(7), bit(3)) {
        (false, false) if index & 0x70 == 0 => {
            if index & 0x07 == 0 {
                rgbt(0, 0, 0, P100)
            } else {
                rgbt(low(0, P100), low(1, P100), low(2, P100), P75)
            }
        }
        (false, transparent) => rgbt(
            low(0, P33) + low(4, P67),
            low(1, P33) + low(5, P67),
            low(2, P33) + low(6, P67),
            if transparent { P50 } else { 0 },
        ),
        (true, false) => rgbt(
            low(0, P17) + low(4, P33) + P50,
            low(1, P17) + low(5, P33) + P50,
            low(2, P17) + low(6, P33) + P50,
            0,
        ),
        (true, true) => rgbt(
            low(0, P17) + low(4, P33),
            low(1, P17) + low(5, P33),
            low(2, P17) + low(6, P33),
            0,
        ),
    }
}

/// Colour tables for the three pixel depths of one CLUT id.
#[derive(Clone)]
pub struct Clut {
    page_id: u16,
    id: u8,
    version: Option<u8>,
    entries_2bit: [Argb; 4],
    entries_4bit: [Argb; 16],
    entries_8bit: [Argb; 256],
}

impl Clut {
    /// A CLUT holding the default colours, with no version applied yet.
    pub fn new(page_id: u16, id: u8) -> Self {
        let mut out = Self {
            page_id,
            id,
            version: None,
            entries_2bit: [Argb::TRANSPARENT; 4],
            entries_4bit: [Argb::TRANSPARENT; 16],
            entries_8bit: [Argb::TRANSPARENT; 256],
        };
        for (index, entry) in out.entries_2bit.iter_mut().enumerate() {
            *entry = default_2bit(index);
        }
        for (index, entry) in out.entries_4bit.iter_mut().enumerate() {
            *entry = default_4bit(index);
        }
        for (index, entry) in out.entries_8bit.iter_mut().enumerate() {
            *entry = default_8bit(index);
        }
        out
    }

    pub fn page_id(&self) -> u16 {
        self.page_id
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn version(&self) -> Option<u8> {
        self.version
    }

    pub fn entries(&self, depth: PixelDepth) -> &[Argb] {
        match depth {
            PixelDepth::Bits2 => &self.entries_2bit,
            PixelDepth::Bits4 => &self.entries_4bit,
            PixelDepth::Bits8 => &self.entries_8bit,
        }
    }

    /// Colour of `index` in the table of `depth`; out-of-range indices are transparent.
    pub fn color(&self, depth: PixelDepth, index: u8) -> Argb {
        self.entries(depth)
            .get(index as usize)
            .copied()
            .unwrap_or(Argb::TRANSPARENT)
    }

    /// Applies a definition segment. Returns `Ok(false)` for a repeat of the current version.
    ///
    /// Every entry is validated before any is written, so a malformed segment leaves the
    /// table unchanged.
    pub fn apply(&mut self, definition: &ClutDefinition) -> Result<bool> {
        if self.version == Some(definition.version) {
            return Ok(false);
        }
        for entry in definition.entries() {
            entry?;
        }
        for entry in definition.entries() {
            let entry = entry?;
            let color = Argb::from(entry.color);
            let index = entry.id as usize;
            if entry.in_2bit {
                self.entries_2bit[index] = color;
            }
            if entry.in_4bit {
                self.entries_4bit[index] = color;
            }
            if entry.in_8bit {
                self.entries_8bit[index] = color;
            }
        }
        self.version = Some(definition.version);
        Ok(true)
    }
}

impl Debug for Clut {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clut")
            .field("page_id", &self.page_id)
            .field("id", &self.id)
            .field("version", &self.version)
            .finish()
    }
}

#[bitfield]
#[derive(Debug)]
struct ClutHeader {
    clut_id: B8,
    version: B4,
    #[skip]
    reserved: B4,
}

#[bitfield]
#[derive(Debug)]
struct ClutEntryHeader {
    entry_id: B8,
    entry_2bit: bool,
    entry_4bit: bool,
    entry_8bit: bool,
    #[skip]
    reserved: B4,
    full_range: bool,
}

#[bitfield]
#[derive(Debug)]
struct ReducedColor {
    y: B6,
    cr: B4,
    cb: B4,
    t: B2,
}

const SCALE_2BIT: [u8; 4] = [0x00, 0x55, 0xAA, 0xFF];
const SCALE_4BIT: [u8; 16] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE,
    0xFF,
];

impl From<ReducedColor> for YCrCbT {
    fn from(color: ReducedColor) -> Self {
        let y = color.y();
        YCrCbT {
            y: y << 2 | y >> 4,
            cr: SCALE_4BIT[color.cr() as usize],
            cb: SCALE_4BIT[color.cb() as usize],
            t: SCALE_2BIT[color.t() as usize],
        }
    }
}

/// One entry of a [`ClutDefinition`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClutEntry {
    pub id: u8,
    pub in_2bit: bool,
    pub in_4bit: bool,
    pub in_8bit: bool,
    pub color: YCrCbT,
}

impl ClutEntry {
    fn parse(reader: &mut SliceReader) -> Result<Self> {
        let location = reader.location();
        let header = read_bitfield!(reader, ClutEntryHeader);
        let color = if header.full_range() {
            let bytes = reader.read_array_ref::<4>()?;
            YCrCbT {
                y: bytes[0],
                cr: bytes[1],
                cb: bytes[2],
                t: bytes[3],
            }
        } else {
            YCrCbT::from(read_bitfield!(reader, ReducedColor))
        };

        let id = header.entry_id();
        let malformed = |depth_bits| {
            crate::Error::new(
                location,
                ErrorDetails::MalformedClut {
                    entry_id: id,
                    depth_bits,
                },
            )
        };
        if header.entry_2bit() && id >= 4 {
            return Err(malformed(2));
        }
        if header.entry_4bit() && id >= 16 {
            return Err(malformed(4));
        }

        Ok(Self {
            id,
            in_2bit: header.entry_2bit(),
            in_4bit: header.entry_4bit(),
            in_8bit: header.entry_8bit(),
            color,
        })
    }
}

/// CLUT definition segment.
#[derive(Debug)]
pub struct ClutDefinition<'a> {
    pub id: u8,
    pub version: u8,
    entries: SliceReader<'a>,
}

impl<'a> ClutDefinition<'a> {
    pub(crate) fn parse(reader: &mut SliceReader<'a>) -> Result<Self> {
        let header = read_bitfield!(reader, ClutHeader);
        let entries = reader.new_sub_reader(reader.remaining_len())?;
        Ok(Self {
            id: header.clut_id(),
            version: header.version(),
            entries,
        })
    }

    /// Entries in transmission order. Iteration stops after the first malformed entry.
    pub fn entries(&self) -> impl Iterator<Item = Result<ClutEntry>> + 'a {
        let mut reader = self.entries.clone();
        let mut failed = false;
        std::iter::from_fn(move || {
            if failed || reader.remaining_len() == 0 {
                return None;
            }
            let entry = ClutEntry::parse(&mut reader);
            failed = entry.is_err();
            Some(entry)
        })
    }
}
