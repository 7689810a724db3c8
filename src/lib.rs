//! Decoder for DVB subtitle bitstreams (ETSI EN 300 743).
//!
//! Subtitle PES packets are split into segments which define CLUTs, regions, objects and page
//! compositions. [`Decoder`] keeps these entities in fixed-capacity pools, decodes run-length
//! pixel data into a preallocated pixel arena and exposes finished pages as [`ComposedPage`]
//! views. No heap allocation happens once the decoder is constructed.
//!
//! # Usage
//! Simply add this crate as a dependency in your `Cargo.toml`.
//!
//! ```toml
//! [dependencies]
//! dvbsub-decoder = "~0.1.0"
//! ```
//!
//! ```no_run
//! use dvbsub_decoder::{ComposedPage, Decoder, FixedArray, Presenter};
//!
//! struct Printer;
//!
//! impl Presenter for Printer {
//!     fn present(&mut self, page: &ComposedPage<'_>) {
//!         println!("page {} with {} regions", page.page_id(), page.regions().len());
//!     }
//!
//!     fn clear(&mut self, page_id: u16) {
//!         println!("page {} removed", page_id);
//!     }
//! }
//!
//! # fn packets() -> Vec<Vec<u8>> { Vec::new() }
//! let mut decoder = Decoder::default();
//! for packet in packets() {
//!     let report = decoder.process_pes_packet(&packet);
//!     for error in report.errors.iter() {
//!         eprintln!("{}", error);
//!     }
//!     decoder.draw(&mut Printer);
//! }
//! ```

use std::fmt::{self, Formatter};
use std::result;

mod fixed_array;
pub use fixed_array::{FixedArray, SizedArray};

mod pool;
pub use pool::{Pool, PoolIndex};

mod arena;
pub use arena::{ArenaSpan, PixelArena};

mod slice_reader;
pub use slice_reader::{BitReader, SliceReader};

mod pes;
pub use pes::{PesHeader, PesOptionalHeader, PesPacket};

mod segment;
pub use segment::{Segment, SegmentData, SegmentHeader, Segments};

mod clut;
pub use clut::{Argb, Clut, ClutDefinition, ClutEntry, YCrCbT};

mod region;
pub use region::{ObjectPlacement, Region, RegionComposition, RegionObjectType};

mod page;
pub use page::{Page, PageComposition, PageLifecycle, PageState, RegionPlacement};

mod display;
pub use display::{Display, DisplayDefinition, Rect};

mod pixel;
pub use pixel::{BitmapSink, MapTables, PixelDecoder, PixelDepth, PixelSink};

mod object;
pub use object::{Object, ObjectCodingMethod, ObjectData, ObjectState};

mod decoder;
pub use decoder::{Decoder, DecoderConfig, PacketReport, PageSelection, PoolUsage, Specification};

mod compose;
pub use compose::{ComposedPage, ComposedRegion, Presenter};

/// Maximum number of pages tracked at once.
pub const MAX_PAGES: usize = 4;
/// Maximum number of regions across all pages.
pub const MAX_REGIONS: usize = 32;
/// Maximum number of CLUTs across all pages.
pub const MAX_CLUTS: usize = 32;
/// Maximum number of objects across all pages.
pub const MAX_OBJECTS: usize = 128;
/// Maximum number of object placements in one region.
pub const MAX_REGION_OBJECTS: usize = 64;
/// Maximum number of region placements in one page.
pub const MAX_PAGE_REGIONS: usize = 16;
/// Maximum number of errors kept in a [`PacketReport`].
pub const MAX_REPORTED_ERRORS: usize = 8;

/// PTS ticks per second.
pub const PTS_TICKS_PER_SECOND: u64 = 90_000;
const PTS_MASK: u64 = 0x1_FFFF_FFFF;

/// Storage which ran out of free slots.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PoolKind {
    Page,
    Region,
    Clut,
    Object,
    Display,
    PixelMemory,
}

/// Kinds of decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetails {
    /// A read of the given number of bytes ran past the end of the available data.
    Underrun(usize),
    /// Expected the segment sync byte, found this value instead.
    SyncLost(u8),
    /// CLUT entry index outside the table of the flagged depth.
    MalformedClut { entry_id: u8, depth_bits: u8 },
    /// More object placements than a region can hold.
    RegionOverflow(usize),
    /// More region placements than a page can hold.
    PageOverflow(usize),
    InvalidRegionSize { width: u16, height: u16 },
    InvalidRegionDepth(u8),
    InvalidObjectType(u8),
    /// Object placement or decoded object extends past its region.
    ObjectOutsideRegion { object_id: u16, x: u16, y: u16 },
    /// Display window not contained in the display.
    InvalidWindow,
    DisplayTooLarge { width: u16, height: u16 },
    InvalidCodingMethod(u8),
    /// Pixel run or line end disagrees with the declared object extent.
    PixelRunOverflow { row: usize, column: usize, width: usize },
    InvalidPixelDataType(u8),
    /// Pixel string depth cannot be written into the object depth.
    PixelDepthMismatch { string_bits: u8, object_bits: u8 },
    PoolExhausted(PoolKind),
    BadPesHeader,
    NotSubtitleStream(u8),
    BadDataIdentifier(u8),
    BadSubtitleStreamId(u8),
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetails::Underrun(len) => write!(f, "underrun reading {} bytes", len),
            ErrorDetails::SyncLost(byte) => write!(f, "lost segment sync (found {:#04x})", byte),
            ErrorDetails::MalformedClut {
                entry_id,
                depth_bits,
            } => write!(
                f,
                "CLUT entry {} out of range for {}-bit table",
                entry_id, depth_bits
            ),
            ErrorDetails::RegionOverflow(count) => {
                write!(f, "region lists more than {} objects", count)
            }
            ErrorDetails::PageOverflow(count) => {
                write!(f, "page lists more than {} regions", count)
            }
            ErrorDetails::InvalidRegionSize { width, height } => {
                write!(f, "invalid region size {}x{}", width, height)
            }
            ErrorDetails::InvalidRegionDepth(code) => write!(f, "invalid region depth {}", code),
            ErrorDetails::InvalidObjectType(code) => write!(f, "invalid object type {}", code),
            ErrorDetails::ObjectOutsideRegion { object_id, x, y } => write!(
                f,
                "object {} at ({}, {}) does not fit its region",
                object_id, x, y
            ),
            ErrorDetails::InvalidWindow => write!(f, "display window outside display"),
            ErrorDetails::DisplayTooLarge { width, height } => {
                write!(f, "display {}x{} too large", width, height)
            }
            ErrorDetails::InvalidCodingMethod(code) => {
                write!(f, "invalid object coding method {}", code)
            }
            ErrorDetails::PixelRunOverflow { row, column, width } => write!(
                f,
                "pixel data at row {} column {} disagrees with width {}",
                row, column, width
            ),
            ErrorDetails::InvalidPixelDataType(code) => {
                write!(f, "invalid pixel data type {:#04x}", code)
            }
            ErrorDetails::PixelDepthMismatch {
                string_bits,
                object_bits,
            } => write!(
                f,
                "{}-bit pixel string in {}-bit object",
                string_bits, object_bits
            ),
            ErrorDetails::PoolExhausted(kind) => write!(f, "{:?} pool exhausted", kind),
            ErrorDetails::BadPesHeader => write!(f, "bad PES header"),
            ErrorDetails::NotSubtitleStream(id) => write!(f, "stream id {:#04x} is not private stream 1", id),
            ErrorDetails::BadDataIdentifier(id) => write!(f, "bad data identifier {:#04x}", id),
            ErrorDetails::BadSubtitleStreamId(id) => {
                write!(f, "bad subtitle stream id {:#04x}", id)
            }
        }
    }
}

/// Decoding error with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    location: usize,
    details: ErrorDetails,
}

impl Error {
    pub fn new(location: usize, details: ErrorDetails) -> Self {
        Self { location, details }
    }

    /// Byte offset within the packet.
    pub fn location(&self) -> usize {
        self.location
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.details, self.location)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! pts_format_args {
    ($pts:expr) => {
        format_args!(
            "{}:{}:{}:{}",
            $pts / (90000 * 60 * 60),
            $pts / (90000 * 60) % 60,
            $pts / 90000 % 60,
            $pts % 90000
        )
    };
}

fn parse_timestamp(b: &[u8; 5]) -> u64 {
    let mut ts: u64 = ((b[0] & 0x0E) as u64) << 29;
    ts |= (b[1] as u64) << 22;
    ts |= ((b[2] & 0xFE) as u64) << 14;
    ts |= (b[3] as u64) << 7;
    ts |= ((b[4] & 0xFE) as u64) >> 1;
    ts
}

/// Ticks from `since` to `now` on the 33-bit PTS clock, or `None` when `now` is before `since`.
fn pts_elapsed(since: u64, now: u64) -> Option<u64> {
    let elapsed = now.wrapping_sub(since) & PTS_MASK;
    if elapsed > PTS_MASK / 2 {
        None
    } else {
        Some(elapsed)
    }
}

fn from_primitive_map_err<
    T: num_traits::FromPrimitive,
    U: Clone + Into<u64>,
    E,
    F: FnOnce(U) -> E,
>(
    val: U,
    err_fn: F,
) -> result::Result<T, E> {
    match T::from_u64(val.clone().into()) {
        Some(v) => Ok(v),
        None => Err(err_fn(val)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_bits() {
        // PTS 0x1_2345_6789 with marker bits set
        let pts = 0x1_2345_6789_u64;
        let bytes = [
            0x21 | ((pts >> 29) & 0x0E) as u8,
            (pts >> 22) as u8,
            ((pts >> 14) as u8 & 0xFE) | 1,
            (pts >> 7) as u8,
            ((pts << 1) as u8 & 0xFE) | 1,
        ];
        assert_eq!(parse_timestamp(&bytes), pts);
    }

    #[test]
    fn elapsed_wraps_at_33_bits() {
        assert_eq!(pts_elapsed(PTS_MASK - 9, 10), Some(20));
        assert_eq!(pts_elapsed(100, 100 + 90_000), Some(90_000));
        assert_eq!(pts_elapsed(1_000, 10), None);
    }

    #[test]
    fn error_display_names_location() {
        let error = Error::new(12, ErrorDetails::SyncLost(0x47));
        assert_eq!(error.to_string(), "lost segment sync (found 0x47) at byte 12");
    }
}
