//! Segment framing and dispatch by segment type.

use super::{
    read_bitfield, ClutDefinition, DisplayDefinition, Error, ErrorDetails, ObjectData,
    PageComposition, RegionComposition, Result, SliceReader,
};
use log::{trace, warn};
use modular_bitfield_msb::prelude::*;

/// First byte of every segment.
pub const SYNC_BYTE: u8 = 0x0F;
/// Terminates the segments of a PES data field.
pub const END_OF_PES_DATA_FIELD_MARKER: u8 = 0xFF;

/// Common header of all segments.
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct SegmentHeader {
    pub sync_byte: B8,
    pub segment_type: B8,
    pub page_id: B16,
    pub segment_length: B16,
}

/// Marks the end of a display set. Carries no data.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EndOfDisplaySet;

impl EndOfDisplaySet {
    fn parse(_reader: &mut SliceReader) -> Result<Self> {
        Ok(Self)
    }
}

macro_rules! segment_data {
    (
        $lt:lifetime;
        $($(#[$vattr:meta])* $var:ident($ty:ty) = $val:literal,)*
    ) => {
        /// Parsed body of a segment.
        #[derive(Debug)]
        pub enum SegmentData<$lt> {
            $($(#[$vattr])* $var($ty),)*
            /// Segment type not handled by this decoder; its body is skipped.
            Unknown(u8),
        }

        fn parse_segment_data<$lt>(segment_type: u8, reader: &mut SliceReader<$lt>) -> Result<SegmentData<$lt>> {
            let data = match segment_type {
                $($val => SegmentData::$var(<$ty>::parse(reader)?),)*
                _ => SegmentData::Unknown(segment_type),
            };

            if reader.remaining_len() > 0 {
                trace!("{} bytes of segment {:#04x} not read", reader.remaining_len(), segment_type);
            }

            Ok(data)
        }
    };
}

segment_data! {
    'a;
    /// Page composition segment.
    PageComposition(PageComposition) = 0x10,
    /// Region composition segment.
    RegionComposition(RegionComposition) = 0x11,
    /// CLUT definition segment.
    ClutDefinition(ClutDefinition<'a>) = 0x12,
    /// Object data segment.
    ObjectData(ObjectData<'a>) = 0x13,
    /// Display definition segment.
    DisplayDefinition(DisplayDefinition) = 0x14,
    /// End of display set segment.
    EndOfDisplaySet(EndOfDisplaySet) = 0x80,
}

/// A framed segment whose body has not been parsed yet.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    pub header: SegmentHeader,
    location: usize,
    body: SliceReader<'a>,
}

impl<'a> Segment<'a> {
    pub fn page_id(&self) -> u16 {
        self.header.page_id()
    }

    pub fn segment_type(&self) -> u8 {
        self.header.segment_type()
    }

    /// Location of the sync byte.
    pub fn location(&self) -> usize {
        self.location
    }

    pub fn make_error(&self, details: ErrorDetails) -> Error {
        Error::new(self.location, details)
    }

    pub fn parse_data(&self) -> Result<SegmentData<'a>> {
        parse_segment_data(self.segment_type(), &mut self.body.clone())
    }
}

/// Iterates the segments of a PES data field.
///
/// Iteration ends at the end-of-data marker, at the end of the data, or after the first
/// framing error, which is yielded since nothing after it can be trusted.
pub struct Segments<'a> {
    reader: SliceReader<'a>,
    done: bool,
}

impl<'a> Segments<'a> {
    pub fn new(reader: SliceReader<'a>) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    fn read_segment(&mut self) -> Result<Segment<'a>> {
        let location = self.reader.location();
        let header = read_bitfield!(self.reader, SegmentHeader);
        if header.sync_byte() != SYNC_BYTE {
            warn!("Lost segment sync at byte {}", location);
            return Err(Error::new(
                location,
                ErrorDetails::SyncLost(header.sync_byte()),
            ));
        }
        let body = self
            .reader
            .new_sub_reader(header.segment_length() as usize)?;
        Ok(Segment {
            header,
            location,
            body,
        })
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Result<Segment<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.reader.remaining_len() == 0 {
            return None;
        }
        if self.reader.peek_u8().ok()? == END_OF_PES_DATA_FIELD_MARKER {
            self.done = true;
            if self.reader.remaining_len() > 1 {
                trace!(
                    "Ignoring {} bytes after end of data marker",
                    self.reader.remaining_len() - 1
                );
            }
            return None;
        }
        let segment = self.read_segment();
        if segment.is_err() {
            self.done = true;
        }
        Some(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(segment_type: u8, page_id: u16, body: &[u8]) -> Vec<u8> {
        let mut out = vec![SYNC_BYTE, segment_type];
        out.extend_from_slice(&page_id.to_be_bytes());
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn walks_segments_until_marker() {
        let mut data = segment(0x80, 1, &[]);
        data.extend(segment(0x15, 1, &[1, 2, 3]));
        data.extend(segment(0x80, 2, &[]));
        data.push(END_OF_PES_DATA_FIELD_MARKER);
        data.extend(segment(0x80, 3, &[]));

        let segments: Vec<_> = Segments::new(SliceReader::new(&data))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].page_id(), 1);
        assert_eq!(segments[1].location(), 6);
        assert!(matches!(
            segments[1].parse_data().unwrap(),
            SegmentData::Unknown(0x15)
        ));
        assert!(matches!(
            segments[2].parse_data().unwrap(),
            SegmentData::EndOfDisplaySet(_)
        ));
    }

    #[test]
    fn sync_loss_stops_iteration() {
        let mut data = segment(0x80, 1, &[]);
        data.extend_from_slice(&[0x47, 0x80, 0, 1, 0, 0]);
        data.extend(segment(0x80, 1, &[]));

        let mut segments = Segments::new(SliceReader::new(&data));
        assert!(segments.next().unwrap().is_ok());
        let error = segments.next().unwrap().unwrap_err();
        assert_eq!(error.details(), &ErrorDetails::SyncLost(0x47));
        assert_eq!(error.location(), 6);
        assert!(segments.next().is_none());
    }

    #[test]
    fn body_is_bounded_by_length() {
        // Unknown segment body must not leak into the next header.
        let mut data = segment(0x42, 1, &[SYNC_BYTE, 0x10, 0, 1, 0, 0]);
        data.extend(segment(0x80, 7, &[]));
        let pages: Vec<u16> = Segments::new(SliceReader::new(&data))
            .map(|s| s.unwrap().page_id())
            .collect();
        assert_eq!(pages, vec![1, 7]);
    }

    #[test]
    fn overlong_length_is_an_underrun() {
        let mut data = segment(0x10, 1, &[0; 4]);
        data.truncate(data.len() - 2);
        let error = Segments::new(SliceReader::new(&data))
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(error.details(), &ErrorDetails::Underrun(4));
    }
}
