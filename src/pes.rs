use super::{parse_timestamp, pts_format_args, read_bitfield, ErrorDetails, Result, SliceReader};
use log::warn;
use modular_bitfield_msb::prelude::*;
use std::fmt::{Arguments, Debug, Formatter};

/// Stream id of private_stream_1, which carries DVB subtitles.
pub const PRIVATE_STREAM_1: u8 = 0xBD;
/// `data_identifier` of a DVB subtitle PES data field.
pub const SUBTITLE_DATA_IDENTIFIER: u8 = 0x20;
/// `subtitle_stream_id` of a DVB subtitle PES data field.
pub const SUBTITLE_STREAM_ID: u8 = 0x00;

/// Header of PES unit.
#[bitfield]
#[derive(Debug)]
pub struct PesHeader {
    pub start_code: B24,
    pub stream_id: B8,
    pub packet_length: B16,
}

/// Optional header of PES unit.
#[bitfield]
#[derive(Debug)]
pub struct PesOptionalHeader {
    pub marker_bits: B2,
    pub scrambling_control: B2,
    pub priority: bool,
    pub data_alignment_indicator: bool,
    pub copyright: bool,
    pub original: bool,
    pub has_pts: bool,
    pub has_dts: bool,
    pub escr: bool,
    pub es_rate: bool,
    pub dsm_trick_mode: bool,
    pub has_additional_copy_info: bool,
    pub has_crc: bool,
    pub has_extension: bool,
    pub additional_header_length: B8,
}

/// A private_stream_1 PES packet carrying subtitle segments.
pub struct PesPacket<'a> {
    /// PES Header.
    pub header: PesHeader,
    pub optional_header: PesOptionalHeader,
    /// Presentation time stamp.
    pub pts: Option<u64>,
    /// PES packet data bytes following the optional header.
    data: SliceReader<'a>,
}

impl<'a> PesPacket<'a> {
    pub fn parse(packet: &'a [u8]) -> Result<Self> {
        let mut reader = SliceReader::new(packet);
        let header = read_bitfield!(reader, PesHeader);
        if header.start_code() != 0x000001 {
            warn!("Missing PES start code");
            return Err(reader.make_error(ErrorDetails::BadPesHeader));
        }
        if header.stream_id() != PRIVATE_STREAM_1 {
            return Err(reader.make_error(ErrorDetails::NotSubtitleStream(header.stream_id())));
        }

        let pes_length = header.packet_length() as usize;
        if pes_length == 0 || pes_length > reader.remaining_len() {
            warn!(
                "PES length {} does not match {} available bytes",
                pes_length,
                reader.remaining_len()
            );
            return Err(reader.make_error(ErrorDetails::BadPesHeader));
        }
        if pes_length < reader.remaining_len() {
            warn!(
                "Ignoring {} bytes after PES packet",
                reader.remaining_len() - pes_length
            );
        }
        let mut reader = reader.new_sub_reader(pes_length)?;

        let optional_header = read_bitfield!(reader, PesOptionalHeader);
        let mut o_reader =
            reader.new_sub_reader(optional_header.additional_header_length() as usize)?;
        let pts = if optional_header.has_pts() {
            if o_reader.remaining_len() < 5 {
                warn!("Short read of PTS");
                return Err(o_reader.make_error(ErrorDetails::BadPesHeader));
            }
            Some(parse_timestamp(o_reader.read_array_ref::<5>()?))
        } else {
            None
        };

        Ok(Self {
            header,
            optional_header,
            pts,
            data: reader,
        })
    }

    /// Checks the subtitle data field prefix and returns a reader positioned at the first
    /// segment.
    pub fn subtitle_data(&self) -> Result<SliceReader<'a>> {
        let mut reader = self.data.clone();
        let data_identifier = reader.read_u8()?;
        if data_identifier != SUBTITLE_DATA_IDENTIFIER {
            return Err(reader.make_error(ErrorDetails::BadDataIdentifier(data_identifier)));
        }
        let stream_id = reader.read_u8()?;
        if stream_id != SUBTITLE_STREAM_ID {
            return Err(reader.make_error(ErrorDetails::BadSubtitleStreamId(stream_id)));
        }
        Ok(reader)
    }
}

impl Debug for PesPacket<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("PesPacket");
        s.field("header", &self.header);
        s.field("optional_header", &self.optional_header);
        match self.pts {
            Some(pts) => s.field("pts", &Some(pts_format_args!(pts))),
            None => s.field("pts", &Option::<Arguments>::None),
        };
        s.field("data.len()", &self.data.remaining_len());
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(stream_id: u8, data: &[u8]) -> Vec<u8> {
        let pes_length = 3 + 5 + data.len();
        let mut out = vec![0x00, 0x00, 0x01, stream_id];
        out.extend_from_slice(&(pes_length as u16).to_be_bytes());
        // '10' marker bits, PTS only, 5 header bytes
        out.extend_from_slice(&[0x80, 0x80, 0x05]);
        // PTS 90000
        out.extend_from_slice(&[0x21, 0x00, 0x05, 0xBF, 0x21]);
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn parses_pts_and_data_field() {
        let bytes = packet(PRIVATE_STREAM_1, &[0x20, 0x00, 0xFF]);
        let pes = PesPacket::parse(&bytes).unwrap();
        assert_eq!(pes.pts, Some(90_000));
        let mut data = pes.subtitle_data().unwrap();
        assert_eq!(data.location(), 16);
        assert_eq!(data.read_to_end().unwrap(), &[0xFF]);
    }

    #[test]
    fn rejects_other_streams() {
        let bytes = packet(0xE0, &[0x20, 0x00, 0xFF]);
        let error = PesPacket::parse(&bytes).unwrap_err();
        assert_eq!(error.details(), &ErrorDetails::NotSubtitleStream(0xE0));
    }

    #[test]
    fn rejects_bad_data_identifier() {
        let bytes = packet(PRIVATE_STREAM_1, &[0x10, 0x00, 0xFF]);
        let pes = PesPacket::parse(&bytes).unwrap();
        assert_eq!(
            pes.subtitle_data().unwrap_err().details(),
            &ErrorDetails::BadDataIdentifier(0x10)
        );
    }

    #[test]
    fn rejects_truncated_packet() {
        let mut bytes = packet(PRIVATE_STREAM_1, &[0x20, 0x00, 0xFF]);
        bytes.pop();
        assert_eq!(
            PesPacket::parse(&bytes).unwrap_err().details(),
            &ErrorDetails::BadPesHeader
        );
    }
}
