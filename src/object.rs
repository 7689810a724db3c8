use super::{
    from_primitive_map_err, read_bitfield, ArenaSpan, ErrorDetails, PixelDecoder, PixelDepth,
    PixelSink, Result, SliceReader,
};
use modular_bitfield_msb::prelude::*;
use num_derive::FromPrimitive;

#[bitfield]
#[derive(Debug)]
struct ObjectDataHeader {
    object_id: B16,
    version: B4,
    coding_method: B2,
    non_modifying_colour: bool,
    #[skip]
    reserved: B1,
}

/// How the object is transmitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum ObjectCodingMethod {
    /// Run-length coded pixel fields.
    Pixels = 0,
    /// Character codes rendered by the receiver.
    Characters = 1,
}

/// Object data segment.
#[derive(Debug, Clone)]
pub struct ObjectData<'a> {
    pub id: u16,
    pub version: u8,
    pub coding_method: ObjectCodingMethod,
    /// Pixel code 1 leaves the underlying region pixel unchanged.
    pub non_modifying_colour: bool,
    data: SliceReader<'a>,
}

impl<'a> ObjectData<'a> {
    pub(crate) fn parse(reader: &mut SliceReader<'a>) -> Result<Self> {
        let header = read_bitfield!(reader, ObjectDataHeader);
        let coding_method = from_primitive_map_err(header.coding_method(), |v| {
            reader.make_error(ErrorDetails::InvalidCodingMethod(v))
        })?;
        Ok(Self {
            id: header.object_id(),
            version: header.version(),
            coding_method,
            non_modifying_colour: header.non_modifying_colour(),
            data: reader.new_sub_reader(reader.remaining_len())?,
        })
    }

    /// Splits the pixel data into top and bottom field readers.
    ///
    /// A bottom field of length zero repeats the top field.
    pub fn fields(&self) -> Result<(SliceReader<'a>, SliceReader<'a>)> {
        let mut reader = self.data.clone();
        let top_length = reader.read_be_u16()? as usize;
        let bottom_length = reader.read_be_u16()? as usize;
        let top = reader.new_sub_reader(top_length)?;
        let bottom = if bottom_length == 0 {
            top.clone()
        } else {
            reader.new_sub_reader(bottom_length)?
        };
        Ok((top, bottom))
    }

    /// Decodes both fields into `sink`, returning the height of the decoded bitmap.
    pub fn decode_pixels<S: PixelSink>(&self, sink: &mut S) -> Result<usize> {
        let (mut top, mut bottom) = self.fields()?;
        let top_lines = PixelDecoder::new(sink, 0).decode(&mut top)?;
        let bottom_lines = PixelDecoder::new(sink, 1).decode(&mut bottom)?;
        Ok((top_lines * 2).saturating_sub(1).max(bottom_lines * 2))
    }
}

/// Decode progress of an object.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ObjectState {
    /// Placed but its data has not been fully delivered.
    Pending,
    Complete,
    /// Its data was malformed.
    Failed,
}

/// A decoded object bitmap of CLUT indices.
#[derive(Debug, Clone)]
pub struct Object {
    page_id: u16,
    id: u16,
    version: u8,
    state: ObjectState,
    depth: PixelDepth,
    width: u16,
    height: u16,
    non_modifying_colour: bool,
    pixels: Option<ArenaSpan>,
}

impl Object {
    pub fn new(page_id: u16, id: u16, version: u8, depth: PixelDepth) -> Self {
        Self {
            page_id,
            id,
            version,
            state: ObjectState::Pending,
            depth,
            width: 0,
            height: 0,
            non_modifying_colour: false,
            pixels: None,
        }
    }

    pub fn page_id(&self) -> u16 {
        self.page_id
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn state(&self) -> ObjectState {
        self.state
    }

    pub fn depth(&self) -> PixelDepth {
        self.depth
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn non_modifying_colour(&self) -> bool {
        self.non_modifying_colour
    }

    pub fn pixels(&self) -> Option<ArenaSpan> {
        self.pixels
    }

    pub fn is_complete(&self) -> bool {
        self.state == ObjectState::Complete
    }

    /// Starts a new decode of `data` at `depth`, dropping the previous bitmap span.
    pub(crate) fn restart(&mut self, data: &ObjectData, depth: PixelDepth) -> Option<ArenaSpan> {
        self.version = data.version;
        self.non_modifying_colour = data.non_modifying_colour;
        self.depth = depth;
        self.state = ObjectState::Pending;
        self.width = 0;
        self.height = 0;
        self.pixels.take()
    }

    pub(crate) fn complete(&mut self, pixels: ArenaSpan, width: u16, height: u16) {
        self.pixels = Some(pixels);
        self.width = width;
        self.height = height;
        self.state = ObjectState::Complete;
    }

    pub(crate) fn fail(&mut self, state: ObjectState) {
        self.state = state;
    }

    pub(crate) fn take_pixels(&mut self) -> Option<ArenaSpan> {
        self.pixels.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitmapSink;

    fn object_bytes(id: u16, version: u8, top: &[u8], bottom: &[u8]) -> Vec<u8> {
        let mut out = id.to_be_bytes().to_vec();
        out.push(version << 4);
        out.extend_from_slice(&(top.len() as u16).to_be_bytes());
        out.extend_from_slice(&(bottom.len() as u16).to_be_bytes());
        out.extend_from_slice(top);
        out.extend_from_slice(bottom);
        out
    }

    // One 8-bit line of 2 pixels with the given code.
    fn line(code: u8) -> [u8; 7] {
        [0x12, 0x00, 0x82, code, 0x00, 0x00, 0xF0]
    }

    #[test]
    fn interleaves_fields() {
        let top: Vec<u8> = line(1).iter().chain(line(2).iter()).copied().collect();
        let bottom: Vec<u8> = line(3).iter().chain(line(4).iter()).copied().collect();
        let bytes = object_bytes(9, 1, &top, &bottom);
        let object = ObjectData::parse(&mut SliceReader::new(&bytes)).unwrap();
        assert_eq!(object.id, 9);
        assert_eq!(object.coding_method, ObjectCodingMethod::Pixels);

        let mut pixels = [0_u8; 2 * 6];
        let mut sink = BitmapSink::new(&mut pixels, 2, 6, PixelDepth::Bits8);
        assert_eq!(object.decode_pixels(&mut sink), Ok(4));
        assert_eq!(&pixels[..8], &[1, 1, 3, 3, 2, 2, 4, 4]);
    }

    #[test]
    fn empty_bottom_field_repeats_top() {
        let bytes = object_bytes(1, 0, &line(5), &[]);
        let object = ObjectData::parse(&mut SliceReader::new(&bytes)).unwrap();
        let mut pixels = [0_u8; 4];
        let mut sink = BitmapSink::new(&mut pixels, 2, 2, PixelDepth::Bits8);
        assert_eq!(object.decode_pixels(&mut sink), Ok(2));
        assert_eq!(pixels, [5, 5, 5, 5]);
    }

    #[test]
    fn short_field_data_is_an_underrun() {
        let mut bytes = object_bytes(1, 0, &line(5), &line(6));
        bytes.truncate(bytes.len() - 3);
        let object = ObjectData::parse(&mut SliceReader::new(&bytes)).unwrap();
        let error = object.fields().unwrap_err();
        assert_eq!(error.details(), &ErrorDetails::Underrun(7));
    }

    #[test]
    fn character_objects_are_recognised() {
        let bytes = [0x00, 0x01, 0x04, 0x02, 0x00, 0x41];
        let object = ObjectData::parse(&mut SliceReader::new(&bytes)).unwrap();
        assert_eq!(object.coding_method, ObjectCodingMethod::Characters);

        let bytes = [0x00, 0x01, 0x08];
        let error = ObjectData::parse(&mut SliceReader::new(&bytes)).unwrap_err();
        assert_eq!(error.details(), &ErrorDetails::InvalidCodingMethod(2));
    }
}
