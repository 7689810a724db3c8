use super::{
    from_primitive_map_err, read_bitfield, ErrorDetails, FixedArray, PixelDepth, Result,
    SizedArray, SliceReader, MAX_REGION_OBJECTS,
};
use modular_bitfield_msb::prelude::*;
use num_derive::FromPrimitive;

#[bitfield]
#[derive(Debug)]
struct RegionCompositionHeader {
    region_id: B8,
    version: B4,
    fill_flag: bool,
    #[skip]
    reserved: B3,
    width: B16,
    height: B16,
    compatibility_level: B3,
    depth: B3,
    #[skip]
    reserved2: B2,
    clut_id: B8,
    pixel_code_8bit: B8,
    pixel_code_4bit: B4,
    pixel_code_2bit: B2,
    #[skip]
    reserved3: B2,
}

#[bitfield]
#[derive(Debug)]
struct RegionObjectHeader {
    object_id: B16,
    object_type: B2,
    provider_flag: B2,
    horizontal_position: B12,
    #[skip]
    reserved: B4,
    vertical_position: B12,
}

/// Kind of object placed in a region.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum RegionObjectType {
    Bitmap = 0,
    Character = 1,
    CompositeString = 2,
}

impl Default for RegionObjectType {
    fn default() -> Self {
        RegionObjectType::Bitmap
    }
}

/// Position of an object within its region.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ObjectPlacement {
    pub object_id: u16,
    pub object_type: RegionObjectType,
    /// 0 when the object is carried in the stream, 1 for objects stored in decoder ROM.
    pub provider_flag: u8,
    pub x: u16,
    pub y: u16,
    /// Foreground code of character objects.
    pub foreground: u8,
    /// Background code of character objects.
    pub background: u8,
}

impl ObjectPlacement {
    /// Whether this placement refers to a bitmap delivered in object data segments.
    pub fn is_stream_bitmap(&self) -> bool {
        self.object_type == RegionObjectType::Bitmap && self.provider_flag == 0
    }
}

/// Region composition segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionComposition {
    pub id: u8,
    pub version: u8,
    /// Region is to be filled with the background code of its depth.
    pub fill: bool,
    pub width: u16,
    pub height: u16,
    /// Minimum pixel depth a decoder needs to show this region.
    pub compatibility_level: PixelDepth,
    pub depth: PixelDepth,
    pub clut_id: u8,
    pub background_8bit: u8,
    pub background_4bit: u8,
    pub background_2bit: u8,
    pub objects: SizedArray<ObjectPlacement, MAX_REGION_OBJECTS>,
}

impl RegionComposition {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let header = read_bitfield!(reader, RegionCompositionHeader);
        let depth = from_primitive_map_err(header.depth(), |v| {
            reader.make_error(ErrorDetails::InvalidRegionDepth(v))
        })?;
        let compatibility_level = from_primitive_map_err(header.compatibility_level(), |v| {
            reader.make_error(ErrorDetails::InvalidRegionDepth(v))
        })?;
        let (width, height) = (header.width(), header.height());
        if width == 0 || height == 0 {
            return Err(reader.make_error(ErrorDetails::InvalidRegionSize { width, height }));
        }

        let mut objects = SizedArray::new();
        while reader.remaining_len() > 0 {
            let location = reader.location();
            let object = read_bitfield!(reader, RegionObjectHeader);
            let object_type = from_primitive_map_err(object.object_type(), |v| {
                reader.make_error(ErrorDetails::InvalidObjectType(v))
            })?;
            let (foreground, background) = match object_type {
                RegionObjectType::Bitmap => (0, 0),
                _ => (reader.read_u8()?, reader.read_u8()?),
            };
            let placement = ObjectPlacement {
                object_id: object.object_id(),
                object_type,
                provider_flag: object.provider_flag(),
                x: object.horizontal_position(),
                y: object.vertical_position(),
                foreground,
                background,
            };
            if placement.x >= width || placement.y >= height {
                return Err(crate::Error::new(
                    location,
                    ErrorDetails::ObjectOutsideRegion {
                        object_id: placement.object_id,
                        x: placement.x,
                        y: placement.y,
                    },
                ));
            }
            if objects.push(placement).is_err() {
                return Err(crate::Error::new(
                    location,
                    ErrorDetails::RegionOverflow(objects.capacity()),
                ));
            }
        }

        Ok(Self {
            id: header.region_id(),
            version: header.version(),
            fill: header.fill_flag(),
            width,
            height,
            compatibility_level,
            depth,
            clut_id: header.clut_id(),
            background_8bit: header.pixel_code_8bit(),
            background_4bit: header.pixel_code_4bit(),
            background_2bit: header.pixel_code_2bit(),
            objects,
        })
    }
}

/// Rectangle of a page composed from placed objects, coloured through one CLUT.
#[derive(Debug, Clone)]
pub struct Region {
    page_id: u16,
    composition: RegionComposition,
}

impl Region {
    pub fn new(page_id: u16, composition: RegionComposition) -> Self {
        Self {
            page_id,
            composition,
        }
    }

    pub fn page_id(&self) -> u16 {
        self.page_id
    }

    pub fn id(&self) -> u8 {
        self.composition.id
    }

    pub fn version(&self) -> u8 {
        self.composition.version
    }

    pub fn width(&self) -> u16 {
        self.composition.width
    }

    pub fn height(&self) -> u16 {
        self.composition.height
    }

    pub fn depth(&self) -> PixelDepth {
        self.composition.depth
    }

    pub fn clut_id(&self) -> u8 {
        self.composition.clut_id
    }

    pub fn fill(&self) -> bool {
        self.composition.fill
    }

    pub fn composition(&self) -> &RegionComposition {
        &self.composition
    }

    pub fn objects(&self) -> &[ObjectPlacement] {
        self.composition.objects.as_slice()
    }

    /// Pixel code shown where no object covers the region.
    pub fn background_index(&self) -> u8 {
        match self.composition.depth {
            PixelDepth::Bits2 => self.composition.background_2bit,
            PixelDepth::Bits4 => self.composition.background_4bit,
            PixelDepth::Bits8 => self.composition.background_8bit,
        }
    }

    /// Replaces the region definition, returning `false` for a repeat of the current version.
    pub fn update(&mut self, composition: RegionComposition) -> bool {
        if composition.version == self.composition.version {
            return false;
        }
        self.composition = composition;
        true
    }

    /// Whether an object of `width` x `height` fits at the placement point.
    pub fn fits(&self, placement: &ObjectPlacement, width: u16, height: u16) -> bool {
        placement.x as u32 + width as u32 <= self.width() as u32
            && placement.y as u32 + height as u32 <= self.height() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_bytes(id: u8, version: u8, width: u16, height: u16) -> Vec<u8> {
        let mut out = vec![id, version << 4 | 0x08];
        out.extend_from_slice(&width.to_be_bytes());
        out.extend_from_slice(&height.to_be_bytes());
        // 4-bit compatibility, 4-bit depth, CLUT 0, backgrounds 0x11 / 5 / 2
        out.extend_from_slice(&[0b010_010_00, 0, 0x11, 0x5 << 4 | 0x2 << 2]);
        out
    }

    fn placement(out: &mut Vec<u8>, object_id: u16, object_type: u8, x: u16, y: u16) {
        out.extend_from_slice(&object_id.to_be_bytes());
        out.extend_from_slice(&((object_type as u16) << 14 | x).to_be_bytes());
        out.extend_from_slice(&y.to_be_bytes());
    }

    #[test]
    fn parses_header_and_placements() {
        let mut bytes = region_bytes(1, 3, 64, 32);
        placement(&mut bytes, 0x0102, 0, 0, 0);
        placement(&mut bytes, 7, 1, 10, 20);
        bytes.extend_from_slice(&[0x0F, 0x01]);

        let region = RegionComposition::parse(&mut SliceReader::new(&bytes)).unwrap();
        assert_eq!(region.id, 1);
        assert_eq!(region.version, 3);
        assert!(region.fill);
        assert_eq!((region.width, region.height), (64, 32));
        assert_eq!(region.depth, PixelDepth::Bits4);
        assert_eq!(region.objects.len(), 2);
        assert_eq!(region.objects.get(0).object_id, 0x0102);
        let text = region.objects.get(1);
        assert_eq!(text.object_type, RegionObjectType::Character);
        assert_eq!((text.x, text.y), (10, 20));
        assert_eq!((text.foreground, text.background), (0x0F, 0x01));
        assert!(!text.is_stream_bitmap());

        let region = Region::new(1, region);
        assert_eq!(region.background_index(), 5);
    }

    #[test]
    fn rejects_placement_outside_region() {
        let mut bytes = region_bytes(1, 0, 64, 32);
        placement(&mut bytes, 1, 0, 64, 0);
        let error = RegionComposition::parse(&mut SliceReader::new(&bytes)).unwrap_err();
        assert_eq!(
            error.details(),
            &ErrorDetails::ObjectOutsideRegion {
                object_id: 1,
                x: 64,
                y: 0
            }
        );
        assert_eq!(error.location(), 10);
    }

    #[test]
    fn rejects_too_many_placements() {
        let mut bytes = region_bytes(1, 0, 64, 32);
        for id in 0..=MAX_REGION_OBJECTS as u16 {
            placement(&mut bytes, id, 0, 0, 0);
        }
        let error = RegionComposition::parse(&mut SliceReader::new(&bytes)).unwrap_err();
        assert_eq!(
            error.details(),
            &ErrorDetails::RegionOverflow(MAX_REGION_OBJECTS)
        );
    }

    #[test]
    fn rejects_reserved_depth() {
        let mut bytes = region_bytes(1, 0, 64, 32);
        bytes[6] = 0b010_111_00;
        let error = RegionComposition::parse(&mut SliceReader::new(&bytes)).unwrap_err();
        assert_eq!(error.details(), &ErrorDetails::InvalidRegionDepth(7));
    }

    #[test]
    fn same_version_update_is_ignored() {
        let bytes = region_bytes(1, 2, 64, 32);
        let first = RegionComposition::parse(&mut SliceReader::new(&bytes)).unwrap();
        let mut region = Region::new(1, first.clone());
        let mut resized = first;
        resized.width = 10;
        assert!(!region.update(resized.clone()));
        assert_eq!(region.width(), 64);
        resized.version = 3;
        assert!(region.update(resized));
        assert_eq!(region.width(), 10);
    }
}
