#![allow(dead_code)]

pub const PAGE_COMPOSITION: u8 = 0x10;
pub const REGION_COMPOSITION: u8 = 0x11;
pub const CLUT_DEFINITION: u8 = 0x12;
pub const OBJECT_DATA: u8 = 0x13;
pub const DISPLAY_DEFINITION: u8 = 0x14;
pub const END_OF_DISPLAY_SET: u8 = 0x80;

pub const NORMAL: u8 = 0;
pub const ACQUISITION_POINT: u8 = 1;
pub const EPOCH_RESET: u8 = 3;

/// Region depth codes.
pub const DEPTH_2BIT: u8 = 1;
pub const DEPTH_4BIT: u8 = 2;
pub const DEPTH_8BIT: u8 = 3;

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

pub fn segment(segment_type: u8, page_id: u16, body: &[u8]) -> Vec<u8> {
    let mut out = vec![0x0F, segment_type];
    out.extend_from_slice(&page_id.to_be_bytes());
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

pub fn display_definition(page_id: u16, version: u8, width: u16, height: u16) -> Vec<u8> {
    let mut body = vec![version << 4];
    body.extend_from_slice(&(width - 1).to_be_bytes());
    body.extend_from_slice(&(height - 1).to_be_bytes());
    segment(DISPLAY_DEFINITION, page_id, &body)
}

/// CLUT definition with full-range entries `(id, y, cr, cb, t)` present at every depth.
pub fn clut_definition(page_id: u16, clut_id: u8, version: u8, entries: &[(u8, u8, u8, u8, u8)]) -> Vec<u8> {
    let mut body = vec![clut_id, version << 4];
    for &(id, y, cr, cb, t) in entries {
        let flags = if id < 4 { 0xE1 } else if id < 16 { 0x61 } else { 0x21 };
        body.extend_from_slice(&[id, flags, y, cr, cb, t]);
    }
    segment(CLUT_DEFINITION, page_id, &body)
}

pub struct RegionSpec<'a> {
    pub id: u8,
    pub version: u8,
    pub width: u16,
    pub height: u16,
    pub depth: u8,
    pub clut_id: u8,
    /// Paint the background code under the objects.
    pub fill: bool,
    pub background: u8,
    /// `(object_id, x, y)` bitmap placements.
    pub objects: &'a [(u16, u16, u16)],
}

pub fn region_composition(page_id: u16, region: &RegionSpec) -> Vec<u8> {
    let mut body = vec![region.id, region.version << 4 | (region.fill as u8) << 3];
    body.extend_from_slice(&region.width.to_be_bytes());
    body.extend_from_slice(&region.height.to_be_bytes());
    body.push(region.depth << 5 | region.depth << 2);
    body.push(region.clut_id);
    // the same background code for every depth, masked to its width
    body.push(region.background);
    body.push((region.background & 0x0F) << 4 | (region.background & 0x03) << 2);
    for &(object_id, x, y) in region.objects {
        body.extend_from_slice(&object_id.to_be_bytes());
        body.extend_from_slice(&(x & 0x0FFF).to_be_bytes());
        body.extend_from_slice(&(y & 0x0FFF).to_be_bytes());
    }
    segment(REGION_COMPOSITION, page_id, &body)
}

/// Page composition placing `(region_id, x, y)` regions.
pub fn page_composition(
    page_id: u16,
    timeout: u8,
    version: u8,
    state: u8,
    regions: &[(u8, u16, u16)],
) -> Vec<u8> {
    let mut body = vec![timeout, version << 4 | state << 2];
    for &(id, x, y) in regions {
        body.extend_from_slice(&[id, 0xFF]);
        body.extend_from_slice(&x.to_be_bytes());
        body.extend_from_slice(&y.to_be_bytes());
    }
    segment(PAGE_COMPOSITION, page_id, &body)
}

/// Pixel-coded object; an empty bottom field repeats the top field.
pub fn object_data(page_id: u16, object_id: u16, version: u8, top: &[u8], bottom: &[u8]) -> Vec<u8> {
    let mut body = object_id.to_be_bytes().to_vec();
    body.push(version << 4);
    body.extend_from_slice(&(top.len() as u16).to_be_bytes());
    body.extend_from_slice(&(bottom.len() as u16).to_be_bytes());
    body.extend_from_slice(top);
    body.extend_from_slice(bottom);
    segment(OBJECT_DATA, page_id, &body)
}

pub fn end_of_display_set(page_id: u16) -> Vec<u8> {
    segment(END_OF_DISPLAY_SET, page_id, &[])
}

/// MSB-first bit packer for pixel strings.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, value: u32, count: u32) {
        for bit in (0..count).rev() {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if value >> bit & 1 != 0 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> (self.bits % 8);
            }
            self.bits += 1;
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// One line of 4-bit pixel data: runs of `(count, code)` with counts up to 280.
pub fn line_4bit(runs: &[(u32, u8)]) -> Vec<u8> {
    let mut bits = BitWriter::new();
    for &(count, code) in runs {
        let code = code as u32;
        match count {
            1 if code != 0 => bits.write(code, 4),
            4..=7 => {
                bits.write(0b0000_10, 6);
                bits.write(count - 4, 2);
                bits.write(code, 4);
            }
            9..=24 => {
                bits.write(0b0000_1110, 8);
                bits.write(count - 9, 4);
                bits.write(code, 4);
            }
            25..=280 => {
                bits.write(0b0000_1111, 8);
                bits.write(count - 25, 8);
                bits.write(code, 4);
            }
            _ => {
                for _ in 0..count {
                    if code == 0 {
                        bits.write(0b0000_1100, 8);
                    } else {
                        bits.write(code, 4);
                    }
                }
            }
        }
    }
    // end of string
    bits.write(0b0000_0000, 8);
    let mut out = vec![0x11];
    out.extend(bits.finish());
    out.push(0xF0);
    out
}

/// A field of `lines` identical lines.
pub fn field(lines: usize, line: &[u8]) -> Vec<u8> {
    line.iter()
        .copied()
        .cycle()
        .take(line.len() * lines)
        .collect()
}

pub fn encode_pts(pts: u64) -> [u8; 5] {
    [
        0x21 | ((pts >> 29) & 0x0E) as u8,
        (pts >> 22) as u8,
        ((pts >> 14) as u8 & 0xFE) | 1,
        (pts >> 7) as u8,
        ((pts << 1) as u8 & 0xFE) | 1,
    ]
}

/// Wraps segments into a subtitle PES packet with a PTS.
pub fn pes_packet(pts: u64, segments: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![0x20, 0x00];
    for segment in segments {
        data.extend_from_slice(segment);
    }
    data.push(0xFF);

    let pes_length = 3 + 5 + data.len();
    let mut out = vec![0x00, 0x00, 0x01, 0xBD];
    out.extend_from_slice(&(pes_length as u16).to_be_bytes());
    out.extend_from_slice(&[0x80, 0x80, 0x05]);
    out.extend_from_slice(&encode_pts(pts));
    out.extend(data);
    out
}
