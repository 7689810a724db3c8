use super::{read_bitfield, ErrorDetails, Result, SliceReader};
use log::warn;
use modular_bitfield_msb::prelude::*;

/// Largest display (as `width - 1`, `height - 1`) this decoder composes onto.
const MAX_DISPLAY_WIDTH: u16 = 1919;
const MAX_DISPLAY_HEIGHT: u16 = 1079;

/// Display size assumed when a stream sends no display definition.
pub const DEFAULT_DISPLAY_WIDTH: u16 = 720;
pub const DEFAULT_DISPLAY_HEIGHT: u16 = 576;

#[bitfield]
#[derive(Debug)]
struct DisplayDefinitionHeader {
    version: B4,
    window_flag: bool,
    #[skip]
    reserved: B3,
    display_width: B16,
    display_height: B16,
}

#[bitfield]
#[derive(Debug)]
struct DisplayWindowHeader {
    horizontal_min: B16,
    horizontal_max: B16,
    vertical_min: B16,
    vertical_max: B16,
}

/// Pixel rectangle.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// Display definition segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDefinition {
    pub version: u8,
    /// Full display size.
    pub display: Rect,
    /// Part of the display subtitles are positioned in.
    pub window: Option<Rect>,
}

impl DisplayDefinition {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let header = read_bitfield!(reader, DisplayDefinitionHeader);
        let mut max_x = header.display_width();
        let mut max_y = header.display_height();

        let window = if header.window_flag() {
            let window = read_bitfield!(reader, DisplayWindowHeader);
            let (min_wx, max_wx) = (window.horizontal_min(), window.horizontal_max());
            let (min_wy, max_wy) = (window.vertical_min(), window.vertical_max());
            if min_wx > max_wx || min_wy > max_wy {
                return Err(reader.make_error(ErrorDetails::InvalidWindow));
            }
            if max_x > MAX_DISPLAY_WIDTH || max_y > MAX_DISPLAY_HEIGHT {
                // Some streams signal an oversized display around a window that fits.
                warn!(
                    "Display {}x{} too large; using window extent",
                    max_x as u32 + 1,
                    max_y as u32 + 1
                );
                max_x = max_x.min(max_wx);
                max_y = max_y.min(max_wy);
            }
            if max_wx > max_x || max_wy > max_y {
                return Err(reader.make_error(ErrorDetails::InvalidWindow));
            }
            Some(Rect::new(
                min_wx as u32,
                min_wy as u32,
                (max_wx - min_wx) as u32 + 1,
                (max_wy - min_wy) as u32 + 1,
            ))
        } else {
            None
        };

        if max_x > MAX_DISPLAY_WIDTH || max_y > MAX_DISPLAY_HEIGHT {
            return Err(reader.make_error(ErrorDetails::DisplayTooLarge {
                width: max_x,
                height: max_y,
            }));
        }

        Ok(Self {
            version: header.version(),
            display: Rect::new(0, 0, max_x as u32 + 1, max_y as u32 + 1),
            window,
        })
    }
}

/// Display geometry of one page.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Display {
    page_id: u16,
    version: Option<u8>,
    canvas: Rect,
    window: Rect,
}

impl Display {
    pub fn new(page_id: u16, width: u16, height: u16) -> Self {
        let canvas = Rect::new(0, 0, width as u32, height as u32);
        Self {
            page_id,
            version: None,
            canvas,
            window: canvas,
        }
    }

    pub fn page_id(&self) -> u16 {
        self.page_id
    }

    pub fn version(&self) -> Option<u8> {
        self.version
    }

    pub fn canvas(&self) -> Rect {
        self.canvas
    }

    /// Area of the canvas that region positions are relative to.
    pub fn window(&self) -> Rect {
        self.window
    }

    /// Applies a definition, returning `false` for a repeat of the current version.
    pub fn apply(&mut self, definition: &DisplayDefinition) -> bool {
        if self.version == Some(definition.version) {
            return false;
        }
        self.version = Some(definition.version);
        self.canvas = definition.display;
        self.window = definition.window.unwrap_or(definition.display);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display_bytes(version: u8, max_x: u16, max_y: u16, window: Option<[u16; 4]>) -> Vec<u8> {
        let flag = if window.is_some() { 0x08 } else { 0 };
        let mut out = vec![version << 4 | flag];
        out.extend_from_slice(&max_x.to_be_bytes());
        out.extend_from_slice(&max_y.to_be_bytes());
        for value in window.iter().flatten() {
            out.extend_from_slice(&value.to_be_bytes());
        }
        out
    }

    #[test]
    fn full_hd_without_window() {
        let bytes = display_bytes(1, 1919, 1079, None);
        let definition = DisplayDefinition::parse(&mut SliceReader::new(&bytes)).unwrap();
        assert_eq!(definition.display, Rect::new(0, 0, 1920, 1080));
        let mut display = Display::new(1, DEFAULT_DISPLAY_WIDTH, DEFAULT_DISPLAY_HEIGHT);
        assert!(display.apply(&definition));
        assert_eq!(display.window(), Rect::new(0, 0, 1920, 1080));
        assert!(!display.apply(&definition));
    }

    #[test]
    fn window_inside_display() {
        let bytes = display_bytes(0, 1279, 719, Some([100, 1179, 50, 669]));
        let definition = DisplayDefinition::parse(&mut SliceReader::new(&bytes)).unwrap();
        assert_eq!(definition.window, Some(Rect::new(100, 50, 1080, 620)));
        assert!(definition.display.contains(&definition.window.unwrap()));
    }

    #[test]
    fn window_outside_display_is_rejected() {
        let bytes = display_bytes(0, 719, 575, Some([0, 720, 0, 575]));
        let error = DisplayDefinition::parse(&mut SliceReader::new(&bytes)).unwrap_err();
        assert_eq!(error.details(), &ErrorDetails::InvalidWindow);

        let bytes = display_bytes(0, 719, 575, Some([300, 200, 0, 575]));
        let error = DisplayDefinition::parse(&mut SliceReader::new(&bytes)).unwrap_err();
        assert_eq!(error.details(), &ErrorDetails::InvalidWindow);
    }

    #[test]
    fn oversized_display_falls_back_to_window() {
        let bytes = display_bytes(0, 3839, 2159, Some([0, 1919, 0, 1079]));
        let definition = DisplayDefinition::parse(&mut SliceReader::new(&bytes)).unwrap();
        assert_eq!(definition.display, Rect::new(0, 0, 1920, 1080));

        let bytes = display_bytes(0, 3839, 2159, None);
        let error = DisplayDefinition::parse(&mut SliceReader::new(&bytes)).unwrap_err();
        assert_eq!(
            error.details(),
            &ErrorDetails::DisplayTooLarge {
                width: 3839,
                height: 2159
            }
        );
    }
}
