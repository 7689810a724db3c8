//! Read-only views of displayable pages.

use super::{
    Argb, Clut, Decoder, Object, ObjectPlacement, Page, PageState, PixelDepth, Rect, Region,
    Display, MAX_PAGE_REGIONS, PTS_TICKS_PER_SECOND,
};
use log::debug;
use smallvec::SmallVec;

/// Receives pages as they become displayable and removals of pages shown earlier.
pub trait Presenter {
    fn present(&mut self, page: &ComposedPage<'_>);
    fn clear(&mut self, page_id: u16);
}

/// A displayable page with everything needed to render it.
pub struct ComposedPage<'a> {
    decoder: &'a Decoder,
    page: &'a Page,
    display: Display,
}

impl<'a> ComposedPage<'a> {
    pub(crate) fn new(decoder: &'a Decoder, page: &'a Page, display: Display) -> Self {
        Self {
            decoder,
            page,
            display,
        }
    }

    pub fn page_id(&self) -> u16 {
        self.page.id()
    }

    pub fn version(&self) -> u8 {
        self.page.version().unwrap_or_default()
    }

    pub fn state(&self) -> PageState {
        self.page.state()
    }

    /// Full display the page is shown on.
    pub fn canvas(&self) -> Rect {
        self.display.canvas()
    }

    pub fn window(&self) -> Rect {
        self.display.window()
    }

    pub fn timeout_secs(&self) -> u8 {
        self.page.timeout()
    }

    /// Presentation time of the packet carrying the page composition.
    pub fn pts(&self) -> Option<u64> {
        self.page.pts()
    }

    /// Time the page stays visible, in PTS ticks.
    pub fn display_duration(&self) -> u64 {
        self.page.timeout() as u64 * PTS_TICKS_PER_SECOND
    }

    /// Regions of the page in composition order, positioned on the canvas.
    ///
    /// Regions that are missing, lack their CLUT or leave the display window are left out.
    pub fn regions(&self) -> SmallVec<[ComposedRegion<'a>; MAX_PAGE_REGIONS]> {
        let page_id = self.page.id();
        let window = self.display.window();
        let mut regions = SmallVec::new();
        for placement in self.page.regions() {
            let region = match self.decoder.region(page_id, placement.region_id) {
                Some(region) => region,
                None => continue,
            };
            let clut = match self.decoder.clut(page_id, region.clut_id()) {
                Some(clut) => clut,
                None => continue,
            };
            let rect = Rect::new(
                window.x + placement.x as u32,
                window.y + placement.y as u32,
                region.width() as u32,
                region.height() as u32,
            );
            if !window.contains(&rect) {
                debug!(
                    "Region {} of page {} at {:?} leaves the display window",
                    region.id(),
                    page_id,
                    rect
                );
                continue;
            }
            regions.push(ComposedRegion {
                decoder: self.decoder,
                region,
                clut,
                rect,
            });
        }
        regions
    }
}

/// One region of a composed page.
#[derive(Clone)]
pub struct ComposedRegion<'a> {
    decoder: &'a Decoder,
    region: &'a Region,
    clut: &'a Clut,
    rect: Rect,
}

impl<'a> ComposedRegion<'a> {
    pub fn id(&self) -> u8 {
        self.region.id()
    }

    /// Position and size on the canvas.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn width(&self) -> usize {
        self.region.width() as usize
    }

    pub fn height(&self) -> usize {
        self.region.height() as usize
    }

    pub fn depth(&self) -> PixelDepth {
        self.region.depth()
    }

    pub fn region(&self) -> &'a Region {
        self.region
    }

    pub fn clut(&self) -> &'a Clut {
        self.clut
    }

    /// Decoded objects of the region with their placements, bottom to top.
    fn placed_objects(&self) -> impl Iterator<Item = (&'a ObjectPlacement, &'a Object, &'a [u8])> {
        let decoder = self.decoder;
        let region = self.region;
        region
            .objects()
            .iter()
            .filter(|placement| placement.is_stream_bitmap())
            .filter_map(move |placement| {
                let object = decoder.object(region.page_id(), placement.object_id)?;
                if !object.is_complete()
                    || object.depth() != region.depth()
                    || !region.fits(placement, object.width(), object.height())
                {
                    return None;
                }
                Some((placement, object, decoder.object_pixels(object)))
            })
    }

    /// Code under every object: the background when the region is filled, otherwise 0.
    fn base_index(&self) -> u8 {
        if self.region.fill() {
            self.region.background_index()
        } else {
            0
        }
    }

    /// Pixel code at (`x`, `y`) relative to the region.
    ///
    /// Panics if the point is outside the region.
    pub fn pixel_index(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width() && y < self.height(), "pixel outside region");
        let mut code = self.base_index();
        for (placement, object, pixels) in self.placed_objects() {
            let (left, top) = (placement.x as usize, placement.y as usize);
            let (width, height) = (object.width() as usize, object.height() as usize);
            if x < left || y < top || x >= left + width || y >= top + height {
                continue;
            }
            let value = pixels[(y - top) * width + (x - left)];
            if object.non_modifying_colour() && value == 1 {
                continue;
            }
            code = value;
        }
        code
    }

    pub fn pixel_argb(&self, x: usize, y: usize) -> Argb {
        self.clut.color(self.depth(), self.pixel_index(x, y))
    }

    /// Writes the pixel codes of the region row by row into `out`.
    ///
    /// Panics if `out` holds fewer than `width * height` entries.
    pub fn render_indices(&self, out: &mut [u8]) {
        self.render(out, |code| code);
    }

    /// Writes the colours of the region row by row into `out`.
    ///
    /// Panics if `out` holds fewer than `width * height` entries.
    pub fn render_argb(&self, out: &mut [u32]) {
        let (clut, depth) = (self.clut, self.depth());
        self.render(out, |code| clut.color(depth, code).0);
    }

    fn render<T: Copy, F: Fn(u8) -> T>(&self, out: &mut [T], convert: F) {
        let stride = self.width();
        let out = &mut out[..stride * self.height()];
        out.fill(convert(self.base_index()));
        for (placement, object, pixels) in self.placed_objects() {
            let width = object.width() as usize;
            let skip_one = object.non_modifying_colour();
            for (row, line) in pixels.chunks_exact(width).enumerate() {
                let start = (placement.y as usize + row) * stride + placement.x as usize;
                for (target, &code) in out[start..start + width].iter_mut().zip(line) {
                    if !(skip_one && code == 1) {
                        *target = convert(code);
                    }
                }
            }
        }
    }
}
