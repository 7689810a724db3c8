//! Composition state machine tying parsed segments to pooled entities.

use super::{
    display::{DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH},
    pts_elapsed, BitmapSink, Clut, ClutDefinition, ComposedPage, Display, DisplayDefinition,
    Error, ErrorDetails, FixedArray, Object, ObjectCodingMethod, ObjectData, ObjectState, Page,
    PageComposition, PageLifecycle, PageState, PesPacket, PixelArena, PixelDepth, Pool,
    PoolKind, Presenter, Region, RegionComposition, Result, Segment, SegmentData, Segments,
    SizedArray, SliceReader, MAX_CLUTS, MAX_OBJECTS, MAX_PAGES, MAX_REGIONS,
    MAX_REPORTED_ERRORS, PTS_TICKS_PER_SECOND,
};
use log::{debug, info, trace, warn};

const MAX_REMOVED_PAGES: usize = 16;

/// Edition of ETSI EN 300 743 a stream follows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Specification {
    /// v1.2.1; display definition segments do not exist and are ignored.
    V121,
    /// v1.3.1 and later.
    V131,
}

/// Construction-time settings of a [`Decoder`].
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub specification: Specification,
    /// Bytes of pixel memory shared by all decoded objects.
    pub pixel_memory: usize,
    /// Display size used until a display definition arrives.
    pub default_display_width: u16,
    pub default_display_height: u16,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            specification: Specification::V131,
            pixel_memory: 1920 * 1080,
            default_display_width: DEFAULT_DISPLAY_WIDTH,
            default_display_height: DEFAULT_DISPLAY_HEIGHT,
        }
    }
}

/// Page ids a viewer selected: the composition page and the ancillary page shared between
/// services.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pub composition_page_id: u16,
    pub ancillary_page_id: u16,
}

impl PageSelection {
    pub fn contains(&self, page_id: u16) -> bool {
        page_id == self.composition_page_id || page_id == self.ancillary_page_id
    }
}

/// Outcome of processing one packet.
#[derive(Debug, Default)]
pub struct PacketReport {
    pub pts: Option<u64>,
    /// Segments handed to a parser.
    pub segments: usize,
    /// Segments of pages outside the selection.
    pub skipped: usize,
    pub errors: SizedArray<Error, MAX_REPORTED_ERRORS>,
    /// Errors that did not fit in `errors`.
    pub dropped_errors: usize,
}

impl PacketReport {
    fn record(&mut self, error: Error) {
        if self.errors.push(error).is_err() {
            self.dropped_errors += 1;
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len() + self.dropped_errors
    }
}

/// Slots in use per pool.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PoolUsage {
    pub pages: usize,
    pub regions: usize,
    pub cluts: usize,
    pub objects: usize,
    pub displays: usize,
    pub pixel_bytes: usize,
}

/// Extent an object is decoded to, taken from the regions placing it.
#[derive(Debug, Copy, Clone)]
struct ObjectGeometry {
    depth: PixelDepth,
    width: u16,
    max_height: u16,
}

/// DVB subtitle decoder.
///
/// Owns every page, region, CLUT, object and display definition in fixed pools. Packets are
/// processed to completion; pages whose data is complete become [`PageLifecycle::Displayable`]
/// and can be read through [`Decoder::composed_page`] or pushed to a [`Presenter`] with
/// [`Decoder::draw`].
pub struct Decoder {
    config: DecoderConfig,
    selection: Option<PageSelection>,
    muted: bool,
    pages: Pool<Page, MAX_PAGES>,
    regions: Pool<Region, MAX_REGIONS>,
    cluts: Pool<Clut, MAX_CLUTS>,
    objects: Pool<Object, MAX_OBJECTS>,
    displays: Pool<Display, MAX_PAGES>,
    arena: PixelArena,
    /// Shown pages torn down since the last draw.
    removed_pages: SizedArray<u16, MAX_REMOVED_PAGES>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        let arena = PixelArena::new(config.pixel_memory);
        Self {
            config,
            selection: None,
            muted: false,
            pages: Pool::new(),
            regions: Pool::new(),
            cluts: Pool::new(),
            objects: Pool::new(),
            displays: Pool::new(),
            arena,
            removed_pages: SizedArray::new(),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Processes a complete private_stream_1 PES packet.
    pub fn process_pes_packet(&mut self, packet: &[u8]) -> PacketReport {
        let mut report = PacketReport::default();
        let data = PesPacket::parse(packet).and_then(|pes| {
            report.pts = pes.pts;
            pes.subtitle_data()
        });
        match data {
            Ok(reader) => self.process_segments(report.pts, reader, &mut report),
            Err(error) => {
                warn!("Dropping PES packet: {}", error);
                report.record(error);
            }
        }
        report
    }

    /// Processes segments placed back to back, as found after the PES data field prefix.
    pub fn process_payload(&mut self, pts: Option<u64>, payload: &[u8]) -> PacketReport {
        let mut report = PacketReport {
            pts,
            ..PacketReport::default()
        };
        self.process_segments(pts, SliceReader::new(payload), &mut report);
        report
    }

    fn process_segments(&mut self, pts: Option<u64>, reader: SliceReader, report: &mut PacketReport) {
        for segment in Segments::new(reader) {
            let segment = match segment {
                Ok(segment) => segment,
                Err(error) => {
                    warn!("Abandoning rest of packet: {}", error);
                    report.record(error);
                    break;
                }
            };
            if !self.is_selected(segment.page_id()) {
                trace!(
                    "Skipping segment {:#04x} of unselected page {}",
                    segment.segment_type(),
                    segment.page_id()
                );
                report.skipped += 1;
                continue;
            }

            report.segments += 1;
            let result = segment
                .parse_data()
                .and_then(|data| self.apply_segment(&segment, pts, data));
            if let Err(error) = result {
                warn!(
                    "Segment {:#04x} of page {}: {}",
                    segment.segment_type(),
                    segment.page_id(),
                    error
                );
                report.record(error);
            }
        }
        self.update_acquiring_pages();
    }

    fn is_selected(&self, page_id: u16) -> bool {
        self.selection
            .map_or(true, |selection| selection.contains(page_id))
    }

    /// The other page of the selection, whose CLUTs and objects `page_id` shares.
    fn related_page(&self, page_id: u16) -> Option<u16> {
        let selection = self.selection?;
        if selection.composition_page_id == selection.ancillary_page_id {
            None
        } else if page_id == selection.composition_page_id {
            Some(selection.ancillary_page_id)
        } else if page_id == selection.ancillary_page_id {
            Some(selection.composition_page_id)
        } else {
            None
        }
    }

    fn shares_page(&self, page_id: u16, other: u16) -> bool {
        other == page_id || self.related_page(page_id) == Some(other)
    }

    fn apply_segment(
        &mut self,
        segment: &Segment,
        pts: Option<u64>,
        data: SegmentData,
    ) -> Result<()> {
        match data {
            SegmentData::PageComposition(composition) => {
                self.apply_page_composition(segment, pts, composition)
            }
            SegmentData::RegionComposition(composition) => {
                self.apply_region_composition(segment, composition)
            }
            SegmentData::ClutDefinition(definition) => {
                self.apply_clut_definition(segment, &definition)
            }
            SegmentData::ObjectData(data) => self.apply_object_data(segment, &data),
            SegmentData::DisplayDefinition(definition) => {
                self.apply_display_definition(segment, &definition)
            }
            SegmentData::EndOfDisplaySet(_) => {
                self.update_page(segment.page_id());
                Ok(())
            }
            SegmentData::Unknown(segment_type) => {
                trace!("Skipping segment type {:#04x}", segment_type);
                Ok(())
            }
        }
    }

    fn apply_page_composition(
        &mut self,
        segment: &Segment,
        pts: Option<u64>,
        composition: PageComposition,
    ) -> Result<()> {
        let page_id = segment.page_id();
        if composition.state == PageState::EpochReset {
            debug!("Epoch reset of page {}", page_id);
            self.release_page(page_id);
            if composition.regions.is_empty() {
                return Ok(());
            }
        }

        let index = match self.pages.find(|page| page.id() == page_id) {
            Some(index) => index,
            None => self
                .pages
                .claim(Page::new(page_id))
                .map_err(|_| segment.make_error(ErrorDetails::PoolExhausted(PoolKind::Page)))?,
        };
        if let Some(page) = self.pages.get_mut(index) {
            if page.is_repeat(&composition) {
                trace!(
                    "Page {} version {} already applied",
                    page_id,
                    composition.version
                );
                return Ok(());
            }
            debug!(
                "Page {} version {} ({:?}) with {} regions",
                page_id,
                composition.version,
                composition.state,
                composition.regions.len()
            );
            page.apply(composition, pts);
        }
        Ok(())
    }

    fn apply_region_composition(
        &mut self,
        segment: &Segment,
        composition: RegionComposition,
    ) -> Result<()> {
        let page_id = segment.page_id();
        let (region_id, version) = (composition.id, composition.version);
        match self
            .regions
            .find(|region| region.page_id() == page_id && region.id() == region_id)
        {
            Some(index) => {
                if let Some(region) = self.regions.get_mut(index) {
                    if !region.update(composition) {
                        trace!("Region {} version {} already applied", region_id, version);
                    }
                }
            }
            None => {
                self.regions
                    .claim(Region::new(page_id, composition))
                    .map_err(|_| {
                        segment.make_error(ErrorDetails::PoolExhausted(PoolKind::Region))
                    })?;
            }
        }
        Ok(())
    }

    fn apply_clut_definition(
        &mut self,
        segment: &Segment,
        definition: &ClutDefinition,
    ) -> Result<()> {
        let page_id = segment.page_id();
        match self
            .cluts
            .find(|clut| clut.page_id() == page_id && clut.id() == definition.id)
        {
            Some(index) => {
                if let Some(clut) = self.cluts.get_mut(index) {
                    if !clut.apply(definition)? {
                        trace!(
                            "CLUT {} version {} already applied",
                            definition.id,
                            definition.version
                        );
                    }
                }
            }
            None => {
                if self.cluts.is_full() {
                    return Err(segment.make_error(ErrorDetails::PoolExhausted(PoolKind::Clut)));
                }
                let mut clut = Clut::new(page_id, definition.id);
                clut.apply(definition)?;
                self.cluts
                    .claim(clut)
                    .map_err(|_| segment.make_error(ErrorDetails::PoolExhausted(PoolKind::Clut)))?;
            }
        }
        Ok(())
    }

    fn apply_display_definition(
        &mut self,
        segment: &Segment,
        definition: &DisplayDefinition,
    ) -> Result<()> {
        if self.config.specification == Specification::V121 {
            trace!("Ignoring display definition");
            return Ok(());
        }
        let page_id = segment.page_id();
        match self.displays.find(|display| display.page_id() == page_id) {
            Some(index) => {
                if let Some(display) = self.displays.get_mut(index) {
                    display.apply(definition);
                }
            }
            None => {
                let mut display = Display::new(
                    page_id,
                    self.config.default_display_width,
                    self.config.default_display_height,
                );
                display.apply(definition);
                self.displays.claim(display).map_err(|_| {
                    segment.make_error(ErrorDetails::PoolExhausted(PoolKind::Display))
                })?;
            }
        }
        Ok(())
    }

    /// Derives the decode extent of an object from every stream bitmap placement of it.
    ///
    /// Width and height are bounded by the tightest placement; all placing regions must share
    /// one depth. Objects of the ancillary page are placed by regions of the composition page.
    fn object_geometry(&self, segment: &Segment, object_id: u16) -> Result<Option<ObjectGeometry>> {
        let page_id = segment.page_id();
        let mut geometry: Option<ObjectGeometry> = None;
        for (_, region) in self.regions.iter() {
            if !self.shares_page(page_id, region.page_id()) {
                continue;
            }
            for placement in region.objects() {
                if placement.object_id != object_id || !placement.is_stream_bitmap() {
                    continue;
                }
                let width = region.width() - placement.x;
                let max_height = region.height() - placement.y;
                geometry = match geometry {
                    None => Some(ObjectGeometry {
                        depth: region.depth(),
                        width,
                        max_height,
                    }),
                    Some(geometry) if geometry.depth == region.depth() => Some(ObjectGeometry {
                        depth: geometry.depth,
                        width: geometry.width.min(width),
                        max_height: geometry.max_height.min(max_height),
                    }),
                    Some(_) => {
                        return Err(segment.make_error(ErrorDetails::ObjectOutsideRegion {
                            object_id,
                            x: placement.x,
                            y: placement.y,
                        }))
                    }
                };
            }
        }
        Ok(geometry)
    }

    fn apply_object_data(&mut self, segment: &Segment, data: &ObjectData) -> Result<()> {
        let page_id = segment.page_id();
        if data.coding_method != ObjectCodingMethod::Pixels {
            info!(
                "Skipping character coded object {} of page {}",
                data.id, page_id
            );
            return Ok(());
        }

        let existing = self
            .objects
            .find(|object| object.page_id() == page_id && object.id() == data.id);
        if let Some(object) = existing.and_then(|index| self.objects.get(index)) {
            if object.is_complete() && object.version() == data.version {
                trace!("Object {} version {} already decoded", data.id, data.version);
                return Ok(());
            }
        }

        let geometry = match self.object_geometry(segment, data.id)? {
            Some(geometry) => geometry,
            None => {
                info!(
                    "Object {} of page {} is not placed in any region; skipping",
                    data.id, page_id
                );
                return Ok(());
            }
        };

        // Space for the new bitmap is reserved before the object is touched, so a full arena
        // leaves the pool and any previous bitmap as they were.
        let width = geometry.width as usize;
        let span = self
            .arena
            .allocate(width * geometry.max_height as usize)
            .ok_or_else(|| segment.make_error(ErrorDetails::PoolExhausted(PoolKind::PixelMemory)))?;

        let index = match existing {
            Some(index) => index,
            None => match self
                .objects
                .claim(Object::new(page_id, data.id, data.version, geometry.depth))
            {
                Ok(index) => index,
                Err(_) => {
                    self.arena.release(span);
                    return Err(segment.make_error(ErrorDetails::PoolExhausted(PoolKind::Object)));
                }
            },
        };
        let previous = self
            .objects
            .get_mut(index)
            .and_then(|object| object.restart(data, geometry.depth));
        if let Some(previous) = previous {
            self.arena.release(previous);
        }

        let result = {
            let mut sink = BitmapSink::new(
                self.arena.pixels_mut(span),
                width,
                geometry.max_height as usize,
                geometry.depth,
            );
            data.decode_pixels(&mut sink)
        };

        match result {
            Ok(0) => {
                self.arena.release(span);
                info!(
                    "Object {} of page {} carried no pixel lines; left pending",
                    data.id, page_id
                );
                Ok(())
            }
            Ok(height) => {
                let span = self.arena.shrink(span, width * height);
                if let Some(object) = self.objects.get_mut(index) {
                    object.complete(span, geometry.width, height as u16);
                }
                trace!(
                    "Object {} of page {} decoded at {}x{}",
                    data.id,
                    page_id,
                    width,
                    height
                );
                Ok(())
            }
            Err(error) => {
                self.arena.release(span);
                let state = match error.details() {
                    ErrorDetails::Underrun(_) => ObjectState::Pending,
                    _ => ObjectState::Failed,
                };
                if let Some(object) = self.objects.get_mut(index) {
                    object.fail(state);
                }
                Err(error)
            }
        }
    }

    fn update_acquiring_pages(&mut self) {
        let mut acquiring = SizedArray::<u16, MAX_PAGES>::new();
        for (_, page) in self.pages.iter() {
            if page.lifecycle() == PageLifecycle::Acquiring {
                let _ = acquiring.push(page.id());
            }
        }
        for &page_id in acquiring.iter() {
            self.update_page(page_id);
        }
    }

    /// Moves an acquiring page to displayable once everything it references is decoded.
    fn update_page(&mut self, page_id: u16) {
        let ready = match self.page(page_id) {
            Some(page) if page.lifecycle() == PageLifecycle::Acquiring => self.is_page_ready(page),
            _ => return,
        };
        if !ready {
            return;
        }
        if let Some(index) = self.pages.find(|page| page.id() == page_id) {
            if let Some(page) = self.pages.get_mut(index) {
                page.set_lifecycle(PageLifecycle::Displayable);
                debug!("Page {} displayable", page_id);
            }
        }
    }

    fn is_page_ready(&self, page: &Page) -> bool {
        page.regions()
            .iter()
            .all(|placement| self.is_region_ready(page.id(), placement.region_id))
    }

    fn is_region_ready(&self, page_id: u16, region_id: u8) -> bool {
        let region = match self.region(page_id, region_id) {
            Some(region) => region,
            None => return false,
        };
        if self.clut(page_id, region.clut_id()).is_none() {
            return false;
        }
        region
            .objects()
            .iter()
            .filter(|placement| placement.is_stream_bitmap())
            .all(|placement| {
                self.object(page_id, placement.object_id)
                    .map_or(false, |object| {
                        object.is_complete()
                            && object.depth() == region.depth()
                            && region.fits(placement, object.width(), object.height())
                    })
            })
    }

    /// Releases every entity of a page, and the shared entities of its ancillary page.
    fn release_page(&mut self, page_id: u16) {
        let related = self.related_page(page_id);
        let owned = move |owner: u16| owner == page_id || Some(owner) == related;
        if let Some(index) = self.pages.find(|page| page.id() == page_id) {
            if let Some(page) = self.pages.release(index) {
                if page.lifecycle() == PageLifecycle::Displayed {
                    self.note_removed(page_id);
                }
            }
        }
        self.regions
            .release_where(|region| region.page_id() == page_id, drop);
        self.cluts.release_where(|clut| owned(clut.page_id()), drop);
        self.displays
            .release_where(|display| display.page_id() == page_id, drop);
        let arena = &mut self.arena;
        self.objects.release_where(
            |object| owned(object.page_id()),
            |mut object| {
                if let Some(span) = object.take_pixels() {
                    arena.release(span);
                }
            },
        );
    }

    fn note_removed(&mut self, page_id: u16) {
        if self.removed_pages.iter().any(|&id| id == page_id) {
            return;
        }
        if self.removed_pages.push(page_id).is_err() {
            warn!("Too many removed pages pending; page {} not cleared", page_id);
        }
    }

    /// Tears down displayable and displayed pages whose timeout has elapsed at `now` (90 kHz
    /// PTS). Returns the number of pages removed.
    pub fn expire_pages(&mut self, now: u64) -> usize {
        let mut expired = SizedArray::<u16, MAX_PAGES>::new();
        for (_, page) in self.pages.iter() {
            let shown = matches!(
                page.lifecycle(),
                PageLifecycle::Displayable | PageLifecycle::Displayed
            );
            let timeout = page.timeout() as u64 * PTS_TICKS_PER_SECOND;
            let elapsed = page.pts().and_then(|pts| pts_elapsed(pts, now));
            if shown && elapsed.map_or(false, |elapsed| elapsed >= timeout) {
                let _ = expired.push(page.id());
            }
        }
        for &page_id in expired.iter() {
            info!("Page {} timed out", page_id);
            self.release_page(page_id);
        }
        expired.len()
    }

    /// Discards all decoder state.
    pub fn reset(&mut self) {
        let mut shown = SizedArray::<u16, MAX_PAGES>::new();
        for (_, page) in self.pages.iter() {
            if page.lifecycle() == PageLifecycle::Displayed {
                let _ = shown.push(page.id());
            }
        }
        for &page_id in shown.iter() {
            self.note_removed(page_id);
        }
        self.pages.clear();
        self.regions.clear();
        self.cluts.clear();
        self.objects.clear();
        self.displays.clear();
        self.arena.clear();
        debug!("Decoder reset");
    }

    /// Discards the state of one page.
    pub fn reset_page(&mut self, page_id: u16) {
        self.release_page(page_id);
    }

    /// Restricts decoding to the selected pages, or to all pages with `None`. Resets the
    /// decoder.
    pub fn set_page_selection(&mut self, selection: Option<PageSelection>) {
        self.reset();
        self.selection = selection;
    }

    pub fn page_selection(&self) -> Option<PageSelection> {
        self.selection
    }

    /// While muted, decoding continues but [`Decoder::draw`] presents nothing. Shown pages are
    /// cleared on mute and presented again on unmute.
    pub fn set_muted(&mut self, muted: bool) {
        if muted == self.muted {
            return;
        }
        self.muted = muted;
        if muted {
            let mut shown = SizedArray::<u16, MAX_PAGES>::new();
            for (_, page) in self.pages.iter() {
                if page.lifecycle() == PageLifecycle::Displayed {
                    let _ = shown.push(page.id());
                }
            }
            for &page_id in shown.iter() {
                self.note_removed(page_id);
            }
            self.invalidate();
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Marks displayed pages displayable again so the next draw presents them anew.
    pub fn invalidate(&mut self) {
        for (_, page) in self.pages.iter_mut() {
            if page.lifecycle() == PageLifecycle::Displayed {
                page.set_lifecycle(PageLifecycle::Displayable);
            }
        }
    }

    /// Clears removed pages and presents every displayable page, marking it displayed.
    /// Returns the number of pages presented.
    pub fn draw<P: Presenter>(&mut self, presenter: &mut P) -> usize {
        for &page_id in self.removed_pages.iter() {
            presenter.clear(page_id);
        }
        self.removed_pages.clear();
        if self.muted {
            return 0;
        }

        let mut ready = SizedArray::<u16, MAX_PAGES>::new();
        for (_, page) in self.pages.iter() {
            if page.lifecycle() == PageLifecycle::Displayable {
                let _ = ready.push(page.id());
            }
        }
        for &page_id in ready.iter() {
            if let Some(page) = self.composed_page(page_id) {
                presenter.present(&page);
            }
            self.acknowledge(page_id);
        }
        ready.len()
    }

    /// The composed view of a displayable or displayed page.
    pub fn composed_page(&self, page_id: u16) -> Option<ComposedPage<'_>> {
        let page = self.page(page_id)?;
        match page.lifecycle() {
            PageLifecycle::Displayable | PageLifecycle::Displayed => {
                Some(ComposedPage::new(self, page, self.display(page_id)))
            }
            _ => None,
        }
    }

    /// Records that a displayable page has been shown.
    pub fn acknowledge(&mut self, page_id: u16) -> bool {
        if let Some(index) = self.pages.find(|page| page.id() == page_id) {
            if let Some(page) = self.pages.get_mut(index) {
                if page.lifecycle() == PageLifecycle::Displayable {
                    page.set_lifecycle(PageLifecycle::Displayed);
                    return true;
                }
            }
        }
        false
    }

    pub fn page_lifecycle(&self, page_id: u16) -> PageLifecycle {
        self.page(page_id)
            .map_or(PageLifecycle::Idle, Page::lifecycle)
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().map(|(_, page)| page)
    }

    pub fn page(&self, page_id: u16) -> Option<&Page> {
        self.pages.find_value(|page| page.id() == page_id)
    }

    pub fn region(&self, page_id: u16, region_id: u8) -> Option<&Region> {
        self.regions
            .find_value(|region| region.page_id() == page_id && region.id() == region_id)
    }

    /// CLUT `clut_id` of a page, falling back to the ancillary page.
    pub fn clut(&self, page_id: u16, clut_id: u8) -> Option<&Clut> {
        let find = |owner: u16| {
            self.cluts
                .find_value(|clut| clut.page_id() == owner && clut.id() == clut_id)
        };
        find(page_id).or_else(|| self.related_page(page_id).and_then(find))
    }

    /// Object `object_id` of a page, falling back to the ancillary page.
    pub fn object(&self, page_id: u16, object_id: u16) -> Option<&Object> {
        let find = |owner: u16| {
            self.objects
                .find_value(|object| object.page_id() == owner && object.id() == object_id)
        };
        find(page_id).or_else(|| self.related_page(page_id).and_then(find))
    }

    /// Decoded CLUT indices of an object, row by row; empty unless the object is complete.
    pub fn object_pixels(&self, object: &Object) -> &[u8] {
        match object.pixels() {
            Some(span) if object.is_complete() => self.arena.pixels(span),
            _ => &[],
        }
    }

    /// Display geometry of a page, falling back to the configured default.
    pub fn display(&self, page_id: u16) -> Display {
        self.displays
            .find_value(|display| display.page_id() == page_id)
            .copied()
            .unwrap_or_else(|| {
                Display::new(
                    page_id,
                    self.config.default_display_width,
                    self.config.default_display_height,
                )
            })
    }

    pub fn pool_usage(&self) -> PoolUsage {
        PoolUsage {
            pages: self.pages.len(),
            regions: self.regions.len(),
            cluts: self.cluts.len(),
            objects: self.objects.len(),
            displays: self.displays.len(),
            pixel_bytes: self.arena.used(),
        }
    }
}
