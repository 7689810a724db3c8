use super::{
    read_bitfield, ErrorDetails, FixedArray, Result, SizedArray, SliceReader, MAX_PAGE_REGIONS,
};
use modular_bitfield_msb::prelude::*;

#[bitfield]
#[derive(Debug)]
struct PageCompositionHeader {
    timeout: B8,
    version: B4,
    state: B2,
    #[skip]
    reserved: B2,
}

#[bitfield]
#[derive(Debug)]
struct PageRegionEntry {
    region_id: B8,
    #[skip]
    reserved: B8,
    horizontal_address: B16,
    vertical_address: B16,
}

/// How a page composition relates to the previous one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Update of the current page.
    Normal = 0,
    /// Complete page, sent periodically so decoders can start mid-stream.
    AcquisitionPoint = 1,
    /// Complete page starting a new epoch.
    ModeChange = 2,
    /// Discard everything of this page and start over.
    EpochReset = 3,
}

impl PageState {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => PageState::Normal,
            1 => PageState::AcquisitionPoint,
            2 => PageState::ModeChange,
            _ => PageState::EpochReset,
        }
    }
}

/// Where a page is in its display cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PageLifecycle {
    /// No page is known.
    Idle,
    /// Composition received; waiting for the data it references.
    Acquiring,
    /// All referenced data present; not yet handed to the presenter.
    Displayable,
    /// Handed to the presenter.
    Displayed,
}

/// Position of a region on the page.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RegionPlacement {
    pub region_id: u8,
    pub x: u16,
    pub y: u16,
}

/// Page composition segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageComposition {
    /// Seconds the page stays visible.
    pub timeout: u8,
    pub version: u8,
    pub state: PageState,
    pub regions: SizedArray<RegionPlacement, MAX_PAGE_REGIONS>,
}

impl PageComposition {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let header = read_bitfield!(reader, PageCompositionHeader);
        let state = PageState::from_bits(header.state());

        let mut regions = SizedArray::new();
        while reader.remaining_len() > 0 {
            let location = reader.location();
            let entry = read_bitfield!(reader, PageRegionEntry);
            let placement = RegionPlacement {
                region_id: entry.region_id(),
                x: entry.horizontal_address(),
                y: entry.vertical_address(),
            };
            if regions.push(placement).is_err() {
                return Err(crate::Error::new(
                    location,
                    ErrorDetails::PageOverflow(regions.capacity()),
                ));
            }
        }

        Ok(Self {
            timeout: header.timeout(),
            version: header.version(),
            state,
            regions,
        })
    }
}

/// A page: an ordered set of placed regions shown for a limited time.
#[derive(Debug, Clone)]
pub struct Page {
    id: u16,
    version: Option<u8>,
    state: PageState,
    timeout: u8,
    pts: Option<u64>,
    lifecycle: PageLifecycle,
    regions: SizedArray<RegionPlacement, MAX_PAGE_REGIONS>,
}

impl Page {
    pub fn new(id: u16) -> Self {
        Self {
            id,
            version: None,
            state: PageState::Normal,
            timeout: 0,
            pts: None,
            lifecycle: PageLifecycle::Idle,
            regions: SizedArray::new(),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn version(&self) -> Option<u8> {
        self.version
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn timeout(&self) -> u8 {
        self.timeout
    }

    pub fn pts(&self) -> Option<u64> {
        self.pts
    }

    pub fn lifecycle(&self) -> PageLifecycle {
        self.lifecycle
    }

    pub fn regions(&self) -> &[RegionPlacement] {
        self.regions.as_slice()
    }

    /// Whether `composition` repeats the page already held.
    pub fn is_repeat(&self, composition: &PageComposition) -> bool {
        self.version == Some(composition.version) && self.lifecycle != PageLifecycle::Acquiring
    }

    /// Takes over a new composition and starts acquiring the data it references.
    pub fn apply(&mut self, composition: PageComposition, pts: Option<u64>) {
        self.version = Some(composition.version);
        self.state = composition.state;
        self.timeout = composition.timeout;
        self.pts = pts;
        self.regions = composition.regions;
        self.lifecycle = PageLifecycle::Acquiring;
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: PageLifecycle) {
        self.lifecycle = lifecycle;
    }
}
