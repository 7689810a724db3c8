use crate::{FixedArray, SizedArray, MAX_OBJECTS};
use log::trace;

/// Byte range of the pixel arena owned by one object.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ArenaSpan {
    offset: usize,
    len: usize,
}

impl ArenaSpan {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Pixel storage allocated once at construction and carved into spans with first-fit
/// placement.
pub struct PixelArena {
    storage: Box<[u8]>,
    /// Live spans ordered by offset.
    spans: SizedArray<ArenaSpan, MAX_OBJECTS>,
}

impl PixelArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0; capacity].into_boxed_slice(),
            spans: SizedArray::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes held by live spans.
    pub fn used(&self) -> usize {
        self.spans.iter().map(ArenaSpan::len).sum()
    }

    /// Claims `len` zeroed bytes, or `None` when no gap is large enough.
    pub fn allocate(&mut self, len: usize) -> Option<ArenaSpan> {
        let mut cursor = 0;
        let mut position = self.spans.len();
        for (index, span) in self.spans.iter().enumerate() {
            if span.offset - cursor >= len {
                position = index;
                break;
            }
            cursor = span.end();
        }
        if position == self.spans.len() && self.capacity() - cursor < len {
            trace!("No arena gap for {} bytes", len);
            return None;
        }

        let span = ArenaSpan {
            offset: cursor,
            len,
        };
        self.spans.insert(position, span).ok()?;
        self.storage[span.offset..span.end()].fill(0);
        Some(span)
    }

    pub fn release(&mut self, span: ArenaSpan) -> bool {
        match self.spans.iter().position(|live| *live == span) {
            Some(index) => {
                self.spans.remove(index);
                true
            }
            None => false,
        }
    }

    /// Shortens a live span to `len` bytes, returning the freed tail to the arena.
    pub fn shrink(&mut self, span: ArenaSpan, len: usize) -> ArenaSpan {
        match self.spans.iter().position(|live| *live == span) {
            Some(index) if len <= span.len => {
                let shrunk = ArenaSpan {
                    offset: span.offset,
                    len,
                };
                self.spans.as_mut_slice()[index] = shrunk;
                shrunk
            }
            _ => span,
        }
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }

    pub fn pixels(&self, span: ArenaSpan) -> &[u8] {
        &self.storage[span.offset..span.end()]
    }

    pub fn pixels_mut(&mut self, span: ArenaSpan) -> &mut [u8] {
        &mut self.storage[span.offset..span.end()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit_reuses_gaps() {
        let mut arena = PixelArena::new(100);
        let a = arena.allocate(40).unwrap();
        let b = arena.allocate(40).unwrap();
        assert!(arena.allocate(40).is_none());
        assert!(arena.release(a));
        let c = arena.allocate(30).unwrap();
        assert_eq!(c.offset, 0);
        let d = arena.allocate(10).unwrap();
        assert_eq!(d.offset, 30);
        assert_eq!(arena.used(), 80);
        assert!(arena.release(b));
        assert!(!arena.release(b));
    }

    #[test]
    fn shrink_frees_tail() {
        let mut arena = PixelArena::new(64);
        let a = arena.allocate(64).unwrap();
        arena.pixels_mut(a)[0] = 7;
        let a = arena.shrink(a, 16);
        assert_eq!(arena.pixels(a).len(), 16);
        assert_eq!(arena.pixels(a)[0], 7);
        let b = arena.allocate(48).unwrap();
        assert_eq!(b.offset, 16);
    }

    #[test]
    fn allocation_is_zeroed() {
        let mut arena = PixelArena::new(8);
        let a = arena.allocate(8).unwrap();
        arena.pixels_mut(a).fill(0xFF);
        arena.release(a);
        let b = arena.allocate(4).unwrap();
        assert!(arena.pixels(b).iter().all(|&p| p == 0));
    }
}
