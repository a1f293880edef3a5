//! Byte ranges into the unit's source text.

use swc_common::Span;

/// Half-open byte range `[start, end)` relative to the start of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Convert an SWC span, whose positions are offset by `base`.
    pub fn of(span: Span, base: u32) -> Self {
        Self {
            start: span.lo.0.saturating_sub(base),
            end: span.hi.0.saturating_sub(base),
        }
    }

    pub fn empty_at(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    /// Whether `other` lies within this range (bounds inclusive).
    pub fn contains(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_offset(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn as_usize(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}
