//! Linear UTF-16 storage layer.
//!
//! Offsets are UTF-16 code units so surrogate pairs stay visible to the escaper, which
//! has to combine them into a single numeric character reference.

use crate::text::{from_utf16_lossy, to_utf16};

/// UTF-16 code-unit storage with offset-range editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utf16Storage {
    units: Vec<u16>,
}

impl Utf16Storage {
    /// Create storage holding `text`.
    pub fn new(text: &str) -> Self {
        Self {
            units: to_utf16(text),
        }
    }

    /// Create storage from raw code units (lone surrogates are kept as-is).
    pub fn from_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    /// Length in code units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All code units.
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Code unit at `offset`.
    pub fn unit_at(&self, offset: usize) -> Option<u16> {
        self.units.get(offset).copied()
    }

    /// Insert code units at `offset`. The caller validates `offset <= len`.
    pub fn insert(&mut self, offset: usize, units: &[u16]) {
        if units.is_empty() {
            return;
        }
        self.units.splice(offset..offset, units.iter().copied());
    }

    /// Delete `[start, end)`. The caller validates the range.
    pub fn delete(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        self.units.drain(start..end);
    }

    /// Whole text, lossily decoded.
    pub fn get_text(&self) -> String {
        from_utf16_lossy(&self.units)
    }

    /// Text of `[start, end)`, lossily decoded. Out-of-range bounds are clamped.
    pub fn get_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.units.len());
        let start = start.min(end);
        from_utf16_lossy(&self.units[start..end])
    }
}
