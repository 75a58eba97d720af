//! Annotated buffer: text storage plus an arena of annotations over it.
//!
//! Annotations are addressed by [`AnnotationId`] handles (slot index + generation). Removing
//! an annotation bumps the slot generation, so stale handles are detected instead of
//! silently aliasing a newer annotation that reuses the slot.
//!
//! Range lookups go through an [`IntervalIndex`] that mirrors every live annotation's range.
//! Every mutation keeps the arena and the index in lockstep.

use std::fmt;

use crate::annotation::{Annotation, Attributes, KindSet};
use crate::error::{EditError, EditResult};
use crate::intervals::{Interval, IntervalIndex, shift_for_deletion, shift_for_insertion};
use crate::storage::Utf16Storage;
use crate::style::Color;
use crate::text::to_utf16;

/// Stable handle to an annotation in an [`AnnotatedBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnnotationId {
    index: u32,
    generation: u32,
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    annotation: Option<Annotation>,
}

/// Derived visual run. Never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderHint {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Foreground color, if any.
    pub foreground: Option<Color>,
    /// Background color, if any.
    pub background: Option<Color>,
}

/// Text plus the annotations over it.
#[derive(Debug, Clone, Default)]
pub struct AnnotatedBuffer {
    storage: Utf16Storage,
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: IntervalIndex<AnnotationId>,
    next_seq: u64,
    render_hints: Vec<RenderHint>,
    version: u64,
}

impl AnnotatedBuffer {
    /// Create a buffer holding `text` with no annotations.
    pub fn new(text: &str) -> Self {
        Self::from_storage(Utf16Storage::new(text))
    }

    /// Create a buffer over raw UTF-16 code units, as handed over by a host text widget.
    /// Lone surrogates are kept and dropped only when serialized.
    pub fn from_units(units: Vec<u16>) -> Self {
        Self::from_storage(Utf16Storage::from_units(units))
    }

    /// Create a buffer over existing storage.
    pub fn from_storage(storage: Utf16Storage) -> Self {
        Self {
            storage,
            ..Self::default()
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Text length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the text is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Underlying storage.
    pub fn storage(&self) -> &Utf16Storage {
        &self.storage
    }

    /// Text code units.
    pub fn units(&self) -> &[u16] {
        self.storage.units()
    }

    /// Whole text.
    pub fn text(&self) -> String {
        self.storage.get_text()
    }

    /// Text of `[start, end)`, clamped to the buffer.
    pub fn text_range(&self, start: usize, end: usize) -> String {
        self.storage.get_range(start, end)
    }

    /// Code unit at `offset`.
    pub fn unit_at(&self, offset: usize) -> Option<u16> {
        self.storage.unit_at(offset)
    }

    /// Mutation counter, bumped by every successful mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of live annotations.
    pub fn annotation_count(&self) -> usize {
        self.index.len()
    }

    /// Fail with [`EditError::InvalidRange`] unless `start <= end <= len`.
    pub fn validate_range(&self, start: usize, end: usize) -> EditResult<()> {
        if start > end || end > self.len() {
            return Err(EditError::InvalidRange {
                start,
                end,
                len: self.len(),
            });
        }
        Ok(())
    }

    fn slot(&self, id: AnnotationId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.annotation.is_some())
    }

    fn annotation_mut(&mut self, id: AnnotationId) -> EditResult<&mut Annotation> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.annotation.as_mut())
            .ok_or(EditError::StaleAnnotation(id))
    }

    /// Add an annotation.
    pub fn set_annotation(&mut self, annotation: Annotation) -> EditResult<AnnotationId> {
        self.validate_range(annotation.start, annotation.end)?;

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.annotation = None;
                AnnotationId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    annotation: None,
                });
                AnnotationId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(Interval {
            start: annotation.start,
            end: annotation.end,
            seq,
            key: id,
        });
        self.slots[id.index as usize].annotation = Some(annotation);
        self.version += 1;
        Ok(id)
    }

    /// Live annotation for `id`.
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.slot(id).and_then(|slot| slot.annotation.as_ref())
    }

    /// Check if `id` is live.
    pub fn contains_id(&self, id: AnnotationId) -> bool {
        self.slot(id).is_some()
    }

    /// Move an annotation to a new range.
    pub fn set_range(&mut self, id: AnnotationId, start: usize, end: usize) -> EditResult<()> {
        self.validate_range(start, end)?;
        let annotation = self.annotation_mut(id)?;
        annotation.start = start;
        annotation.end = end;
        self.index.set_range(id, start, end);
        self.version += 1;
        Ok(())
    }

    /// Replace an annotation's attributes.
    pub fn set_attributes(&mut self, id: AnnotationId, attributes: Attributes) -> EditResult<()> {
        self.annotation_mut(id)?.attributes = attributes;
        self.version += 1;
        Ok(())
    }

    /// Remove an annotation, invalidating `id`.
    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let annotation = slot.annotation.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.index.remove(id);
        self.version += 1;
        Some(annotation)
    }

    /// Every live annotation in query order.
    pub fn iter(&self) -> impl Iterator<Item = (AnnotationId, &Annotation)> {
        self.index.iter().filter_map(|interval| {
            self.get(interval.key)
                .map(|annotation| (interval.key, annotation))
        })
    }

    /// Annotations of `kinds` intersecting `[start, end]`, in query order.
    ///
    /// See [`Annotation::intersects`] for the boundary rules.
    pub fn query(
        &self,
        start: usize,
        end: usize,
        kinds: impl Into<KindSet>,
    ) -> Vec<(AnnotationId, &Annotation)> {
        let kinds = kinds.into();
        self.index
            .query(start, end)
            .into_iter()
            .filter_map(|interval| {
                let annotation = self.get(interval.key)?;
                kinds
                    .contains(annotation.kind)
                    .then_some((interval.key, annotation))
            })
            .collect()
    }

    /// Ascending, deduplicated offsets strictly inside `(start, end)` where an annotation of
    /// `kinds` starts or ends.
    pub fn transition_points(
        &self,
        start: usize,
        end: usize,
        kinds: impl Into<KindSet>,
    ) -> Vec<usize> {
        if self.index.is_empty() {
            return Vec::new();
        }
        let mut points: Vec<usize> = self
            .query(start, end, kinds)
            .into_iter()
            .flat_map(|(_, annotation)| [annotation.start, annotation.end])
            .filter(|&offset| start < offset && offset < end)
            .collect();
        points.sort_unstable();
        points.dedup();
        points
    }

    /// First transition after `start`, or `limit` when there is none before it.
    pub fn next_transition(&self, start: usize, limit: usize, kinds: impl Into<KindSet>) -> usize {
        self.transition_points(start, limit, kinds)
            .first()
            .copied()
            .unwrap_or(limit)
    }

    /// Insert `text` at `offset`, shifting annotations and render hints.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> EditResult<()> {
        self.insert_units(offset, &to_utf16(text))
    }

    /// Insert raw code units at `offset`.
    pub fn insert_units(&mut self, offset: usize, units: &[u16]) -> EditResult<()> {
        self.validate_range(offset, offset)?;
        if units.is_empty() {
            return Ok(());
        }

        self.storage.insert(offset, units);
        self.index.update_for_insertion(offset, units.len());
        self.sync_ranges_from_index();

        for hint in &mut self.render_hints {
            (hint.start, hint.end) = shift_for_insertion(hint.start, hint.end, offset, units.len());
        }
        self.version += 1;
        Ok(())
    }

    /// Delete `[start, end)`. Annotations that collapse are removed.
    pub fn delete_text(&mut self, start: usize, end: usize) -> EditResult<()> {
        self.validate_range(start, end)?;
        if start == end {
            return Ok(());
        }

        self.storage.delete(start, end);
        for id in self.index.update_for_deletion(start, end) {
            if let Some(slot) = self.slots.get_mut(id.index as usize) {
                slot.annotation = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
        self.sync_ranges_from_index();

        self.render_hints = self
            .render_hints
            .iter()
            .filter_map(|hint| {
                let (s, e) = shift_for_deletion(hint.start, hint.end, start, end)?;
                Some(RenderHint {
                    start: s,
                    end: e,
                    ..*hint
                })
            })
            .collect();
        self.version += 1;
        Ok(())
    }

    /// Replace `[start, end)` with `text`.
    pub fn replace_text(&mut self, start: usize, end: usize, text: &str) -> EditResult<()> {
        self.validate_range(start, end)?;
        self.delete_text(start, end)?;
        self.insert_text(start, text)
    }

    fn sync_ranges_from_index(&mut self) {
        let Self { slots, index, .. } = self;
        for interval in index.iter() {
            if let Some(annotation) = slots
                .get_mut(interval.key.index as usize)
                .and_then(|slot| slot.annotation.as_mut())
            {
                annotation.start = interval.start;
                annotation.end = interval.end;
            }
        }
    }

    /// Current render hints.
    pub fn render_hints(&self) -> &[RenderHint] {
        &self.render_hints
    }

    /// Add a render hint. Empty or out-of-range hints are ignored.
    pub fn add_render_hint(&mut self, hint: RenderHint) {
        if hint.start >= hint.end || hint.end > self.len() {
            return;
        }
        self.render_hints.push(hint);
    }

    /// Remove render hints over `[start, end)`, keeping the parts outside it.
    pub fn clear_render_hints(&mut self, start: usize, end: usize) {
        let mut kept = Vec::with_capacity(self.render_hints.len());
        for hint in self.render_hints.drain(..) {
            if hint.end <= start || hint.start >= end {
                kept.push(hint);
                continue;
            }
            if hint.start < start {
                kept.push(RenderHint { end: start, ..hint });
            }
            if hint.end > end {
                kept.push(RenderHint { start: end, ..hint });
            }
        }
        self.render_hints = kept;
    }
}
