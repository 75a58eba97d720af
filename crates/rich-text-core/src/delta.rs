//! Text change events.
//!
//! The host reports each edit as a [`TextChange`] so typed-input styling can tell insertions,
//! deletions, typed line breaks and the end-of-buffer marker apart without diffing.

use crate::text::{END_OF_BUFFER_MARKER, NEWLINE, to_utf16};

/// A single text edit expressed in UTF-16 offsets of the document *after* the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    /// Offset where the edit happened.
    pub start: usize,
    /// Number of code units removed at `start`.
    pub deleted_len: usize,
    /// Inserted code units (may be empty).
    pub inserted: Vec<u16>,
}

impl TextChange {
    /// Insertion of `text` at `start`.
    pub fn insertion(start: usize, text: &str) -> Self {
        Self {
            start,
            deleted_len: 0,
            inserted: to_utf16(text),
        }
    }

    /// Deletion of `len` code units at `start`.
    pub fn deletion(start: usize, len: usize) -> Self {
        Self {
            start,
            deleted_len: len,
            inserted: Vec::new(),
        }
    }

    /// Start of the inserted span.
    pub fn input_start(&self) -> usize {
        self.start
    }

    /// End of the inserted span (equal to `input_start` for a pure deletion).
    pub fn input_end(&self) -> usize {
        self.start + self.inserted.len()
    }

    /// Nothing was inserted.
    pub fn is_deletion(&self) -> bool {
        self.inserted.is_empty() && self.deleted_len > 0
    }

    /// A single line break was typed.
    pub fn is_newline(&self) -> bool {
        self.inserted.as_slice() == [NEWLINE]
    }

    /// Only the end-of-buffer marker was inserted.
    pub fn is_end_of_buffer_marker(&self) -> bool {
        self.inserted.as_slice() == [END_OF_BUFFER_MARKER]
    }
}
