//! Error types for buffer and editor mutations.

use thiserror::Error;

use crate::buffer::AnnotationId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by buffer and editor mutations.
///
/// Every variant is recoverable: the rejected call performed no mutation.
pub enum EditError {
    #[error("invalid range {start}..{end} for buffer of length {len}")]
    /// `start > end`, or a bound lies beyond the buffer length.
    InvalidRange {
        /// Requested start offset.
        start: usize,
        /// Requested end offset.
        end: usize,
        /// Buffer length at the time of the call.
        len: usize,
    },

    #[error("annotation {0} is no longer live")]
    /// The id refers to an annotation that was removed.
    StaleAnnotation(AnnotationId),
}

/// Result alias for buffer and editor mutations.
pub type EditResult<T> = Result<T, EditError>;
