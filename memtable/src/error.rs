//! Error types for memtable operations.

use thiserror::Error;

use crate::segment::SegmentError;

/// Result type alias using [`MemtableError`].
pub type Result<T> = std::result::Result<T, MemtableError>;

#[derive(Debug, Error)]
pub enum MemtableError {
    /// The key is in neither the active nor the frozen tree.
    #[error(transparent)]
    NotFound(#[from] roaringset::Error),

    /// The segment writer refused the flush. The frozen tree is kept.
    #[error("segment write failed: {0}")]
    Segment(#[from] SegmentError),
}

impl MemtableError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MemtableError::NotFound(roaringset::Error::NotFound))
    }
}
