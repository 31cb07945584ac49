//! Error types for the roaring-set memtable.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`BinarySearchTree`](crate::BinarySearchTree) lookups.
///
/// Insertion and in-order flattening are total and never fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("key not found")]
    NotFound,
}
