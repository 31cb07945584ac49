//! # roaringset
//!
//! The in-memory write buffer of a roaring-set LSM bucket: a red-black tree
//! mapping byte-string keys to a [`BitmapLayer`] of additions and deletions.
//!
//! Each key names a set (a posting list, a filter bucket, ...). Inserts
//! accumulate against that set until the buffer is flushed, at which point
//! [`BinarySearchTree::flatten_in_order`] hands the keys to a segment writer in
//! ascending byte order.
//!
//! ## Example
//!
//! ```rust
//! use roaringset::BinarySearchTree;
//!
//! let mut tree = BinarySearchTree::new();
//! tree.insert(b"color:red", &[1, 2, 3], &[]);
//! tree.insert(b"color:red", &[], &[2]);
//!
//! let layer = tree.get(b"color:red").unwrap();
//! assert!(layer.additions().contains(1));
//! assert!(layer.deletions().contains(2));
//! assert!(tree.get(b"color:blue").is_err());
//! ```
//!
//! The tree has no internal locking. Mutation needs `&mut self`, so sharing it
//! across threads means wrapping it in a lock.

#![deny(unsafe_code)]

mod error;
mod layer;
pub mod rbtree;
mod tree;

pub use error::{Error, Result};
pub use layer::BitmapLayer;
pub use tree::{BinarySearchNode, BinarySearchTree, Iter};

// Re-exported so callers can name the set type behind `BitmapLayer`.
pub use roaring::RoaringTreemap;

#[cfg(test)]
mod proptests;
