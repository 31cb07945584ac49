//! # roaringset-memtable
//!
//! A thread-safe memtable for roaring-set buckets, built on
//! [`roaringset::BinarySearchTree`].
//!
//! ## Locking
//!
//! The tree itself is single-writer. This crate supplies the discipline:
//!
//! 1. **Active tree** behind a reader-writer lock. Inserts take the write
//!    lock, lookups take the read lock.
//! 2. **Frozen tree** parked behind its own lock while a flush is serialising
//!    it. Freezing swaps the active tree for an empty one, so writers are
//!    only held out for the swap, not for the whole flush.
//!
//! Locks are always taken active first, then frozen. Flushes are serialised by
//! a separate mutex.
//!
//! ## Example
//!
//! ```rust
//! use roaringset_memtable::{Memtable, MemorySegmentWriter};
//!
//! let mt = Memtable::new();
//! mt.insert(b"tag:rust", &[1, 2, 3], &[]);
//! mt.insert(b"tag:rust", &[], &[2]);
//!
//! let segment = mt.flush(MemorySegmentWriter::new()).unwrap().unwrap();
//! let layer = segment.get(b"tag:rust").unwrap();
//! assert!(layer.deletions().contains(2));
//! assert!(mt.is_empty());
//! ```

#![deny(unsafe_code)]

mod batch;
mod error;
pub mod segment;

pub use batch::{BatchItem, BatchOutcome};
pub use error::{MemtableError, Result};
pub use roaringset::{BinarySearchTree, BitmapLayer};
pub use segment::{MemorySegment, MemorySegmentWriter, SegmentError, SegmentWriter};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Configuration for a [`Memtable`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Arena capacity hint for each fresh active tree.
    pub initial_capacity: usize,
    /// Distinct-key count at which [`Memtable::should_flush`] turns true.
    pub flush_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            flush_threshold: 100_000,
        }
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Distinct keys in the active tree.
    pub keys: usize,
    /// Total added ids across active keys.
    pub additions: u64,
    /// Total tombstoned ids across active keys.
    pub deletions: u64,
    /// Keys in the frozen tree awaiting flush.
    pub frozen_keys: usize,
}

/// Lock-guarded write buffer of layered roaring sets.
pub struct Memtable {
    active: RwLock<BinarySearchTree>,
    frozen: RwLock<Option<Arc<BinarySearchTree>>>,
    flush_lock: Mutex<()>,
    config: Config,
}

impl Memtable {
    /// Create an empty memtable with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty memtable with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            active: RwLock::new(BinarySearchTree::with_capacity(config.initial_capacity)),
            frozen: RwLock::new(None),
            flush_lock: Mutex::new(()),
            config,
        }
    }

    /// The configuration this memtable was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record additions and deletions for `key` in the active tree.
    pub fn insert(&self, key: impl AsRef<[u8]>, additions: &[u64], deletions: &[u64]) {
        self.active
            .write()
            .insert(key.as_ref(), additions, deletions);
    }

    /// Current layer for `key`, combining a pending frozen tree with the
    /// active one.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<BitmapLayer> {
        let key = key.as_ref();
        let active = self.active.read();
        let frozen = self.frozen.read();

        let newer = active.get(key);
        match frozen.as_deref().map(|tree| tree.get(key)) {
            Some(Ok(base)) => {
                let mut layer = base.clone();
                if let Ok(newer) = newer {
                    layer.merge(newer);
                }
                Ok(layer)
            }
            _ => Ok(newer?.clone()),
        }
    }

    /// Number of distinct keys in the active tree.
    pub fn len(&self) -> usize {
        self.active.read().len()
    }

    /// True if the active tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.active.read().is_empty()
    }

    /// True once the active tree reached [`Config::flush_threshold`] keys.
    pub fn should_flush(&self) -> bool {
        self.len() >= self.config.flush_threshold
    }

    /// Gather counters for the active and frozen trees.
    pub fn stats(&self) -> Stats {
        let active = self.active.read();
        let frozen = self.frozen.read();

        let mut stats = Stats {
            keys: active.len(),
            frozen_keys: frozen.as_ref().map_or(0, |tree| tree.len()),
            ..Stats::default()
        };
        for node in active.iter() {
            stats.additions += node.value().additions().len();
            stats.deletions += node.value().deletions().len();
        }
        stats
    }

    /// Move the active tree aside for flushing and start a fresh one.
    ///
    /// If an earlier flush failed, its frozen tree is still pending and is
    /// returned instead; the active tree is left alone. Returns `None` when
    /// there is nothing to flush.
    pub fn freeze(&self) -> Option<Arc<BinarySearchTree>> {
        let mut active = self.active.write();
        let mut frozen = self.frozen.write();

        if let Some(pending) = frozen.as_ref() {
            return Some(Arc::clone(pending));
        }
        if active.is_empty() {
            return None;
        }

        let fresh = BinarySearchTree::with_capacity(self.config.initial_capacity);
        let tree = Arc::new(std::mem::replace(&mut *active, fresh));
        *frozen = Some(Arc::clone(&tree));
        debug!(keys = tree.len(), "memtable frozen");
        Some(tree)
    }

    /// Freeze and write the frozen tree to `writer` in key order.
    ///
    /// Inserts keep going into the new active tree meanwhile. On success the
    /// frozen tree is dropped; on failure it stays readable and the next call
    /// retries it. Returns `Ok(None)` if there was nothing to flush.
    pub fn flush<W: SegmentWriter>(&self, mut writer: W) -> Result<Option<W::Output>> {
        let _flushing = self.flush_lock.lock();

        let Some(tree) = self.freeze() else {
            return Ok(None);
        };

        let written = tree
            .flatten_in_order()
            .into_iter()
            .try_for_each(|node| writer.write(node.key(), node.value()))
            .and_then(|()| writer.finish());
        let output = match written {
            Ok(output) => output,
            Err(err) => {
                warn!(keys = tree.len(), error = %err, "segment write failed, keeping frozen tree");
                return Err(err.into());
            }
        };

        let mut frozen = self.frozen.write();
        if frozen.as_ref().is_some_and(|f| Arc::ptr_eq(f, &tree)) {
            *frozen = None;
        }
        info!(keys = tree.len(), "memtable flushed");
        Ok(Some(output))
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}
