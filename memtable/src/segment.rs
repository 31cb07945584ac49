//! Flush targets for a frozen memtable.
//!
//! A [`SegmentWriter`] receives every key of a frozen tree exactly once, in
//! strictly ascending byte order, together with its final [`BitmapLayer`].
//! On-disk formats live outside this crate; [`MemorySegmentWriter`] is the
//! in-memory reference implementation, keyed by an FST.

use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use roaringset::BitmapLayer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    /// FST construction failed, e.g. keys out of order.
    #[error("FST error: {0}")]
    Fst(#[from] fst::Error),

    /// Writer-specific refusal.
    #[error("{0}")]
    Rejected(String),
}

/// Sink for the sorted contents of a frozen memtable.
pub trait SegmentWriter {
    type Output;

    /// Append one key. Keys arrive strictly ascending.
    fn write(&mut self, key: &[u8], layer: &BitmapLayer) -> Result<(), SegmentError>;

    /// Seal the segment after the last key.
    fn finish(self) -> Result<Self::Output, SegmentError>;
}

/// Builds a [`MemorySegment`].
pub struct MemorySegmentWriter {
    index: MapBuilder<Vec<u8>>,
    layers: Vec<BitmapLayer>,
}

impl MemorySegmentWriter {
    pub fn new() -> Self {
        Self {
            index: MapBuilder::memory(),
            layers: Vec::new(),
        }
    }
}

impl Default for MemorySegmentWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentWriter for MemorySegmentWriter {
    type Output = MemorySegment;

    fn write(&mut self, key: &[u8], layer: &BitmapLayer) -> Result<(), SegmentError> {
        self.index.insert(key, self.layers.len() as u64)?;
        self.layers.push(layer.clone());
        Ok(())
    }

    fn finish(self) -> Result<MemorySegment, SegmentError> {
        let bytes = self.index.into_inner()?;
        let index = Map::new(bytes)?;
        Ok(MemorySegment {
            index,
            layers: self.layers,
        })
    }
}

/// Immutable, sorted result of a flush.
///
/// The FST maps each key to the position of its layer in `layers`.
pub struct MemorySegment {
    index: Map<Vec<u8>>,
    layers: Vec<BitmapLayer>,
}

impl MemorySegment {
    pub fn get(&self, key: &[u8]) -> Option<&BitmapLayer> {
        let pos = self.index.get(key)?;
        self.layers.get(pos as usize)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Bytes used by the key index.
    pub fn index_bytes(&self) -> usize {
        self.index.as_fst().as_bytes().len()
    }

    /// All entries in key order.
    pub fn entries(&self) -> Vec<(Vec<u8>, &BitmapLayer)> {
        let mut out = Vec::with_capacity(self.layers.len());
        let mut stream = self.index.stream();
        while let Some((key, pos)) = stream.next() {
            out.push((key.to_vec(), &self.layers[pos as usize]));
        }
        out
    }

    /// Entries with `start <= key < end`.
    pub fn range(&self, start: &[u8], end: &[u8]) -> Vec<(Vec<u8>, &BitmapLayer)> {
        let mut out = Vec::new();
        let mut stream = self.index.range().ge(start).lt(end).into_stream();
        while let Some((key, pos)) = stream.next() {
            out.push((key.to_vec(), &self.layers[pos as usize]));
        }
        out
    }
}

impl std::fmt::Debug for MemorySegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySegment")
            .field("len", &self.len())
            .field("index_bytes", &self.index_bytes())
            .finish()
    }
}
