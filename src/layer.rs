//! Layered set values: what was added and what was removed since the base.

use roaring::RoaringTreemap;

/// The value stored under each key: two disjoint sets of member ids.
///
/// `additions` holds ids present in this layer, `deletions` holds ids
/// tombstoned relative to older, already flushed segments. An id is never in
/// both at once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BitmapLayer {
    additions: RoaringTreemap,
    deletions: RoaringTreemap,
}

impl BitmapLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layer from raw id lists.
    ///
    /// An id listed in both ends up only in `deletions`, same as applying the
    /// lists to an empty layer.
    pub fn from_lists(additions: &[u64], deletions: &[u64]) -> Self {
        let mut layer = Self::new();
        layer.apply(additions, deletions);
        layer
    }

    #[inline]
    pub fn additions(&self) -> &RoaringTreemap {
        &self.additions
    }

    #[inline]
    pub fn deletions(&self) -> &RoaringTreemap {
        &self.deletions
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    /// Layer `newer` on top of `self`, as if its additions and deletions had
    /// been inserted here after everything `self` already holds.
    pub fn merge(&mut self, newer: &BitmapLayer) {
        self.apply(newer.additions.iter(), newer.deletions.iter());
    }

    /// Reconcile a batch of new additions and deletions into this layer.
    ///
    /// Additions go first and clear any stale tombstone. Deletions go second
    /// and win over an addition of the same id from the same batch. A deletion
    /// is recorded even if the id was never added here: it may target a
    /// segment that was flushed earlier.
    pub(crate) fn apply<A, D>(&mut self, additions: A, deletions: D)
    where
        A: IntoIterator,
        A::Item: std::borrow::Borrow<u64>,
        D: IntoIterator,
        D::Item: std::borrow::Borrow<u64>,
    {
        use std::borrow::Borrow;

        for id in additions {
            let id = *id.borrow();
            self.deletions.remove(id);
            self.additions.insert(id);
        }

        for id in deletions {
            let id = *id.borrow();
            self.additions.remove(id);
            self.deletions.insert(id);
        }

        debug_assert!(self.additions.is_disjoint(&self.deletions));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(set: &RoaringTreemap) -> Vec<u64> {
        set.iter().collect()
    }

    #[test]
    fn test_from_lists() {
        let layer = BitmapLayer::from_lists(&[3, 1, 2, 1], &[7]);
        assert_eq!(ids(layer.additions()), vec![1, 2, 3]);
        assert_eq!(ids(layer.deletions()), vec![7]);
    }

    #[test]
    fn test_from_lists_deletion_wins() {
        let layer = BitmapLayer::from_lists(&[1, 2], &[2]);
        assert_eq!(ids(layer.additions()), vec![1]);
        assert_eq!(ids(layer.deletions()), vec![2]);
    }

    #[test]
    fn test_apply_readd_clears_tombstone() {
        let mut layer = BitmapLayer::from_lists(&[1], &[2]);
        layer.apply(&[2u64], &[] as &[u64]);
        assert_eq!(ids(layer.additions()), vec![1, 2]);
        assert!(layer.deletions().is_empty());
    }

    #[test]
    fn test_apply_delete_unknown_is_kept() {
        // Tombstone for an id that lives in an older segment.
        let mut layer = BitmapLayer::from_lists(&[1], &[]);
        layer.apply(&[] as &[u64], &[99u64]);
        assert_eq!(ids(layer.additions()), vec![1]);
        assert_eq!(ids(layer.deletions()), vec![99]);
    }

    #[test]
    fn test_merge_newer_on_top() {
        let mut base = BitmapLayer::from_lists(&[1, 2, 3], &[10]);
        let newer = BitmapLayer::from_lists(&[10, 4], &[2]);
        base.merge(&newer);
        assert_eq!(ids(base.additions()), vec![1, 3, 4, 10]);
        assert_eq!(ids(base.deletions()), vec![2]);
    }

    #[test]
    fn test_is_empty() {
        assert!(BitmapLayer::new().is_empty());
        assert!(!BitmapLayer::from_lists(&[], &[1]).is_empty());
    }
}
