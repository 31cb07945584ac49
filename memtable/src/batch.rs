//! Bulk ingestion: many per-key updates applied under one lock acquisition.
//!
//! Upstream adapters decode external bulk requests into [`BatchItem`]s. Items
//! that already failed upstream keep their error and are never inserted.

use tracing::debug;

use crate::Memtable;

/// One key's worth of additions and deletions from a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchItem {
    pub key: Vec<u8>,
    pub additions: Vec<u64>,
    pub deletions: Vec<u64>,
    /// Set by the adapter when the upstream record could not be decoded.
    pub error: Option<String>,
}

impl BatchItem {
    pub fn new(key: impl Into<Vec<u8>>, additions: Vec<u64>, deletions: Vec<u64>) -> Self {
        Self {
            key: key.into(),
            additions,
            deletions,
            error: None,
        }
    }

    pub fn failed(key: impl Into<Vec<u8>>, error: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// What [`Memtable::apply_batch`] did with a batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub applied: usize,
    /// Positions of items skipped because they carried an upstream error.
    pub skipped: Vec<usize>,
}

impl Memtable {
    /// Insert every healthy item in order, holding the write lock once.
    pub fn apply_batch(&self, items: &[BatchItem]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut active = self.active.write();

        for (pos, item) in items.iter().enumerate() {
            if let Some(err) = &item.error {
                debug!(pos, error = %err, "skipping failed batch item");
                outcome.skipped.push(pos);
                continue;
            }
            active.insert(&item.key, &item.additions, &item.deletions);
            outcome.applied += 1;
        }

        outcome
    }
}
