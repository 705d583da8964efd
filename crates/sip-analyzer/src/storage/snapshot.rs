//! A cheap, immutable, versioned view of the call set (§4.8, §5).
//!
//! `Storage::snapshot()` returns an `Arc<SnapshotData>`: a reader clones
//! the `Arc` under a short lock and then reads it without holding any
//! lock at all, matching spec.md §5's requirement that a snapshot be
//! "safe to hold while ingest continues".

use std::sync::Arc;

use crate::call::Call;
use crate::storage::storage::StorageStats;

#[derive(Debug, Clone)]
pub struct SnapshotData {
    pub calls: Vec<Call>,
    pub stats: StorageStats,
    pub version: u64,
}

pub type SnapshotView = Arc<SnapshotData>;

impl SnapshotData {
    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.calls.iter()
    }
}
