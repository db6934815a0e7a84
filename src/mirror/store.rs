use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::Snapshot;

/// Single slot holding the current [`Snapshot`].
///
/// Readers get an owned `Arc` and never block the writer; a publish swaps the
/// pointer, so a reader sees either the old or the new snapshot in full. Old
/// snapshots are dropped once the last in-flight reader lets go. The publish
/// version is stamped into the snapshot itself so one load yields both.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    next_version: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            next_version: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, snapshot: Snapshot) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::AcqRel) + 1;
        self.current.store(Arc::new(snapshot.with_version(version)));
        version
    }

    /// Latest published snapshot, or the empty sentinel before the first publish.
    pub fn read(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Number of publishes so far; 0 means nothing has been published.
    pub fn version(&self) -> u64 {
        self.current.load().version()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
