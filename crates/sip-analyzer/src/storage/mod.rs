//! The process-wide call registry, its listener hook and the
//! immutable snapshot readers consume (§3, §4.8, §5).

mod listener;
mod snapshot;
#[allow(clippy::module_inception)]
mod storage;

pub use listener::StorageListener;
pub use snapshot::{SnapshotData, SnapshotView};
pub use storage::{Storage, StorageCaptureOpts, StorageStats, SortOpts, MESSAGE_OVERHEAD_BYTES};
