//! A push-notification hook for storage changes, for reader tasks that
//! want to wake on new calls/messages rather than poll `snapshot()`.

use crate::call::Call;

/// Implemented by reader-side consumers (TUI, exporter) that want to be
/// notified synchronously as calls change, in addition to pulling
/// `Storage::snapshot()` on their own schedule.
pub trait StorageListener: Send + Sync {
    /// A new call was created.
    fn on_call_created(&self, call: &Call) {
        let _ = call;
    }

    /// An existing call received a new message or changed state.
    fn on_call_updated(&self, call: &Call) {
        let _ = call;
    }

    /// A call was evicted (hard cap, memory limit, or `clear_soft`).
    fn on_call_removed(&self, call_id: &str) {
        let _ = call_id;
    }
}
