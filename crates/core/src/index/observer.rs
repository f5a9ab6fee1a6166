//! Progress notifications from the index coordinator.

use std::sync::{Arc, PoisonError, RwLock};

use super::coordinator::ScanSummary;

/// Receives indexing progress. All methods default to no-ops.
///
/// Callbacks run on background threads, never on the caller of
/// `scan_all` or `update_file`:
/// - `on_started` and `on_finished` on the dedicated scan thread,
/// - `on_progress` on whichever scan pool thread processed the document,
/// - `on_file_updated` on the update worker (or the caller of
///   `update_file_now`).
///
/// Implementations must return quickly and must not call `update_file`,
/// which can block when the update queue is full.
pub trait IndexObserver: Send + Sync {
    fn on_started(&self) {}

    fn on_progress(&self, _path: &str) {}

    fn on_finished(&self, _summary: &ScanSummary) {}

    fn on_file_updated(&self, _path: &str) {}
}

/// Registered observers, shared by every worker of one coordinator.
#[derive(Default)]
pub(crate) struct Observers {
    inner: RwLock<Vec<Arc<dyn IndexObserver>>>,
}

impl Observers {
    pub(crate) fn subscribe(&self, observer: Arc<dyn IndexObserver>) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).push(observer);
    }

    /// Callbacks run on a snapshot of the list, so an observer may
    /// subscribe others without deadlocking.
    pub(crate) fn notify(&self, f: impl Fn(&dyn IndexObserver)) {
        let observers = self.inner.read().unwrap_or_else(PoisonError::into_inner).clone();
        for observer in &observers {
            f(observer.as_ref());
        }
    }
}
