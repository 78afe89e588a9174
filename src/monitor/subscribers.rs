//! Snapshot subscriber registry.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::stats::SessionStats;

/// Callback invoked with every published snapshot.
pub type StatsCallback = Arc<dyn Fn(&SessionStats) + Send + Sync>;

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, StatsCallback)>,
}

/// Thread-safe list of callbacks.
///
/// Callbacks are cloned out of the lock before they run, so a callback may
/// itself subscribe or unsubscribe.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    inner: Mutex<Registry>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    pub(crate) fn subscribe(&self, callback: StatsCallback) -> SubscriptionId {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.callbacks.push((id, callback));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.callbacks.len();
        inner.callbacks.retain(|(existing, _)| *existing != id);
        inner.callbacks.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .len()
    }

    /// Invoke every callback with `stats`. A panicking callback is logged
    /// and does not affect the others.
    pub(crate) fn notify(&self, stats: &SessionStats) {
        let callbacks: Vec<(SubscriptionId, StatsCallback)> = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .clone();

        for (id, callback) in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(stats))).is_err() {
                tracing::warn!(subscription = ?id, "Snapshot subscriber panicked");
            }
        }
    }
}
