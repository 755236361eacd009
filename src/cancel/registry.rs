//! One-shot disposable set of outstanding tasks.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Cancellable, CancelSlot};
use crate::tracing_compat::trace;

/// Something with a stop action run when its registry is disposed.
pub trait Dispose: Send + Sync {
    /// Runs the stop action.
    fn dispose(&self);
}

impl<H: Cancellable> Dispose for CancelSlot<H> {
    fn dispose(&self) {
        self.cancel();
    }
}

/// Key of an entry in a [`TaskRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey(u64);

/// Mutex-guarded set of pending entries, disposed exactly once.
///
/// After [`dispose`](Self::dispose) no entry is accepted: an entry offered
/// later is disposed on the spot. Stop actions always run outside the lock,
/// so they may touch the registry themselves.
pub struct TaskRegistry<E: Dispose> {
    /// `None` once disposed.
    entries: Mutex<Option<HashMap<EntryKey, Arc<E>>>>,
    next_key: AtomicU64,
}

impl<E: Dispose> TaskRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Some(HashMap::new())),
            next_key: AtomicU64::new(0),
        }
    }

    /// Registers `entry`.
    ///
    /// Returns `None`, after disposing the entry, if the registry is
    /// already disposed.
    pub fn insert(&self, entry: Arc<E>) -> Option<EntryKey> {
        let key = EntryKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        {
            let mut guard = self.entries.lock();
            if let Some(entries) = guard.as_mut() {
                entries.insert(key, entry);
                return Some(key);
            }
        }
        trace!("registry disposed, stopping new entry");
        entry.dispose();
        None
    }

    /// Removes the entry under `key`, if still registered.
    pub fn remove(&self, key: EntryKey) -> Option<Arc<E>> {
        self.entries
            .lock()
            .as_mut()
            .and_then(|entries| entries.remove(&key))
    }

    /// Disposes the registry, running every registered entry's stop action
    /// once. Later calls do nothing. Returns the number of entries stopped.
    pub fn dispose(&self) -> usize {
        let detached = self.entries.lock().take();
        let Some(entries) = detached else {
            return 0;
        };
        let count = entries.len();
        trace!(entries = count, "disposing registry");
        for entry in entries.into_values() {
            entry.dispose();
        }
        count
    }

    /// Returns true once disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.entries.lock().is_none()
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().as_ref().map_or(0, HashMap::len)
    }

    /// Returns true if no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Dispose> Default for TaskRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Dispose> fmt::Debug for TaskRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::SlotState;
    use crate::scheduler::TaskHandle;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[derive(Default)]
    struct Counting {
        disposed: AtomicUsize,
    }

    impl Dispose for Counting {
        fn dispose(&self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dispose_runs_each_entry_once() {
        let registry = TaskRegistry::new();
        let entries: Vec<_> = (0..5).map(|_| Arc::new(Counting::default())).collect();
        for e in &entries {
            registry.insert(Arc::clone(e)).unwrap();
        }
        assert_eq!(registry.len(), 5);

        assert_eq!(registry.dispose(), 5);
        assert_eq!(registry.dispose(), 0);
        assert!(registry.is_disposed());
        assert!(registry.is_empty());
        for e in &entries {
            assert_eq!(e.disposed.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn removed_entries_are_not_disposed() {
        let registry = TaskRegistry::new();
        let kept = Arc::new(Counting::default());
        let removed = Arc::new(Counting::default());
        registry.insert(Arc::clone(&kept)).unwrap();
        let key = registry.insert(Arc::clone(&removed)).unwrap();

        assert!(registry.remove(key).is_some());
        assert!(registry.remove(key).is_none());
        registry.dispose();
        assert_eq!(kept.disposed.load(Ordering::SeqCst), 1);
        assert_eq!(removed.disposed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn insert_after_dispose_stops_inline() {
        let registry = TaskRegistry::new();
        registry.dispose();
        let late = Arc::new(Counting::default());
        assert!(registry.insert(Arc::clone(&late)).is_none());
        assert_eq!(late.disposed.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn finished_slots_survive_disposal() {
        let registry = TaskRegistry::new();
        let stops = Arc::new(AtomicUsize::new(0));
        let slots: Vec<Arc<CancelSlot>> = (0..4).map(|_| Arc::new(CancelSlot::new())).collect();
        for slot in &slots {
            let s = Arc::clone(&stops);
            slot.store(TaskHandle::new(move || {
                s.fetch_add(1, Ordering::SeqCst);
            }));
            registry.insert(Arc::clone(slot)).unwrap();
        }
        slots[0].finish();
        slots[1].finish();

        registry.dispose();
        assert_eq!(stops.load(Ordering::SeqCst), 2);
        assert_eq!(slots[0].state(), SlotState::Finished);
        assert_eq!(slots[3].state(), SlotState::Cancelled);
    }

    #[test]
    fn concurrent_insert_and_dispose_stop_everything_once() {
        for _ in 0..50 {
            let registry = Arc::new(TaskRegistry::new());
            let entries: Vec<_> = (0..32).map(|_| Arc::new(Counting::default())).collect();

            let r = Arc::clone(&registry);
            let to_insert = entries.clone();
            let inserter = thread::spawn(move || {
                for e in to_insert {
                    r.insert(e);
                }
            });
            registry.dispose();
            inserter.join().unwrap();

            for e in &entries {
                assert_eq!(e.disposed.load(Ordering::SeqCst), 1);
            }
        }
    }
}
