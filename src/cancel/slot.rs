//! Single-handle cancellation cell.
//!
//! A [`CancelSlot`] receives the stop handle of a task some time after the
//! task was submitted, while a concurrent `cancel` may already have happened.
//! Whatever the arrival order, a stored handle is invoked at most once, and
//! always invoked if the slot is cancelled.
//!
//! ```text
//!            store              cancel
//!   Empty ──────────► Holding ──────────► Cancelled ◄── store: handle invoked
//!     │                  │
//!     │ finish           │ finish
//!     ▼                  ▼
//!   Finished ◄───────────┘                          ◄── store: handle dropped
//! ```
//!
//! `Cancelled` and `Finished` are terminal. `Finished` marks work that
//! completed normally: its handle is dropped, never invoked.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::scheduler::TaskHandle;
use crate::tracing_compat::trace;

const EMPTY: u8 = 0;
/// A handle is being moved into the cell.
const STORING: u8 = 1;
const HOLDING: u8 = 2;
const CANCELLED: u8 = 3;
const FINISHED: u8 = 4;

/// A stop action that can be invoked once.
pub trait Cancellable: Send {
    /// Invokes the stop action.
    fn cancel(self);
}

impl Cancellable for TaskHandle {
    fn cancel(self) {
        Self::cancel(self);
    }
}

/// Observable state of a [`CancelSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No handle stored yet.
    Empty,
    /// A handle is stored.
    Holding,
    /// Cancelled; any handle was or will be invoked.
    Cancelled,
    /// Completed normally; any handle was dropped.
    Finished,
}

/// Race-free cell for a task's stop handle.
pub struct CancelSlot<H = TaskHandle> {
    state: AtomicU8,
    // Ownership of the contents is decided by `state`; the lock is never
    // contended beyond the hand-off itself.
    handle: Mutex<Option<H>>,
}

impl<H: Cancellable> CancelSlot<H> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            handle: parking_lot::const_mutex(None),
        }
    }

    /// Stores `handle`.
    ///
    /// If the slot was already cancelled the handle is invoked immediately;
    /// if it already finished the handle is dropped. A slot that already
    /// holds a handle keeps it and the new one is invoked. Returns true if
    /// the handle was stored.
    pub fn store(&self, handle: H) -> bool {
        match self
            .state
            .compare_exchange(EMPTY, STORING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                *self.handle.lock() = Some(handle);
                match self.state.compare_exchange(
                    STORING,
                    HOLDING,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => true,
                    Err(actual) => {
                        // A cancel or finish landed while storing.
                        let taken = self.handle.lock().take();
                        if let Some(h) = taken {
                            if actual == CANCELLED {
                                trace!("cancel raced ahead of store, invoking handle");
                                h.cancel();
                            }
                        }
                        false
                    }
                }
            }
            Err(FINISHED) => false,
            Err(CANCELLED) => {
                trace!("slot already cancelled, invoking handle");
                handle.cancel();
                false
            }
            Err(_) => {
                trace!("slot already holds a handle, invoking the new one");
                handle.cancel();
                false
            }
        }
    }

    /// Cancels the slot, invoking a stored handle exactly once.
    ///
    /// Idempotent. Has no effect on a finished slot. Returns true if this
    /// call performed the transition.
    pub fn cancel(&self) -> bool {
        let Some(previous) = self.transition(CANCELLED) else {
            return false;
        };
        if previous == HOLDING {
            let taken = self.handle.lock().take();
            if let Some(h) = taken {
                h.cancel();
            }
        }
        true
    }

    /// Marks the guarded work as completed, dropping any stored handle.
    ///
    /// Has no effect on a cancelled slot. Returns true if this call performed
    /// the transition.
    pub fn finish(&self) -> bool {
        let Some(previous) = self.transition(FINISHED) else {
            return false;
        };
        if previous == HOLDING {
            drop(self.handle.lock().take());
        }
        true
    }

    /// Moves to a terminal state, returning the state it replaced.
    fn transition(&self, terminal: u8) -> Option<u8> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == CANCELLED || current == FINISHED {
                return None;
            }
            match self.state.compare_exchange_weak(
                current,
                terminal,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current),
                Err(actual) => current = actual,
            }
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SlotState {
        match self.state.load(Ordering::Acquire) {
            HOLDING => SlotState::Holding,
            CANCELLED => SlotState::Cancelled,
            FINISHED => SlotState::Finished,
            _ => SlotState::Empty,
        }
    }

    /// Returns true once the slot is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    /// Returns true once the slot is cancelled or finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.state.load(Ordering::Acquire), CANCELLED | FINISHED)
    }
}

impl<H: Cancellable> Default for CancelSlot<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Cancellable> fmt::Debug for CancelSlot<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSlot")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn counting_handle(count: &Arc<AtomicUsize>) -> TaskHandle {
        let c = Arc::clone(count);
        TaskHandle::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn store_then_cancel_invokes_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let slot = CancelSlot::new();
        assert!(slot.store(counting_handle(&count)));
        assert_eq!(slot.state(), SlotState::Holding);

        assert!(slot.cancel());
        assert!(!slot.cancel());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(slot.state(), SlotState::Cancelled);
    }

    #[test]
    fn cancel_then_store_invokes_on_arrival() {
        let count = Arc::new(AtomicUsize::new(0));
        let slot = CancelSlot::new();
        assert!(slot.cancel());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(!slot.store(counting_handle(&count)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(slot.is_cancelled());
    }

    #[test]
    fn second_store_does_not_overwrite() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let slot = CancelSlot::new();
        assert!(slot.store(counting_handle(&first)));
        assert!(!slot.store(counting_handle(&second)));
        assert_eq!(second.load(Ordering::SeqCst), 1);

        slot.cancel();
        assert_eq!(first.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn finish_drops_handle_without_invoking() {
        let count = Arc::new(AtomicUsize::new(0));
        let slot = CancelSlot::new();
        slot.store(counting_handle(&count));
        assert!(slot.finish());
        assert!(!slot.cancel());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(slot.state(), SlotState::Finished);
    }

    #[test]
    fn store_after_finish_is_dropped() {
        let count = Arc::new(AtomicUsize::new(0));
        let slot = CancelSlot::new();
        assert!(slot.finish());
        assert!(!slot.store(counting_handle(&count)));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(slot.is_terminal());
    }

    #[test]
    fn cancel_and_finish_are_exclusive() {
        let slot: CancelSlot = CancelSlot::new();
        assert!(slot.cancel());
        assert!(!slot.finish());
        assert_eq!(slot.state(), SlotState::Cancelled);
    }

    #[test]
    fn concurrent_store_and_cancel_invoke_exactly_once() {
        for _ in 0..200 {
            let count = Arc::new(AtomicUsize::new(0));
            let slot = Arc::new(CancelSlot::new());
            let barrier = Arc::new(Barrier::new(2));

            let s = Arc::clone(&slot);
            let b = Arc::clone(&barrier);
            let handle = counting_handle(&count);
            let storer = thread::spawn(move || {
                b.wait();
                s.store(handle);
            });

            barrier.wait();
            slot.cancel();
            storer.join().unwrap();

            assert_eq!(count.load(Ordering::SeqCst), 1);
        }
    }
}
