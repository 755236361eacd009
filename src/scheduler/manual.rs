//! Deterministic scheduler driven by its owner.
//!
//! Tasks queue up in submission order and only run when the owner calls
//! [`ManualScheduler::run_next`] or [`ManualScheduler::run_all`]. Handles mark
//! queued tasks cancelled so they are skipped. This makes every interleaving
//! between submission, cancellation and execution reproducible in tests.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Rejected, Scheduler, Task, TaskHandle};

struct Queued {
    task: Task,
    cancelled: Arc<AtomicBool>,
}

struct ManualInner {
    queue: Mutex<VecDeque<Queued>>,
    rejecting: AtomicBool,
    submitted: AtomicUsize,
    executed: AtomicUsize,
    cancels: Arc<AtomicUsize>,
}

/// A scheduler whose tasks run only when explicitly driven.
///
/// Clones share the same queue.
#[derive(Clone)]
pub struct ManualScheduler {
    inner: Arc<ManualInner>,
}

impl ManualScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ManualInner {
                queue: Mutex::new(VecDeque::new()),
                rejecting: AtomicBool::new(false),
                submitted: AtomicUsize::new(0),
                executed: AtomicUsize::new(0),
                cancels: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Makes subsequent submissions fail with [`Rejected`] while `on` is set.
    pub fn set_rejecting(&self, on: bool) {
        self.inner.rejecting.store(on, Ordering::Release);
    }

    /// Runs the oldest queued task that has not been cancelled.
    ///
    /// Cancelled tasks in front of it are discarded. Returns false when no
    /// runnable task was queued.
    pub fn run_next(&self) -> bool {
        loop {
            // The lock is released before the task runs, so tasks may submit.
            let next = self.inner.queue.lock().pop_front();
            let Some(queued) = next else {
                return false;
            };
            if queued.cancelled.load(Ordering::Acquire) {
                continue;
            }
            (queued.task)();
            self.inner.executed.fetch_add(1, Ordering::Relaxed);
            return true;
        }
    }

    /// Runs queued tasks, including ones submitted while running, until the
    /// queue is empty. Returns how many tasks ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Returns the number of queued tasks that have not been cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .queue
            .lock()
            .iter()
            .filter(|q| !q.cancelled.load(Ordering::Acquire))
            .count()
    }

    /// Returns how many tasks were accepted.
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.inner.submitted.load(Ordering::Relaxed)
    }

    /// Returns how many tasks ran.
    #[must_use]
    pub fn executed(&self) -> usize {
        self.inner.executed.load(Ordering::Relaxed)
    }

    /// Returns how many task handles were cancelled.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.inner.cancels.load(Ordering::Relaxed)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("queued", &self.inner.queue.lock().len())
            .field("submitted", &self.submitted())
            .field("executed", &self.executed())
            .field("cancelled", &self.cancelled())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn submit(&self, task: Task) -> Result<TaskHandle, Rejected> {
        if self.inner.rejecting.load(Ordering::Acquire) {
            return Err(Rejected::new(task));
        }
        let cancelled = Arc::new(AtomicBool::new(false));
        self.inner.queue.lock().push_back(Queued {
            task,
            cancelled: Arc::clone(&cancelled),
        });
        self.inner.submitted.fetch_add(1, Ordering::Relaxed);
        let cancels = Arc::clone(&self.inner.cancels);
        Ok(TaskHandle::new(move || {
            if !cancelled.swap(true, Ordering::AcqRel) {
                cancels.fetch_add(1, Ordering::Relaxed);
            }
        }))
    }
}
