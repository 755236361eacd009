//! Schedulers: where submitted work runs.
//!
//! The operator consumes a scheduler only through [`Scheduler::submit`]:
//! hand over a [`Task`], get back a [`TaskHandle`] that best-effort stops the
//! task. A scheduler may run the task on a worker thread, synchronously on the
//! submitting thread, or refuse it with [`Rejected`], which returns the task
//! to the caller.
//!
//! # Provided schedulers
//!
//! - [`Immediate`]: runs every task inline on the submitting thread
//! - [`FnScheduler`]: adapts a closure `Fn(Task) -> TaskHandle`
//! - [`ManualScheduler`]: queues tasks until the owner runs them (tests)
//! - [`WorkerPool`]: thread pool with lazy scaling and soft cancellation

mod env_config;
mod manual;
mod pool;

use std::fmt;
use std::sync::Arc;

use crate::tracing_compat::warn;

pub use env_config::{
    apply_env_overrides, ENV_POOL_IDLE_TIMEOUT_MS, ENV_POOL_MAX_THREADS, ENV_POOL_MIN_THREADS,
    ENV_POOL_THREAD_NAME_PREFIX,
};
pub use manual::ManualScheduler;
pub use pool::{WorkerPool, WorkerPoolOptions};

/// A unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Best-effort stop action for a submitted task.
///
/// Cancelling consumes the handle, so a handle can be invoked at most once.
/// Cancelling after the task already ran is a no-op.
pub struct TaskHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TaskHandle {
    /// Creates a handle that runs `f` when cancelled.
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(f)),
        }
    }

    /// Creates a handle whose cancellation does nothing.
    #[must_use]
    pub const fn noop() -> Self {
        Self { cancel: None }
    }

    /// Returns true if cancelling this handle has no effect.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.cancel.is_none()
    }

    /// Stops the task if it can still be stopped.
    pub fn cancel(mut self) {
        if let Some(f) = self.cancel.take() {
            f();
        }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("noop", &self.is_noop())
            .finish()
    }
}

/// Returned when a scheduler refuses a task. Carries the task back.
#[derive(thiserror::Error)]
#[error("scheduler rejected the task")]
pub struct Rejected {
    task: Task,
}

impl Rejected {
    /// Wraps a refused task.
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self { task }
    }

    /// Returns the task that was not accepted.
    #[must_use]
    pub fn into_task(self) -> Task {
        self.task
    }
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected").finish_non_exhaustive()
    }
}

/// Something that runs tasks.
pub trait Scheduler: Send + Sync {
    /// Submits `task` for execution.
    fn submit(&self, task: Task) -> Result<TaskHandle, Rejected>;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn submit(&self, task: Task) -> Result<TaskHandle, Rejected> {
        (**self).submit(task)
    }
}

/// Submits `task`, running it inline if the scheduler refuses it.
///
/// A refused task is never dropped: a dropped connect task would leave the
/// consumer waiting forever. The returned handle is a no-op when the task
/// ran inline.
pub fn submit_or_run(scheduler: &dyn Scheduler, task: Task) -> TaskHandle {
    match scheduler.submit(task) {
        Ok(handle) => handle,
        Err(rejected) => {
            warn!(error = %rejected, "scheduler rejected task, running inline");
            (rejected.into_task())();
            TaskHandle::noop()
        }
    }
}

/// Runs every task synchronously on the submitting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn submit(&self, task: Task) -> Result<TaskHandle, Rejected> {
        task();
        Ok(TaskHandle::noop())
    }
}

/// Adapts a closure into a [`Scheduler`].
///
/// ```
/// use subscribe_on::scheduler::{FnScheduler, Scheduler, TaskHandle};
///
/// let scheduler = FnScheduler::new(|task| {
///     std::thread::spawn(task);
///     TaskHandle::noop()
/// });
/// let _ = scheduler.submit(Box::new(|| {}));
/// ```
pub struct FnScheduler<F> {
    f: F,
}

impl<F> FnScheduler<F>
where
    F: Fn(Task) -> TaskHandle + Send + Sync,
{
    /// Wraps `f`.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Scheduler for FnScheduler<F>
where
    F: Fn(Task) -> TaskHandle + Send + Sync,
{
    fn submit(&self, task: Task) -> Result<TaskHandle, Rejected> {
        Ok((self.f)(task))
    }
}

impl<F> fmt::Debug for FnScheduler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnScheduler").finish_non_exhaustive()
    }
}
