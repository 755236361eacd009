//! Thread-pool scheduler.
//!
//! [`WorkerPool`] runs submitted tasks on a set of OS threads:
//!
//! - **Capacity management**: threads spawn lazily up to `max_threads`;
//!   threads above `min_threads` retire after `idle_timeout` without work
//! - **Cancellation**: soft. A cancelled task that is still queued is skipped
//!   when dequeued; a task that already started runs to completion
//! - **Shutdown**: after [`WorkerPool::shutdown`] new submissions are
//!   rejected, already-queued tasks still run
//!
//! A panicking task is contained to that task; the worker thread survives.

use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle as ThreadJoinHandle};
use std::time::{Duration, Instant};

use super::{env_config, Rejected, Scheduler, Task, TaskHandle};
use crate::error::Result;
use crate::tracing_compat::{debug, error, trace};

/// Default idle timeout before retiring excess threads.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

thread_local! {
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Configuration options for a [`WorkerPool`].
#[derive(Clone)]
pub struct WorkerPoolOptions {
    /// Minimum number of threads kept alive.
    pub min_threads: usize,
    /// Maximum number of threads allowed.
    pub max_threads: usize,
    /// Idle timeout before retiring excess threads.
    pub idle_timeout: Duration,
    /// Thread name prefix.
    pub thread_name_prefix: String,
    /// Callback when a thread starts.
    pub on_thread_start: Option<Arc<dyn Fn() + Send + Sync>>,
    /// Callback when a thread stops.
    pub on_thread_stop: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl Default for WorkerPoolOptions {
    fn default() -> Self {
        Self {
            min_threads: 1,
            max_threads: 4,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            thread_name_prefix: "subscribe-on".to_string(),
            on_thread_start: None,
            on_thread_stop: None,
        }
    }
}

impl WorkerPoolOptions {
    /// Default options with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();
        env_config::apply_env_overrides(&mut options)?;
        Ok(options)
    }
}

impl fmt::Debug for WorkerPoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPoolOptions")
            .field("min_threads", &self.min_threads)
            .field("max_threads", &self.max_threads)
            .field("idle_timeout", &self.idle_timeout)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("on_thread_start", &self.on_thread_start.is_some())
            .field("on_thread_stop", &self.on_thread_stop.is_some())
            .finish()
    }
}

struct PooledTask {
    id: u64,
    work: Task,
    cancelled: Arc<AtomicBool>,
}

struct PoolInner {
    min_threads: usize,
    max_threads: usize,
    /// Threads alive, including ones parked.
    active_threads: AtomicUsize,
    /// Threads currently executing a task.
    busy_threads: AtomicUsize,
    pending_count: AtomicUsize,
    completed_count: AtomicU64,
    next_task_id: AtomicU64,
    queue: SegQueue<PooledTask>,
    shutdown: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
    idle_timeout: Duration,
    thread_name_prefix: String,
    on_thread_start: Option<Arc<dyn Fn() + Send + Sync>>,
    on_thread_stop: Option<Arc<dyn Fn() + Send + Sync>>,
    thread_handles: Mutex<Vec<ThreadJoinHandle<()>>>,
}

/// A thread pool implementing [`Scheduler`].
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("min_threads", &self.inner.min_threads)
            .field("max_threads", &self.inner.max_threads)
            .field("active_threads", &self.active_threads())
            .field("pending_tasks", &self.pending_count())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

impl WorkerPool {
    /// Creates a pool with the given thread limits and default options.
    #[must_use]
    pub fn new(min_threads: usize, max_threads: usize) -> Self {
        Self::with_options(WorkerPoolOptions {
            min_threads,
            max_threads,
            ..WorkerPoolOptions::default()
        })
    }

    /// Creates a pool from options.
    ///
    /// `max_threads` is raised to at least `max(min_threads, 1)`.
    #[must_use]
    pub fn with_options(options: WorkerPoolOptions) -> Self {
        let max_threads = options.max_threads.max(options.min_threads).max(1);
        let inner = Arc::new(PoolInner {
            min_threads: options.min_threads,
            max_threads,
            active_threads: AtomicUsize::new(0),
            busy_threads: AtomicUsize::new(0),
            pending_count: AtomicUsize::new(0),
            completed_count: AtomicU64::new(0),
            next_task_id: AtomicU64::new(1),
            queue: SegQueue::new(),
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
            idle_timeout: options.idle_timeout,
            thread_name_prefix: options.thread_name_prefix,
            on_thread_start: options.on_thread_start,
            on_thread_stop: options.on_thread_stop,
            thread_handles: Mutex::new(Vec::with_capacity(max_threads)),
        });

        for _ in 0..inner.min_threads {
            spawn_thread_on_inner(&inner);
        }

        Self { inner }
    }

    /// Creates a pool from default options with environment overrides.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_options(WorkerPoolOptions::from_env()?))
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count.load(Ordering::Relaxed)
    }

    /// Returns the number of live worker threads.
    #[must_use]
    pub fn active_threads(&self) -> usize {
        self.inner.active_threads.load(Ordering::Relaxed)
    }

    /// Returns the number of threads currently executing a task.
    #[must_use]
    pub fn busy_threads(&self) -> usize {
        self.inner.busy_threads.load(Ordering::Relaxed)
    }

    /// Returns the number of tasks that ran to completion or panicked.
    #[must_use]
    pub fn completed_count(&self) -> u64 {
        self.inner.completed_count.load(Ordering::Relaxed)
    }

    /// Returns true once the pool is shut down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Stops accepting tasks. Queued tasks still run.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.notify_all();
    }

    /// Shuts down and waits up to `timeout` for all threads to exit.
    ///
    /// Returns false if the timeout elapsed first.
    pub fn shutdown_and_wait(&self, timeout: Duration) -> bool {
        self.shutdown();
        let deadline = Instant::now() + timeout;

        while self.inner.active_threads.load(Ordering::Acquire) > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            self.notify_all();
            thread::sleep(Duration::from_millis(5).min(remaining));
        }

        let handles: Vec<_> = self.inner.thread_handles.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
        true
    }

    fn notify_all(&self) {
        let _guard = self.inner.mutex.lock();
        self.inner.condvar.notify_all();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // A worker cannot wait for itself to exit.
        if ON_WORKER.with(Cell::get) {
            self.shutdown();
            return;
        }
        let _ = self.shutdown_and_wait(Duration::from_secs(5));
    }
}

impl Scheduler for WorkerPool {
    fn submit(&self, task: Task) -> std::result::Result<TaskHandle, Rejected> {
        let inner = &self.inner;
        if inner.shutdown.load(Ordering::Acquire) {
            return Err(Rejected::new(task));
        }
        if inner.active_threads.load(Ordering::Acquire) == 0 && !spawn_thread_on_inner(inner) {
            return Err(Rejected::new(task));
        }

        let id = inner.next_task_id.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new(AtomicBool::new(false));
        inner.queue.push(PooledTask {
            id,
            work: task,
            cancelled: Arc::clone(&cancelled),
        });
        inner.pending_count.fetch_add(1, Ordering::Relaxed);
        trace!(task_id = id, "task queued");

        maybe_spawn_thread_on_inner(inner);
        {
            let _guard = inner.mutex.lock();
            inner.condvar.notify_one();
        }

        Ok(TaskHandle::new(move || {
            cancelled.store(true, Ordering::Release);
        }))
    }
}

/// Spawns a worker thread. Returns false if the OS refused.
fn spawn_thread_on_inner(inner: &Arc<PoolInner>) -> bool {
    let inner_clone = Arc::clone(inner);
    let thread_id = inner.active_threads.fetch_add(1, Ordering::AcqRel);
    let name = format!("{}-worker-{}", inner.thread_name_prefix, thread_id);

    let spawned = thread::Builder::new().name(name).spawn(move || {
        ON_WORKER.with(|flag| flag.set(true));
        if let Some(ref callback) = inner_clone.on_thread_start {
            callback();
        }

        worker_loop(&inner_clone);

        if let Some(ref callback) = inner_clone.on_thread_stop {
            callback();
        }

        inner_clone.active_threads.fetch_sub(1, Ordering::AcqRel);
    });

    match spawned {
        Ok(handle) => {
            let mut handles = inner.thread_handles.lock();
            // Retired workers leave finished handles behind.
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
            true
        }
        Err(e) => {
            inner.active_threads.fetch_sub(1, Ordering::AcqRel);
            error!(error = %e, "failed to spawn worker thread");
            false
        }
    }
}

/// Spawns another thread when every live thread is busy and work is waiting.
fn maybe_spawn_thread_on_inner(inner: &Arc<PoolInner>) {
    let active = inner.active_threads.load(Ordering::Relaxed);
    let busy = inner.busy_threads.load(Ordering::Relaxed);
    let pending = inner.pending_count.load(Ordering::Relaxed);

    if active < inner.max_threads && busy >= active && pending > 0 {
        spawn_thread_on_inner(inner);
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        if let Some(task) = inner.queue.pop() {
            inner.pending_count.fetch_sub(1, Ordering::Relaxed);

            if task.cancelled.load(Ordering::Acquire) {
                trace!(task_id = task.id, "skipping cancelled task");
                continue;
            }

            inner.busy_threads.fetch_add(1, Ordering::Relaxed);
            if catch_unwind(AssertUnwindSafe(task.work)).is_err() {
                error!(task_id = task.id, "task panicked");
            }
            inner.busy_threads.fetch_sub(1, Ordering::Relaxed);
            inner.completed_count.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        if inner.shutdown.load(Ordering::Acquire) {
            break;
        }

        let mut guard = inner.mutex.lock();
        // Re-check under the lock so a notify between pop and park is not lost.
        if !inner.queue.is_empty() || inner.shutdown.load(Ordering::Acquire) {
            continue;
        }

        let active = inner.active_threads.load(Ordering::Relaxed);
        if active > inner.min_threads {
            let result = inner.condvar.wait_for(&mut guard, inner.idle_timeout);
            if result.timed_out()
                && inner.queue.is_empty()
                && inner.active_threads.load(Ordering::Relaxed) > inner.min_threads
            {
                debug!("retiring idle worker thread");
                break;
            }
        } else {
            inner.condvar.wait(&mut guard);
        }
    }
}
