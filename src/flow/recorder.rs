//! Recording subscriber.
//!
//! [`Recorder`] captures every signal it receives in arrival order so that
//! tests can assert on exact signal sequences, including protocol violations
//! such as a second `on_subscribe` or signals after a terminal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{Demand, DemandCounter, Subscriber, Subscription};
use crate::error::{Error, Result};

/// A signal observed by a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<T> {
    /// `on_subscribe` was called.
    Subscribe,
    /// `on_next` was called with the item.
    Next(T),
    /// `on_error` was called.
    Error(Error),
    /// `on_complete` was called.
    Complete,
}

impl<T> Signal<T> {
    /// Returns true for `Error` and `Complete`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Complete)
    }
}

/// A subscriber that records the signals it receives.
pub struct Recorder<T> {
    signals: Mutex<Vec<Signal<T>>>,
    changed: Condvar,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    initial: u64,
    pending: DemandCounter,
    cancelled: AtomicBool,
}

impl<T> std::fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("signals", &self.signals.lock().len())
            .field("initial", &self.initial)
            .field("cancelled", &self.cancelled.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Recorder<T> {
    /// Creates a recorder that requests `initial` items on subscription.
    ///
    /// An `initial` of zero requests nothing until [`request`](Self::request)
    /// is called.
    #[must_use]
    pub fn new(initial: u64) -> Arc<Self> {
        Arc::new(Self {
            signals: Mutex::new(Vec::new()),
            changed: Condvar::new(),
            subscription: Mutex::new(None),
            initial,
            pending: DemandCounter::new(),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Creates a recorder that requests unlimited demand on subscription.
    #[must_use]
    pub fn unbounded() -> Arc<Self> {
        Self::new(u64::MAX)
    }

    /// Returns a snapshot of all recorded signals.
    #[must_use]
    pub fn signals(&self) -> Vec<Signal<T>> {
        self.signals.lock().clone()
    }

    /// Returns the items received through `on_next`.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.signals
            .lock()
            .iter()
            .filter_map(|s| match s {
                Signal::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns how many times `on_subscribe` was called.
    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.signals
            .lock()
            .iter()
            .filter(|s| matches!(s, Signal::Subscribe))
            .count()
    }

    /// Returns true once `on_complete` was received.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.signals
            .lock()
            .iter()
            .any(|s| matches!(s, Signal::Complete))
    }

    /// Returns the first error received, if any.
    #[must_use]
    pub fn error(&self) -> Option<Error> {
        self.signals.lock().iter().find_map(|s| match s {
            Signal::Error(e) => Some(e.clone()),
            _ => None,
        })
    }

    /// Returns true once the recorder has an active subscription.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Returns true after [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Requests `n` more items.
    ///
    /// Demand requested before `on_subscribe` arrives is held back and
    /// forwarded together with the initial demand.
    pub fn request(&self, n: u64) -> Result<()> {
        let demand = Demand::new(n)?;
        let subscription = self.subscription.lock().clone();
        match subscription {
            Some(s) => s.request(demand),
            None => {
                self.pending.add(demand);
                // on_subscribe may have raced in after the check above.
                let subscription = self.subscription.lock().clone();
                if let Some(s) = subscription {
                    if let Some(d) = self.pending.take() {
                        s.request(d);
                    }
                }
            }
        }
        Ok(())
    }

    /// Cancels the subscription, if one has arrived.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let subscription = self.subscription.lock().clone();
        if let Some(s) = subscription {
            s.cancel();
        }
    }

    /// Blocks until a terminal signal arrives or `timeout` elapses.
    ///
    /// Returns true if a terminal signal was recorded.
    pub fn wait_for_terminal(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |signals| signals.iter().any(Signal::is_terminal))
    }

    /// Blocks until at least `count` items arrived or `timeout` elapses.
    pub fn wait_for_values(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |signals| {
            signals
                .iter()
                .filter(|s| matches!(s, Signal::Next(_)))
                .count()
                >= count
        })
    }

    /// Blocks until `on_subscribe` arrives or `timeout` elapses.
    pub fn wait_for_subscribe(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |signals| {
            signals.iter().any(|s| matches!(s, Signal::Subscribe))
        })
    }

    fn wait_until(&self, timeout: Duration, done: impl Fn(&[Signal<T>]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signals = self.signals.lock();
        while !done(&signals) {
            if self.changed.wait_until(&mut signals, deadline).timed_out() {
                return done(&signals);
            }
        }
        true
    }

    fn record(&self, signal: Signal<T>) {
        self.signals.lock().push(signal);
        self.changed.notify_all();
    }
}

impl<T: Clone + Send + Sync + 'static> Subscriber<T> for Recorder<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let duplicate = {
            let mut slot = self.subscription.lock();
            if slot.is_some() {
                true
            } else {
                *slot = Some(Arc::clone(&subscription));
                false
            }
        };
        self.record(Signal::Subscribe);
        if duplicate {
            subscription.cancel();
            return;
        }
        if self.is_cancelled() {
            subscription.cancel();
            return;
        }
        if let Ok(initial) = Demand::new(self.initial) {
            self.pending.add(initial);
        }
        if let Some(d) = self.pending.take() {
            subscription.request(d);
        }
    }

    fn on_next(&self, item: T) {
        self.record(Signal::Next(item));
    }

    fn on_error(&self, error: Error) {
        self.record(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.record(Signal::Complete);
    }
}
