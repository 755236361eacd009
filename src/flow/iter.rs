//! Finite publisher over a list of items.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::{Demand, DemandCounter, Publisher, Subscriber, Subscription};
use crate::error::Error;

/// Publishes a fixed list of items, honouring demand, then terminates.
///
/// Each subscriber gets its own pass over the items. The terminal signal is
/// `on_complete`, or `on_error` when built with [`then_fail`](Self::then_fail).
#[derive(Debug, Clone)]
pub struct IterPublisher<T> {
    items: Arc<[T]>,
    failure: Option<Error>,
}

impl<T> IterPublisher<T> {
    /// Creates a publisher of `items`.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
            failure: None,
        }
    }

    /// Terminates with `error` instead of completing.
    #[must_use]
    pub fn then_fail(mut self, error: Error) -> Self {
        self.failure = Some(error);
        self
    }

    /// Returns the number of items each subscriber receives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items are published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for IterPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let subscription = Arc::new(IterSubscription {
            actual: Arc::clone(&subscriber),
            items: Arc::clone(&self.items),
            failure: self.failure.clone(),
            index: AtomicUsize::new(0),
            requested: DemandCounter::new(),
            wip: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            done: AtomicBool::new(false),
        });
        subscriber.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);
        // An empty list terminates without waiting for demand.
        subscription.drain();
    }
}

struct IterSubscription<T> {
    actual: Arc<dyn Subscriber<T>>,
    items: Arc<[T]>,
    failure: Option<Error>,
    index: AtomicUsize,
    requested: DemandCounter,
    wip: AtomicUsize,
    cancelled: AtomicBool,
    done: AtomicBool,
}

impl<T: Clone + Send + Sync> IterSubscription<T> {
    /// Emission loop; only the thread that moved `wip` off zero emits.
    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1;
        loop {
            let requested = self.requested.current();
            let mut emitted = 0_u64;
            while emitted < requested {
                if self.cancelled.load(Ordering::Acquire) {
                    return;
                }
                let index = self.index.load(Ordering::Relaxed);
                if index >= self.items.len() {
                    break;
                }
                self.index.store(index + 1, Ordering::Relaxed);
                self.actual.on_next(self.items[index].clone());
                emitted += 1;
            }
            if emitted > 0 {
                self.requested.produced(emitted);
            }
            if self.cancelled.load(Ordering::Acquire) {
                return;
            }
            if self.index.load(Ordering::Relaxed) >= self.items.len()
                && !self.done.swap(true, Ordering::AcqRel)
            {
                match &self.failure {
                    Some(error) => self.actual.on_error(error.clone()),
                    None => self.actual.on_complete(),
                }
                return;
            }
            missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                break;
            }
        }
    }
}

impl<T: Clone + Send + Sync> Subscription for IterSubscription<T> {
    fn request(&self, n: Demand) {
        self.requested.add(n);
        self.drain();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
