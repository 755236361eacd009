//! Single-shot publishers.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::empty::{complete, fail};
use super::{Demand, Publisher, Subscriber, Subscription};
use crate::error::Error;

/// Creates a publisher that emits `value` once demand arrives, then completes.
#[must_use]
pub fn just<T>(value: T) -> Just<T> {
    Just { value }
}

/// Creates a publisher that completes immediately.
#[must_use]
pub fn empty() -> Empty {
    Empty
}

/// Creates a publisher that fails immediately with `error`.
#[must_use]
pub fn error(error: Error) -> ErrorPublisher {
    ErrorPublisher { error }
}

/// Publisher of a single value.
#[derive(Debug, Clone)]
pub struct Just<T> {
    value: T,
}

impl<T> Just<T> {
    /// Returns the value this publisher emits.
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for Just<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let subscription = Arc::new(ScalarSubscription::new(
            Arc::clone(&subscriber),
            self.value.clone(),
        ));
        subscriber.on_subscribe(subscription);
    }
}

/// Publisher that completes without emitting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Empty;

impl<T> Publisher<T> for Empty {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        complete(&*subscriber);
    }
}

/// Publisher that fails without emitting.
#[derive(Debug, Clone)]
pub struct ErrorPublisher {
    error: Error,
}

impl<T> Publisher<T> for ErrorPublisher {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        fail(&*subscriber, self.error.clone());
    }
}

const IDLE: u8 = 0;
const EMITTED: u8 = 1;
const CANCELLED: u8 = 2;

/// Delivers one value on the first valid request.
struct ScalarSubscription<T> {
    actual: Arc<dyn Subscriber<T>>,
    value: T,
    state: AtomicU8,
}

impl<T> ScalarSubscription<T> {
    fn new(actual: Arc<dyn Subscriber<T>>, value: T) -> Self {
        Self {
            actual,
            value,
            state: AtomicU8::new(IDLE),
        }
    }
}

impl<T: Clone + Send + Sync> Subscription for ScalarSubscription<T> {
    fn request(&self, _n: Demand) {
        if self
            .state
            .compare_exchange(IDLE, EMITTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.actual.on_next(self.value.clone());
            if self.state.load(Ordering::Acquire) != CANCELLED {
                self.actual.on_complete();
            }
        }
    }

    fn cancel(&self) {
        self.state.store(CANCELLED, Ordering::Release);
    }
}
