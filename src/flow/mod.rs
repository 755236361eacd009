//! Consumer protocol: publishers, subscribers and subscriptions.
//!
//! This module defines the signal discipline the operator consumes and
//! re-exposes:
//!
//! ```text
//! Publisher::subscribe(subscriber)
//!        │
//!        ▼
//! on_subscribe(subscription) ── exactly once, before anything else
//!        │
//!        ├── on_next(item)*      ── never more than the accumulated demand
//!        │
//!        └── on_error(e) | on_complete()   ── at most one terminal signal
//! ```
//!
//! The consumer drives the flow with [`Subscription::request`] (additive
//! [`Demand`]) and stops it with [`Subscription::cancel`]. After cancellation
//! no further signals are delivered.
//!
//! # Building blocks
//!
//! - [`Source`]: closed description of what the operator wraps
//! - [`just`], [`empty`], [`error`]: single-shot publishers
//! - [`IterPublisher`]: finite, backpressure-honouring publisher
//! - [`Recorder`]: recording subscriber for tests and diagnostics

mod demand;
mod empty;
mod iter;
mod just;
mod recorder;
mod source;

use std::sync::Arc;

use crate::error::{Error, Result};

pub use demand::{add_cap, Demand, DemandCounter};
pub use empty::{complete, fail, EmptySubscription};
pub use iter::IterPublisher;
pub use just::{empty, error, just, Empty, ErrorPublisher, Just};
pub use recorder::{Recorder, Signal};
pub use source::Source;

/// The receiving side of the consumer protocol.
pub trait Subscriber<T>: Send + Sync {
    /// Called once with the subscription controlling this flow.
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    /// Called for each item, never more often than the requested demand.
    fn on_next(&self, item: T);

    /// Terminal failure signal.
    fn on_error(&self, error: Error);

    /// Terminal completion signal.
    fn on_complete(&self);
}

/// The link between a subscriber and its source.
pub trait Subscription: Send + Sync {
    /// Adds `n` to the outstanding demand.
    fn request(&self, n: Demand);

    /// Stops the flow. Calls after the first are no-ops.
    fn cancel(&self);
}

/// A source of items that subscribers can attach to.
pub trait Publisher<T>: Send + Sync {
    /// Attaches `subscriber` to this publisher.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);
}

/// Convenience methods for [`Subscription`].
pub trait SubscriptionExt: Subscription {
    /// Validates a raw count and requests it.
    ///
    /// Returns [`ErrorKind::IllegalDemand`](crate::error::ErrorKind::IllegalDemand)
    /// without touching the subscription when `n` is zero.
    fn request_n(&self, n: u64) -> Result<()> {
        let demand = Demand::new(n)?;
        self.request(demand);
        Ok(())
    }

    /// Requests unlimited demand.
    fn request_unbounded(&self) {
        self.request(Demand::UNBOUNDED);
    }
}

impl<S: Subscription + ?Sized> SubscriptionExt for S {}

impl<T, P: Publisher<T> + ?Sized> Publisher<T> for Arc<P> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        (**self).subscribe(subscriber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct Counting {
        requested: AtomicU64,
    }

    impl Subscription for Counting {
        fn request(&self, n: Demand) {
            self.requested.fetch_add(n.get(), Ordering::SeqCst);
        }

        fn cancel(&self) {}
    }

    #[test]
    fn request_n_validates() {
        let sub = Counting::default();
        let err = sub.request_n(0).unwrap_err();
        assert!(err.is_illegal_demand());
        assert_eq!(sub.requested.load(Ordering::SeqCst), 0);

        sub.request_n(3).unwrap();
        assert_eq!(sub.requested.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn request_n_through_trait_object() {
        let sub: Arc<dyn Subscription> = Arc::new(Counting::default());
        sub.request_n(2).unwrap();
        assert!(sub.request_n(0).is_err());
    }
}
