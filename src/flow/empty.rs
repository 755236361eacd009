//! A subscription that does nothing, and helpers that terminate a subscriber
//! right after handing it one.

use std::sync::Arc;

use super::{Demand, Subscriber, Subscription};
use crate::error::Error;

/// A subscription with no source behind it.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySubscription;

impl Subscription for EmptySubscription {
    fn request(&self, _n: Demand) {}

    fn cancel(&self) {}
}

/// Signals `on_subscribe` with an [`EmptySubscription`] followed by `on_complete`.
pub fn complete<T>(subscriber: &dyn Subscriber<T>) {
    subscriber.on_subscribe(Arc::new(EmptySubscription));
    subscriber.on_complete();
}

/// Signals `on_subscribe` with an [`EmptySubscription`] followed by `on_error`.
pub fn fail<T>(subscriber: &dyn Subscriber<T>, error: Error) {
    subscriber.on_subscribe(Arc::new(EmptySubscription));
    subscriber.on_error(error);
}
