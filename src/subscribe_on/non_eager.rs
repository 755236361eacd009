//! Lazy cancel with scheduled demand.
//!
//! Neither the connect task nor request tasks are tracked: once submitted
//! they run. Cancel goes straight to the upstream link, which the consumer
//! can only reach after the connect task delivered it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use crate::error::Error;
use crate::flow::{Demand, Publisher, Subscriber, Subscription};
use crate::scheduler::{submit_or_run, Scheduler};
use crate::tracing_compat::{trace, warn};

pub(super) struct NonEagerSubscribeOn<T> {
    actual: Arc<dyn Subscriber<T>>,
    scheduler: Arc<dyn Scheduler>,
    link: OnceLock<Arc<dyn Subscription>>,
    cancelled: AtomicBool,
    this: Weak<Self>,
}

pub(super) fn subscribe<T: Send + 'static>(
    source: Arc<dyn Publisher<T>>,
    actual: Arc<dyn Subscriber<T>>,
    scheduler: Arc<dyn Scheduler>,
) {
    let parent = Arc::new_cyclic(|this| NonEagerSubscribeOn {
        actual,
        scheduler: Arc::clone(&scheduler),
        link: OnceLock::new(),
        cancelled: AtomicBool::new(false),
        this: this.clone(),
    });
    submit_or_run(
        &*scheduler,
        Box::new(move || source.subscribe(parent as Arc<dyn Subscriber<T>>)),
    );
}

impl<T> NonEagerSubscribeOn<T> {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl<T: Send + 'static> Subscription for NonEagerSubscribeOn<T> {
    fn request(&self, n: Demand) {
        let Some(link) = self.link.get().cloned() else {
            return;
        };
        trace!(demand = %n, "scheduling request");
        submit_or_run(&*self.scheduler, Box::new(move || link.request(n)));
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(link) = self.link.get() {
            link.cancel();
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for NonEagerSubscribeOn<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if let Err(duplicate) = self.link.set(subscription) {
            warn!(
                error = %Error::duplicate_subscription(),
                "duplicate upstream subscription cancelled"
            );
            duplicate.cancel();
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        self.actual.on_subscribe(this);
    }

    fn on_next(&self, item: T) {
        if !self.is_cancelled() {
            self.actual.on_next(item);
        }
    }

    fn on_error(&self, error: Error) {
        if !self.is_cancelled() {
            self.actual.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.is_cancelled() {
            self.actual.on_complete();
        }
    }
}
