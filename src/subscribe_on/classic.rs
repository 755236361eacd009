//! Eager cancel with scheduled demand.
//!
//! Every `request(n)` becomes a [`RequestEntry`] registered in the wrapper's
//! [`TaskRegistry`] and a task on the scheduler. The entry's slot carries the
//! task's handle, so disposing the registry stops every request task that has
//! not started. A task that did run forwards its demand and finishes its
//! entry; a finished entry ignores disposal.

use std::sync::{Arc, Weak};

use crate::cancel::{CancelSlot, DeferredSubscription, Dispose, EntryKey, TaskRegistry};
use crate::error::Error;
use crate::flow::{Demand, Publisher, Subscriber, Subscription};
use crate::scheduler::{submit_or_run, Scheduler};
use crate::tracing_compat::{trace, warn};

/// One scheduled demand signal.
pub(super) struct RequestEntry {
    demand: Demand,
    slot: CancelSlot,
}

impl RequestEntry {
    fn new(demand: Demand) -> Self {
        Self {
            demand,
            slot: CancelSlot::new(),
        }
    }
}

impl Dispose for RequestEntry {
    fn dispose(&self) {
        if self.slot.cancel() {
            trace!(demand = %self.demand, "request entry cancelled");
        }
    }
}

pub(super) struct ClassicSubscribeOn<T> {
    actual: Arc<dyn Subscriber<T>>,
    scheduler: Arc<dyn Scheduler>,
    upstream: DeferredSubscription,
    connect: CancelSlot,
    requests: TaskRegistry<RequestEntry>,
    this: Weak<Self>,
}

pub(super) fn subscribe<T: Send + 'static>(
    source: Arc<dyn Publisher<T>>,
    actual: Arc<dyn Subscriber<T>>,
    scheduler: Arc<dyn Scheduler>,
) {
    let parent = Arc::new_cyclic(|this| ClassicSubscribeOn {
        actual: Arc::clone(&actual),
        scheduler: Arc::clone(&scheduler),
        upstream: DeferredSubscription::new(),
        connect: CancelSlot::new(),
        requests: TaskRegistry::new(),
        this: this.clone(),
    });
    actual.on_subscribe(Arc::clone(&parent) as Arc<dyn Subscription>);

    let connecting = Arc::clone(&parent);
    let handle = submit_or_run(
        &*scheduler,
        Box::new(move || {
            source.subscribe(Arc::clone(&connecting) as Arc<dyn Subscriber<T>>);
            connecting.connect.finish();
        }),
    );
    parent.connect.store(handle);
}

impl<T> ClassicSubscribeOn<T> {
    fn deliver(&self, key: EntryKey, entry: &RequestEntry) {
        self.upstream.request(entry.demand);
        if entry.slot.finish() {
            trace!(demand = %entry.demand, "request entry delivered");
        }
        self.requests.remove(key);
    }

    fn is_cancelled(&self) -> bool {
        self.upstream.is_cancelled()
    }
}

impl<T: Send + 'static> Subscription for ClassicSubscribeOn<T> {
    fn request(&self, n: Demand) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let entry = Arc::new(RequestEntry::new(n));
        let Some(key) = self.requests.insert(Arc::clone(&entry)) else {
            return;
        };
        let task_entry = Arc::clone(&entry);
        let handle = submit_or_run(
            &*self.scheduler,
            Box::new(move || this.deliver(key, &task_entry)),
        );
        entry.slot.store(handle);
    }

    fn cancel(&self) {
        self.upstream.cancel();
        self.connect.cancel();
        let stopped = self.requests.dispose();
        trace!(stopped, "classic subscriber cancelled");
    }
}

impl<T: Send + 'static> Subscriber<T> for ClassicSubscribeOn<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if let Err(e) = self.upstream.set_link(subscription) {
            warn!(error = %e, "duplicate upstream subscription cancelled");
        }
    }

    fn on_next(&self, item: T) {
        if !self.is_cancelled() {
            self.actual.on_next(item);
        }
    }

    fn on_error(&self, error: Error) {
        self.requests.dispose();
        if !self.is_cancelled() {
            self.actual.on_error(error);
        }
    }

    fn on_complete(&self) {
        self.requests.dispose();
        if !self.is_cancelled() {
            self.actual.on_complete();
        }
    }
}
