//! Fast path for sources known to hold at most one value.
//!
//! No upstream subscription exists: the consumer's subscription is created
//! here, and the value or completion is delivered by a scheduled task.
//! Without eager cancel, a delivery that was already submitted cannot be
//! stopped; cancel only prevents a delivery that was never requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::cancel::CancelSlot;
use crate::flow::{complete, Demand, Subscriber, Subscription};
use crate::scheduler::{submit_or_run, Scheduler};
use crate::tracing_compat::trace;

pub(super) fn subscribe_empty<T: Send + 'static>(
    actual: Arc<dyn Subscriber<T>>,
    scheduler: Arc<dyn Scheduler>,
    eager_cancel: bool,
) {
    if !eager_cancel {
        submit_or_run(&*scheduler, Box::new(move || complete(&*actual)));
        return;
    }
    let parent = Arc::new(ScheduledEmpty {
        actual: Arc::clone(&actual),
        slot: CancelSlot::new(),
    });
    actual.on_subscribe(Arc::clone(&parent) as Arc<dyn Subscription>);
    let task = Arc::clone(&parent);
    let handle = submit_or_run(&*scheduler, Box::new(move || task.run()));
    parent.slot.store(handle);
}

pub(super) fn subscribe_value<T: Clone + Send + Sync + 'static>(
    value: T,
    actual: Arc<dyn Subscriber<T>>,
    scheduler: Arc<dyn Scheduler>,
    eager_cancel: bool,
) {
    if eager_cancel {
        let subscription = Arc::new_cyclic(|this: &Weak<ScalarEager<T>>| ScalarEager {
            actual: Arc::clone(&actual),
            value,
            scheduler,
            requested: AtomicBool::new(false),
            slot: CancelSlot::new(),
            this: this.clone(),
        });
        actual.on_subscribe(subscription);
    } else {
        let subscription = Arc::new_cyclic(|this: &Weak<ScalarNonEager<T>>| ScalarNonEager {
            actual: Arc::clone(&actual),
            value,
            scheduler,
            requested: AtomicBool::new(false),
            this: this.clone(),
        });
        actual.on_subscribe(subscription);
    }
}

/// Completion scheduled for an empty source, stoppable until it runs.
struct ScheduledEmpty<T> {
    actual: Arc<dyn Subscriber<T>>,
    slot: CancelSlot,
}

impl<T> ScheduledEmpty<T> {
    fn run(&self) {
        if self.slot.finish() {
            self.actual.on_complete();
        }
    }
}

impl<T: Send + 'static> Subscription for ScheduledEmpty<T> {
    fn request(&self, _n: Demand) {}

    fn cancel(&self) {
        self.slot.cancel();
    }
}

struct ScalarEager<T> {
    actual: Arc<dyn Subscriber<T>>,
    value: T,
    scheduler: Arc<dyn Scheduler>,
    requested: AtomicBool,
    slot: CancelSlot,
    this: Weak<Self>,
}

impl<T: Clone> ScalarEager<T> {
    fn deliver(&self) {
        if self.slot.is_cancelled() {
            trace!("scalar delivery skipped after cancel");
            return;
        }
        self.actual.on_next(self.value.clone());
        if self.slot.finish() {
            self.actual.on_complete();
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Subscription for ScalarEager<T> {
    fn request(&self, _n: Demand) {
        if self.requested.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let handle = submit_or_run(&*self.scheduler, Box::new(move || this.deliver()));
        self.slot.store(handle);
    }

    fn cancel(&self) {
        self.requested.store(true, Ordering::Release);
        self.slot.cancel();
    }
}

struct ScalarNonEager<T> {
    actual: Arc<dyn Subscriber<T>>,
    value: T,
    scheduler: Arc<dyn Scheduler>,
    requested: AtomicBool,
    this: Weak<Self>,
}

impl<T: Clone + Send + Sync + 'static> Subscription for ScalarNonEager<T> {
    fn request(&self, _n: Demand) {
        if self.requested.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        submit_or_run(
            &*self.scheduler,
            Box::new(move || {
                this.actual.on_next(this.value.clone());
                this.actual.on_complete();
            }),
        );
    }

    fn cancel(&self) {
        // Cannot reach a delivery that is already submitted.
        self.requested.store(true, Ordering::Release);
    }
}
