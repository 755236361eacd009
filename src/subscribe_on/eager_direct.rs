//! Eager cancel, demand forwarded on the caller's thread.

use std::sync::Arc;

use crate::cancel::{CancelSlot, DeferredSubscription};
use crate::error::Error;
use crate::flow::{Demand, Publisher, Subscriber, Subscription};
use crate::scheduler::{submit_or_run, Scheduler};
use crate::tracing_compat::{trace, warn};

pub(super) struct EagerDirectSubscribeOn<T> {
    actual: Arc<dyn Subscriber<T>>,
    upstream: DeferredSubscription,
    connect: CancelSlot,
}

pub(super) fn subscribe<T: Send + 'static>(
    source: Arc<dyn Publisher<T>>,
    actual: Arc<dyn Subscriber<T>>,
    scheduler: Arc<dyn Scheduler>,
) {
    let parent = Arc::new(EagerDirectSubscribeOn {
        actual: Arc::clone(&actual),
        upstream: DeferredSubscription::new(),
        connect: CancelSlot::new(),
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

impl<T: Send + 'static> Subscription for EagerDirectSubscribeOn<T> {
    fn request(&self, n: Demand) {
        self.upstream.request(n);
    }

    fn cancel(&self) {
        self.upstream.cancel();
        if self.connect.cancel() {
            trace!("connect task cancelled");
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for EagerDirectSubscribeOn<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if let Err(e) = self.upstream.set_link(subscription) {
            warn!(error = %e, "duplicate upstream subscription cancelled");
        }
    }

    fn on_next(&self, item: T) {
        if !self.upstream.is_cancelled() {
            self.actual.on_next(item);
        }
    }

    fn on_error(&self, error: Error) {
        if !self.upstream.is_cancelled() {
            self.actual.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.upstream.is_cancelled() {
            self.actual.on_complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{IterPublisher, Recorder};
    use crate::scheduler::ManualScheduler;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        inner: IterPublisher<i32>,
        subscribed: AtomicUsize,
    }

    impl Publisher<i32> for CountingSource {
        fn subscribe(&self, subscriber: Arc<dyn Subscriber<i32>>) {
            self.subscribed.fetch_add(1, Ordering::SeqCst);
            self.inner.subscribe(subscriber);
        }
    }

    fn counting(items: &[i32]) -> Arc<CountingSource> {
        Arc::new(CountingSource {
            inner: IterPublisher::new(items.to_vec()),
            subscribed: AtomicUsize::new(0),
        })
    }

    #[test]
    fn cancel_before_connect_never_subscribes_source() {
        init_test_logging();
        let source = counting(&[1, 2]);
        let recorder = Recorder::<i32>::unbounded();
        let scheduler = ManualScheduler::new();
        subscribe(source.clone(), recorder.clone(), Arc::new(scheduler.clone()));

        recorder.cancel();
        scheduler.run_all();

        assert_eq!(source.subscribed.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.cancelled(), 1);
        assert!(recorder.values().is_empty());
    }

    #[test]
    fn demand_flows_without_scheduling() {
        init_test_logging();
        let source = counting(&[1, 2, 3]);
        let recorder = Recorder::<i32>::new(1);
        let scheduler = ManualScheduler::new();
        subscribe(source.clone(), recorder.clone(), Arc::new(scheduler.clone()));

        assert_eq!(scheduler.run_all(), 1);
        assert_eq!(recorder.values(), vec![1]);

        // No task is submitted for this request.
        recorder.request(2).unwrap();
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(recorder.values(), vec![1, 2, 3]);
        assert!(recorder.is_complete());
    }

    #[test]
    fn signals_after_cancel_are_dropped() {
        init_test_logging();
        let source = counting(&[1, 2, 3]);
        let recorder = Recorder::<i32>::new(1);
        let scheduler = ManualScheduler::new();
        subscribe(source.clone(), recorder.clone(), Arc::new(scheduler.clone()));
        scheduler.run_all();

        recorder.cancel();
        recorder.request(5).unwrap();
        assert_eq!(recorder.values(), vec![1]);
        assert!(!recorder.is_complete());
    }
}
