//! The subscribe-on operator.
//!
//! [`SubscribeOn`] moves the act of subscribing to its source, and optionally
//! every demand signal, onto a [`Scheduler`]. Signals coming back from the
//! source are relayed to the consumer unchanged and in order.
//!
//! # Dispatch
//!
//! On each `subscribe`, the [`Source`] decides the path:
//!
//! - [`Source::Value`] / [`Source::Empty`]: scalar fast path. The consumer
//!   receives its subscription at once and the value (or completion) is
//!   delivered by a scheduled task.
//! - [`Source::Publisher`]: one of four [`Strategy`] wrappers, picked by the
//!   `eager_cancel` and `dispatch_demand` flags.
//!
//! Eager strategies hand the consumer its subscription before the connect
//! task runs, so a cancel may race the connect; the connect task's handle is
//! parked in a [`CancelSlot`](crate::cancel::CancelSlot) to settle the race.
//! Non-eager strategies let the connect task run and give the consumer its
//! subscription from the scheduler thread.
//!
//! # Rejection
//!
//! A task the scheduler refuses runs inline on the submitting thread. A
//! dropped connect task would leave the consumer waiting forever.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use subscribe_on::flow::{IterPublisher, Publisher, Recorder, Source};
//! use subscribe_on::scheduler::WorkerPool;
//! use subscribe_on::subscribe_on::{Strategy, SubscribeOn};
//!
//! let pool = WorkerPool::new(1, 2);
//! let op = SubscribeOn::builder(Source::publisher(IterPublisher::new([1, 2, 3])), pool)
//!     .strategy(Strategy::Classic)
//!     .build();
//!
//! let recorder = Recorder::<i32>::unbounded();
//! op.subscribe(recorder.clone());
//! assert!(recorder.wait_for_terminal(Duration::from_secs(5)));
//! assert_eq!(recorder.values(), vec![1, 2, 3]);
//! ```

mod classic;
mod config;
mod eager_direct;
mod non_eager;
mod scalar;

use std::fmt;
use std::sync::Arc;

use crate::flow::{Publisher, Source, Subscriber};
use crate::scheduler::{submit_or_run, Scheduler};
use crate::tracing_compat::debug;

pub use config::{Strategy, SubscribeOnBuilder, SubscribeOnConfig};

/// Publisher that subscribes to its source on a scheduler.
pub struct SubscribeOn<T> {
    source: Source<T>,
    scheduler: Arc<dyn Scheduler>,
    config: SubscribeOnConfig,
}

impl<T> SubscribeOn<T> {
    /// Wraps `source`, subscribing to it on `scheduler`.
    pub fn new(
        source: Source<T>,
        scheduler: impl Scheduler + 'static,
        config: SubscribeOnConfig,
    ) -> Self {
        Self::from_parts(source, Arc::new(scheduler), config)
    }

    /// Starts a builder with the default (classic) configuration.
    pub fn builder(source: Source<T>, scheduler: impl Scheduler + 'static) -> SubscribeOnBuilder<T> {
        SubscribeOnBuilder::new(source, Arc::new(scheduler))
    }

    /// Publishes `value` through a scheduled delivery task.
    ///
    /// With `eager_cancel` a cancel stops a delivery that has not started.
    /// Without it, a delivery already submitted still happens.
    pub fn just(value: T, scheduler: impl Scheduler + 'static, eager_cancel: bool) -> Self {
        Self::new(
            Source::Value(value),
            scheduler,
            SubscribeOnConfig::new(eager_cancel, false),
        )
    }

    pub(crate) fn from_parts(
        source: Source<T>,
        scheduler: Arc<dyn Scheduler>,
        config: SubscribeOnConfig,
    ) -> Self {
        Self {
            source,
            scheduler,
            config,
        }
    }

    /// Returns the strategy used for general publisher sources.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.config.strategy()
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> SubscribeOnConfig {
        self.config
    }

    /// Returns the wrapped source.
    #[must_use]
    pub const fn source(&self) -> &Source<T> {
        &self.source
    }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for SubscribeOn<T> {
    fn subscribe(&self, actual: Arc<dyn Subscriber<T>>) {
        let scheduler = Arc::clone(&self.scheduler);
        let eager_cancel = self.config.eager_cancel;
        let source = match &self.source {
            Source::Value(value) => {
                debug!(eager_cancel, "subscribing scalar value");
                scalar::subscribe_value(value.clone(), actual, scheduler, eager_cancel);
                return;
            }
            Source::Empty => {
                debug!(eager_cancel, "subscribing empty source");
                scalar::subscribe_empty(actual, scheduler, eager_cancel);
                return;
            }
            Source::Publisher(publisher) => Arc::clone(publisher),
        };

        let strategy = self.strategy();
        debug!(%strategy, "subscribing on scheduler");
        match strategy {
            Strategy::Classic => classic::subscribe(source, actual, scheduler),
            Strategy::EagerDirect => eager_direct::subscribe(source, actual, scheduler),
            Strategy::NonEager => non_eager::subscribe(source, actual, scheduler),
            Strategy::Direct => {
                // The consumer talks to the source's own subscription.
                submit_or_run(&*scheduler, Box::new(move || source.subscribe(actual)));
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SubscribeOn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeOn")
            .field("source", &self.source)
            .field("strategy", &self.strategy())
            .finish_non_exhaustive()
    }
}
