//! Subscribe-on: schedule the subscription to a reactive source.
//!
//! # Overview
//!
//! [`SubscribeOn`] wraps a publisher so that subscribing to it, and
//! optionally every demand signal, happens on a caller-supplied
//! [`Scheduler`]. Items and terminal signals flow back unchanged. The
//! interesting part is cancellation: a consumer may cancel while the connect
//! task is queued, running, or done, while demand tasks are in flight, and
//! before the scheduler has even returned the handle of the task it is
//! cancelling.
//!
//! # Core Guarantees
//!
//! - **Exactly one `on_subscribe`** per consumer, for every strategy
//! - **No lost demand**: requests made before the source is connected are
//!   forwarded once, coalesced, when it connects
//! - **Handles invoked at most once**: a stop handle that arrives after the
//!   cancel is invoked on arrival
//! - **No dropped work**: a task the scheduler refuses runs inline
//!
//! # Module Structure
//!
//! - [`flow`]: consumer protocol (publishers, subscribers, demand, sources)
//! - [`cancel`]: cancellation slot, deferred subscription, task registry
//! - [`scheduler`]: scheduler trait and bundled schedulers
//! - [`subscribe_on`]: the operator and its dispatch strategies
//! - [`error`]: error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod cancel;
pub mod error;
pub mod flow;
pub mod scheduler;
pub mod subscribe_on;

pub(crate) mod tracing_compat;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cancel::{CancelSlot, DeferredSubscription, TaskRegistry};
pub use error::{Error, ErrorKind, Result};
pub use flow::{Demand, Publisher, Source, Subscriber, Subscription, SubscriptionExt};
pub use scheduler::{Immediate, ManualScheduler, Scheduler, TaskHandle, WorkerPool};
pub use subscribe_on::{Strategy, SubscribeOn, SubscribeOnConfig};
