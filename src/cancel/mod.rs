//! Cancellation primitives shared by every dispatch strategy.
//!
//! - [`CancelSlot`]: cell for a stop handle that may arrive after the cancel
//! - [`DeferredSubscription`]: buffers demand and cancel until the upstream
//!   link exists
//! - [`TaskRegistry`]: set of outstanding entries disposed exactly once
//!
//! All three resolve their races locally. None of them blocks while running
//! a stop action.

mod deferred;
mod registry;
mod slot;

pub use deferred::DeferredSubscription;
pub use registry::{Dispose, EntryKey, TaskRegistry};
pub use slot::{CancelSlot, Cancellable, SlotState};
