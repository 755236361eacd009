//! Subscription placeholder for a link that is established later.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::flow::{Demand, DemandCounter, Subscription};
use crate::tracing_compat::trace;

/// Stands in for an upstream subscription until it arrives.
///
/// Demand requested before [`set_link`](Self::set_link) accumulates and is
/// forwarded in a single request once the link is installed. A cancel before
/// the link arrives cancels the link on arrival instead of using it.
///
/// Both sides of each race publish first and check second: `request` adds to
/// the counter then looks for the link, `set_link` installs the link then
/// drains the counter. Since the counter is drained by swapping, every unit
/// of demand is forwarded by exactly one of them.
pub struct DeferredSubscription {
    link: OnceLock<Arc<dyn Subscription>>,
    pending: DemandCounter,
    cancelled: AtomicBool,
    link_cancelled: AtomicBool,
}

impl DeferredSubscription {
    /// Creates a placeholder with no link and no demand.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            link: OnceLock::new(),
            pending: DemandCounter::new(),
            cancelled: AtomicBool::new(false),
            link_cancelled: AtomicBool::new(false),
        }
    }

    /// Installs the upstream link and forwards the accumulated demand.
    ///
    /// A link offered after cancellation is cancelled. A second link is
    /// cancelled and reported as
    /// [`DuplicateSubscription`](crate::error::ErrorKind::DuplicateSubscription).
    pub fn set_link(&self, link: Arc<dyn Subscription>) -> Result<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            trace!("link arrived after cancel");
            link.cancel();
            return Ok(());
        }
        if let Err(duplicate) = self.link.set(link) {
            duplicate.cancel();
            return Err(Error::duplicate_subscription());
        }
        if self.cancelled.load(Ordering::SeqCst) {
            self.cancel_link();
            return Ok(());
        }
        trace!("upstream link installed");
        self.drain();
        Ok(())
    }

    /// Returns true once a link was installed.
    #[must_use]
    pub fn has_link(&self) -> bool {
        self.link.get().is_some()
    }

    /// Returns true once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns demand accumulated and not yet forwarded.
    #[must_use]
    pub fn pending_demand(&self) -> u64 {
        self.pending.current()
    }

    fn drain(&self) {
        if let Some(link) = self.link.get() {
            if let Some(n) = self.pending.take() {
                if self.cancelled.load(Ordering::SeqCst) {
                    return;
                }
                trace!(demand = %n, "forwarding accumulated demand");
                link.request(n);
            }
        }
    }

    fn cancel_link(&self) {
        if let Some(link) = self.link.get() {
            if !self.link_cancelled.swap(true, Ordering::AcqRel) {
                link.cancel();
            }
        }
    }
}

impl Default for DeferredSubscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription for DeferredSubscription {
    fn request(&self, n: Demand) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        if let Some(link) = self.link.get() {
            link.request(n);
            return;
        }
        self.pending.add(n);
        // The link may have been installed between the check and the add.
        self.drain();
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel_link();
    }
}

impl fmt::Debug for DeferredSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredSubscription")
            .field("linked", &self.has_link())
            .field("pending", &self.pending_demand())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
